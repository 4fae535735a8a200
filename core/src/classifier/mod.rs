//! Turns log lines into overlay events.

pub mod rules;
mod state;


pub use rules::{CAST_MATCH_WINDOW, GROUP_KILL_WINDOW, parse_coins};
pub use state::{CastRecord, ClassifierState};

use crate::game_data::Catalogs;
use crate::game_log::LogLine;
use crate::stats::StatsAggregator;
use eqlive_types::{OverlayEvent, StatsCounters};
use rules::{Flow, LineContext, RULES};
use std::sync::Arc;
use std::time::Instant;

/// Stateful classifier for one active log file.
///
/// Runs the ordered rule set over each line, then keeps the counters in step
/// with what was emitted: every `kill`, `death` and `status` event is
/// followed by a `stats` event with the updated counters.
pub struct EventClassifier {
    char_name: String,
    catalogs: Arc<Catalogs>,
    state: ClassifierState,
    stats: StatsAggregator,
    /// Zero session counters whenever the zone changes
    reset_session_on_zone: bool,
}

impl EventClassifier {
    pub fn new(char_name: impl Into<String>, catalogs: Arc<Catalogs>, stats: StatsAggregator) -> Self {
        Self {
            char_name: char_name.into(),
            catalogs,
            state: ClassifierState::new(),
            stats,
            reset_session_on_zone: false,
        }
    }

    pub fn with_session_reset_on_zone(mut self, enabled: bool) -> Self {
        self.reset_session_on_zone = enabled;
        self
    }

    pub fn char_name(&self) -> &str {
        &self.char_name
    }

    pub fn state(&self) -> &ClassifierState {
        &self.state
    }

    pub fn counters(&self) -> StatsCounters {
        self.stats.counters()
    }

    /// Classify a raw log line, stripping its timestamp prefix first.
    pub fn classify_line(&mut self, raw: &str, now: Instant) -> Vec<OverlayEvent> {
        self.classify(LogLine::parse(raw).content, now)
    }

    /// Classify prefix-stripped `content` observed at `now`.
    pub fn classify(&mut self, content: &str, now: Instant) -> Vec<OverlayEvent> {
        let line = LineContext {
            content,
            now,
            char_name: &self.char_name,
            catalogs: &self.catalogs,
        };

        let mut detected = Vec::new();
        for rule in RULES {
            if rule(&mut self.state, &line, &mut detected) == Flow::Stop {
                break;
            }
        }

        if detected.is_empty() {
            return detected;
        }

        let mut events = Vec::with_capacity(detected.len() + 1);
        for event in detected {
            let needs_stats = match &event {
                OverlayEvent::Status { .. } => {
                    if self.reset_session_on_zone {
                        self.stats.reset_session();
                    }
                    true
                }
                other => self.stats.apply(other),
            };
            events.push(event);
            if needs_stats {
                events.push(self.stats.snapshot());
            }
        }
        events
    }
}
