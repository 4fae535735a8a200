//! Kill and death counters.

use crate::game_log::{LogLine, Reader, ReaderError};
use eqlive_types::{OverlayEvent, StatsCounters};
use serde::Serialize;
use std::path::Path;

/// Counts kills and deaths from the events the classifier emits.
#[derive(Debug, Clone, Default)]
pub struct StatsAggregator {
    counters: StatsCounters,
}

impl StatsAggregator {
    pub fn new(counters: StatsCounters) -> Self {
        Self { counters }
    }

    /// Totals from a full scan of a newly active file, keeping the session
    /// counts accumulated so far.
    pub fn seeded(scan: &ScanSummary, session: &StatsCounters) -> Self {
        Self::new(StatsCounters {
            total_kills: scan.kills,
            total_deaths: scan.deaths,
            session_kills: session.session_kills,
            session_deaths: session.session_deaths,
        })
    }

    /// Count `event`. Returns true when the counters changed.
    pub fn apply(&mut self, event: &OverlayEvent) -> bool {
        match event {
            OverlayEvent::Kill => {
                self.counters.total_kills += 1;
                self.counters.session_kills += 1;
                true
            }
            OverlayEvent::Death => {
                self.counters.total_deaths += 1;
                self.counters.session_deaths += 1;
                true
            }
            _ => false,
        }
    }

    pub fn reset_session(&mut self) {
        self.counters.session_kills = 0;
        self.counters.session_deaths = 0;
    }

    pub fn counters(&self) -> StatsCounters {
        self.counters
    }

    /// Current counters as a `stats` event.
    pub fn snapshot(&self) -> OverlayEvent {
        OverlayEvent::stats(&self.counters)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Full scan
// ─────────────────────────────────────────────────────────────────────────────

/// What a full scan of a log file found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub kills: u64,
    pub deaths: u64,
    /// Last zone entered, if any
    pub last_zone: Option<String>,
    /// Bytes scanned; live tailing resumes here
    pub end_position: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ScanMark {
    Kill,
    DeathStart,
    ExperienceLost,
    Zone(String),
}

fn mark_line(raw: &str) -> Option<ScanMark> {
    let content = LogLine::parse(raw).content;
    if content.contains("You have been slain by") {
        Some(ScanMark::DeathStart)
    } else if content.contains("You have lost experience.") {
        Some(ScanMark::ExperienceLost)
    } else if content.contains("You have slain") {
        Some(ScanMark::Kill)
    } else if let Some(rest) = content.split_once("You have entered ").map(|(_, r)| r) {
        let zone = rest.split_once('.')?.0;
        (!zone.is_empty()).then(|| ScanMark::Zone(zone.to_string()))
    } else {
        None
    }
}

/// Replay `path` from the start, counting direct kills and confirmed deaths.
///
/// Lines are matched in parallel and folded in file order, so re-scanning the
/// same file always yields the same summary. Group kill credit depends on
/// wall-clock timing and is only counted live.
pub fn init_from_full_scan(path: &Path) -> Result<ScanSummary, ReaderError> {
    let reader = Reader::from(path.to_path_buf());
    let (marks, end_position) = reader.scan_log_file(|_, line| mark_line(line))?;

    let mut summary = ScanSummary {
        end_position,
        ..Default::default()
    };
    let mut pending_death = false;
    for mark in marks {
        match mark {
            ScanMark::Kill => summary.kills += 1,
            ScanMark::DeathStart => pending_death = true,
            ScanMark::ExperienceLost if pending_death => {
                summary.deaths += 1;
                pending_death = false;
            }
            ScanMark::ExperienceLost => {}
            ScanMark::Zone(zone) => summary.last_zone = Some(zone),
        }
    }

    tracing::info!(
        path = %path.display(),
        kills = summary.kills,
        deaths = summary.deaths,
        zone = summary.last_zone.as_deref().unwrap_or("-"),
        "Full scan complete"
    );
    Ok(summary)
}
