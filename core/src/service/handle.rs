use super::ServiceCommand;
use eqlive_types::{OverlayEvent, StatsCounters};
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::{mpsc, watch};

/// Latest derived state of the active log file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub active_file: Option<PathBuf>,
    pub char_name: String,
    pub current_zone: String,
    pub counters: StatsCounters,
}

impl Snapshot {
    /// The `status` and `stats` events describing this snapshot.
    pub fn events(&self) -> [OverlayEvent; 2] {
        [
            OverlayEvent::status(&self.char_name, &self.current_zone),
            OverlayEvent::stats(&self.counters),
        ]
    }

    /// Fold an outgoing event in. Returns true when anything changed.
    pub fn observe(&mut self, event: &OverlayEvent) -> bool {
        match event {
            OverlayEvent::Status {
                char_name,
                current_zone,
            } => {
                let changed = self.char_name != *char_name || self.current_zone != *current_zone;
                self.char_name.clone_from(char_name);
                self.current_zone.clone_from(current_zone);
                changed
            }
            OverlayEvent::Stats {
                total_deaths,
                session_deaths,
                total_kills,
                session_kills,
            } => {
                let counters = StatsCounters {
                    total_deaths: *total_deaths,
                    session_deaths: *session_deaths,
                    total_kills: *total_kills,
                    session_kills: *session_kills,
                };
                let changed = self.counters != counters;
                self.counters = counters;
                changed
            }
            _ => false,
        }
    }
}

/// Handle for talking to a running [`LiveService`](super::LiveService).
#[derive(Clone)]
pub struct ServiceHandle {
    cmd_tx: mpsc::Sender<ServiceCommand>,
    snapshot_rx: watch::Receiver<Snapshot>,
}

impl ServiceHandle {
    pub(super) fn new(cmd_tx: mpsc::Sender<ServiceCommand>, snapshot_rx: watch::Receiver<Snapshot>) -> Self {
        Self { cmd_tx, snapshot_rx }
    }

    /// Current status and counters.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Switch to `path` without waiting for the rotation poll
    pub async fn switch_to(&self, path: PathBuf) -> Result<(), String> {
        self.cmd_tx
            .send(ServiceCommand::ActiveFileChanged(path))
            .await
            .map_err(|e| e.to_string())
    }

    pub async fn shutdown(&self) -> Result<(), String> {
        self.cmd_tx
            .send(ServiceCommand::Shutdown)
            .await
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_tracks_status_and_stats_only() {
        let mut snap = Snapshot::default();
        assert!(snap.observe(&OverlayEvent::status("Tester", "Befallen")));
        assert!(!snap.observe(&OverlayEvent::status("Tester", "Befallen")));
        assert!(!snap.observe(&OverlayEvent::Kill));

        let counters = StatsCounters {
            total_kills: 5,
            session_kills: 2,
            ..Default::default()
        };
        assert!(snap.observe(&OverlayEvent::stats(&counters)));
        assert_eq!(snap.counters, counters);
        assert_eq!(snap.current_zone, "Befallen");
        assert_eq!(
            snap.events(),
            [
                OverlayEvent::status("Tester", "Befallen"),
                OverlayEvent::stats(&counters)
            ]
        );
    }
}
