use crate::context::error::WatcherError;
use crate::context::log_files::{is_game_log, newest_log_file};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub const ROTATION_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub enum DirectoryEvent {
    NewFile(PathBuf),
    FileRemoved(PathBuf),
    Error(String),
}

/// Filesystem notifications for the log directory.
///
/// Only used to wake the rotation poller early; polling stays authoritative
/// because not every platform reports appends to an existing file.
pub struct DirectoryWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
}

impl DirectoryWatcher {
    pub fn new(path: &Path) -> Result<Self, WatcherError> {
        let (tx, rx) = mpsc::channel(100);

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.blocking_send(res);
            },
            Config::default(),
        )
        .map_err(WatcherError::InitWatcher)?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|source| WatcherError::WatchPath {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    pub async fn next_event(&mut self) -> Option<DirectoryEvent> {
        while let Some(event_result) = self.rx.recv().await {
            match event_result {
                Ok(event) => {
                    if let Some(watcher_event) = process_event(event) {
                        return Some(watcher_event);
                    }
                }
                Err(e) => {
                    return Some(DirectoryEvent::Error(format!(
                        "Directory watcher error: {}",
                        e
                    )));
                }
            }
        }
        None
    }
}

fn process_event(event: Event) -> Option<DirectoryEvent> {
    let path = event.paths.into_iter().find(|p| is_game_log(p))?;
    match event.kind {
        EventKind::Create(_) => Some(DirectoryEvent::NewFile(path)),
        EventKind::Remove(_) => Some(DirectoryEvent::FileRemoved(path)),
        // appends are picked up by the tailer and the periodic poll
        _ => None,
    }
}

/// Tracks which log file is active and reports when that changes.
pub struct RotationWatcher {
    dir: PathBuf,
    interval: Duration,
    last: Option<PathBuf>,
}

impl RotationWatcher {
    pub fn new(dir: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            dir: dir.into(),
            interval,
            last: None,
        }
    }

    /// Start from a file that is already being tailed, so it isn't reported
    /// again on the first poll.
    pub fn with_current(mut self, current: Option<PathBuf>) -> Self {
        self.last = current;
        self
    }

    /// Re-evaluate the active file once. Returns the new path only when it
    /// differs from the last one reported.
    ///
    /// Directory errors are logged and treated as "nothing found".
    pub fn poll(&mut self) -> Option<PathBuf> {
        match newest_log_file(&self.dir) {
            Ok(Some(path)) if self.last.as_ref() != Some(&path) => {
                tracing::info!(path = %path.display(), "Active log file changed");
                self.last = Some(path.clone());
                Some(path)
            }
            Ok(Some(_)) => None,
            Ok(None) => {
                tracing::debug!(dir = %self.dir.display(), "No log files found");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Log directory scan failed");
                None
            }
        }
    }

    /// Poll until cancelled, sending every change of active file to `tx`.
    pub async fn run(mut self, tx: Sender<PathBuf>, cancel: CancellationToken) {
        let mut nudges = match DirectoryWatcher::new(&self.dir) {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!(error = %e, "Directory notifications unavailable, polling only");
                None
            }
        };

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let nudge = tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => None,
                event = next_nudge(&mut nudges) => Some(event),
            };

            match nudge {
                Some(None) => {
                    tracing::debug!("Directory watcher closed, polling only");
                    nudges = None;
                }
                Some(Some(DirectoryEvent::Error(message))) => {
                    tracing::warn!(%message, "Directory watcher error");
                }
                Some(Some(DirectoryEvent::NewFile(path) | DirectoryEvent::FileRemoved(path))) => {
                    tracing::debug!(path = %path.display(), "Log directory changed");
                }
                None => {}
            }

            if let Some(path) = self.poll()
                && tx.send(path).await.is_err()
            {
                break; // Service shut down
            }
        }
    }
}

async fn next_nudge(watcher: &mut Option<DirectoryWatcher>) -> Option<DirectoryEvent> {
    match watcher {
        Some(w) => w.next_event().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::SystemTime;

    fn touch(path: &Path, age_secs: u64) {
        let file = fs::File::create(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
    }

    #[test]
    fn poll_reports_only_changes() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("eqlog_First_P1999Green.txt");
        touch(&first, 60);

        let mut watcher = RotationWatcher::new(dir.path(), ROTATION_POLL_INTERVAL);
        assert_eq!(watcher.poll(), Some(first.clone()));
        assert_eq!(watcher.poll(), None);

        let second = dir.path().join("eqlog_Second_P1999Green.txt");
        touch(&second, 0);
        assert_eq!(watcher.poll(), Some(second));
        assert_eq!(watcher.poll(), None);
    }

    #[test]
    fn poll_survives_missing_directory() {
        let mut watcher = RotationWatcher::new("/no/such/eqlive/dir", ROTATION_POLL_INTERVAL);
        assert_eq!(watcher.poll(), None);
    }

    #[test]
    fn with_current_suppresses_initial_report() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("eqlog_First_P1999Green.txt");
        touch(&first, 0);

        let mut watcher =
            RotationWatcher::new(dir.path(), ROTATION_POLL_INTERVAL).with_current(Some(first));
        assert_eq!(watcher.poll(), None);
    }

    #[tokio::test]
    async fn run_sends_rotation_and_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("eqlog_First_P1999Green.txt");
        touch(&first, 60);

        let (tx, mut rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let watcher = RotationWatcher::new(dir.path(), Duration::from_millis(20));
        let task = tokio::spawn(watcher.run(tx, cancel.clone()));

        let got = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(got, Some(first));

        let second = dir.path().join("eqlog_Second_P1999Green.txt");
        touch(&second, 0);
        let got = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(got, Some(second));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }
}
