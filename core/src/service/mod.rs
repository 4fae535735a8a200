//! Live pipeline: follows the active log file, classifies new lines and
//! forwards the resulting events to the broadcast sink.

mod handle;


pub use handle::{ServiceHandle, Snapshot};

use crate::broadcast::EventSink;
use crate::classifier::EventClassifier;
use crate::context::{
    AppConfig, AppConfigExt, BackgroundTasks, ConfigError, RotationWatcher, TaskSlot,
    WatcherError, character_name, newest_log_file,
};
use crate::game_data::Catalogs;
use crate::game_log::{TailStart, Tailer};
use crate::stats::{ScanSummary, StatsAggregator, init_from_full_scan};
use eqlive_types::OverlayEvent;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Zone reported before any "You have entered" line has been seen.
pub const UNKNOWN_ZONE: &str = "Unknown";

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no usable log file at startup")]
    Startup(#[source] WatcherError),
}

/// Commands processed by the service loop
#[derive(Debug)]
pub enum ServiceCommand {
    /// Switch to this file as if rotation had found it
    ActiveFileChanged(PathBuf),
    Shutdown,
}

/// Owns the rotation watcher and the tail task of the active file.
pub struct LiveService {
    config: AppConfig,
    catalogs: Arc<Catalogs>,
    sink: Arc<dyn EventSink>,
    cmd_rx: mpsc::Receiver<ServiceCommand>,
    snapshot: Arc<watch::Sender<Snapshot>>,
    tasks: BackgroundTasks,
    cancel: CancellationToken,
    initial: Option<PathBuf>,
}

impl LiveService {
    /// Validate the configuration and find the log file to start with.
    ///
    /// With `strict_startup` an unreadable log directory or one without any
    /// game log is an error; otherwise the service starts idle and waits for
    /// a file to appear.
    pub fn new(
        config: AppConfig,
        catalogs: Arc<Catalogs>,
        sink: Arc<dyn EventSink>,
        cancel: CancellationToken,
    ) -> Result<(Self, ServiceHandle), ServiceError> {
        config.validate()?;

        let dir = PathBuf::from(&config.log_directory);
        let initial = match newest_log_file(&dir) {
            Ok(Some(path)) => Some(path),
            Ok(None) if config.strict_startup => {
                return Err(ServiceError::Startup(WatcherError::NoLogFiles { path: dir }));
            }
            Err(e) if config.strict_startup => return Err(ServiceError::Startup(e)),
            Ok(None) => {
                tracing::warn!(dir = %dir.display(), "No log files yet, waiting for one to appear");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Log directory not readable yet, will keep polling");
                None
            }
        };

        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());

        let service = Self {
            config,
            catalogs,
            sink,
            cmd_rx,
            snapshot: Arc::new(snapshot_tx),
            tasks: BackgroundTasks::default(),
            cancel,
            initial,
        };
        Ok((service, ServiceHandle::new(cmd_tx, snapshot_rx)))
    }

    pub async fn run(mut self) {
        let (file_tx, mut file_rx) = mpsc::channel(8);
        let watcher = RotationWatcher::new(&self.config.log_directory, self.config.rotation_interval())
            .with_current(self.initial.clone());
        self.tasks.watcher = Some(TaskSlot::spawn(&self.cancel, |cancel| {
            watcher.run(file_tx, cancel)
        }));

        if let Some(path) = self.initial.take() {
            self.attach(path).await;
        }

        loop {
            let cmd = tokio::select! {
                _ = self.cancel.cancelled() => ServiceCommand::Shutdown,
                Some(path) = file_rx.recv() => ServiceCommand::ActiveFileChanged(path),
                cmd = self.cmd_rx.recv() => cmd.unwrap_or(ServiceCommand::Shutdown),
            };

            match cmd {
                ServiceCommand::ActiveFileChanged(path) => self.attach(path).await,
                ServiceCommand::Shutdown => break,
            }
        }

        self.tasks.stop_all().await;
        tracing::info!("Live service stopped");
    }

    /// Make `path` the active file: stop the old tail, seed the counters
    /// from a full scan, announce the new state and start tailing where the
    /// scan ended.
    async fn attach(&mut self, path: PathBuf) {
        self.tasks.stop_tail().await;

        let char_name = character_name(&path);
        tracing::info!(path = %path.display(), character = %char_name, "Attaching to log file");

        let scan = full_scan(&path).await;
        let start = match &scan {
            Some(summary) => TailStart::Offset(summary.end_position),
            None => TailStart::End,
        };
        let scan = scan.unwrap_or_default();

        let session = self.snapshot.borrow().counters;
        let stats = StatsAggregator::seeded(&scan, &session);
        let snapshot = Snapshot {
            active_file: Some(path.clone()),
            char_name: char_name.clone(),
            current_zone: scan.last_zone.unwrap_or_else(|| UNKNOWN_ZONE.to_string()),
            counters: stats.counters(),
        };
        for event in snapshot.events() {
            self.sink.broadcast(event);
        }
        self.snapshot.send_replace(snapshot);

        let classifier = EventClassifier::new(char_name, self.catalogs.clone(), stats)
            .with_session_reset_on_zone(self.config.reset_session_on_zone);
        let tail = TailContext {
            path,
            start,
            idle_wait: self.config.tail_idle_wait(),
            sink: self.sink.clone(),
            snapshot: self.snapshot.clone(),
        };
        self.tasks.log_tail = Some(TaskSlot::spawn(&self.cancel, |cancel| {
            tail.run(classifier, cancel)
        }));
    }
}

/// Scan on the blocking pool; `None` when the file couldn't be read.
async fn full_scan(path: &Path) -> Option<ScanSummary> {
    let owned = path.to_path_buf();
    match tokio::task::spawn_blocking(move || init_from_full_scan(&owned)).await {
        Ok(Ok(summary)) => Some(summary),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Full scan failed, tailing from end of file");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "Full scan task failed");
            None
        }
    }
}

struct TailContext {
    path: PathBuf,
    start: TailStart,
    idle_wait: Duration,
    sink: Arc<dyn EventSink>,
    snapshot: Arc<watch::Sender<Snapshot>>,
}

impl TailContext {
    async fn run(self, mut classifier: EventClassifier, cancel: CancellationToken) {
        let mut tailer = match Tailer::open(&self.path, self.start).await {
            Ok(tailer) => tailer.with_idle_wait(self.idle_wait),
            Err(e) => {
                tracing::warn!(error = %e, "Could not open log file for tailing");
                return;
            }
        };
        tracing::debug!(path = %self.path.display(), position = tailer.position(), "Tailing log file");

        while let Some(line) = tailer.next_line(&cancel).await {
            for event in classifier.classify_line(&line, Instant::now()) {
                self.publish(event);
            }
        }
        tracing::debug!(path = %self.path.display(), "Tail stopped");
    }

    fn publish(&self, event: OverlayEvent) {
        self.snapshot.send_if_modified(|snap| snap.observe(&event));
        self.sink.broadcast(event);
    }
}
