pub mod broadcast;
pub mod classifier;
pub mod context;
pub mod game_data;
pub mod game_log;
pub mod service;
pub mod stats;

// Re-exports for convenience
pub use broadcast::{BroadcastHandle, Broadcaster, EventSink, Frame, Subscription};
pub use classifier::{ClassifierState, EventClassifier};
pub use context::{
    AppConfig, AppConfigExt, ConfigError, DEFAULT_CONFIG_FILE, LogFileMetaData, WatcherError,
    character_name, list_log_files, newest_log_file,
};
pub use game_data::{CatalogError, Catalogs, ItemIconTable, SpellRecord, SpellTable};
pub use game_log::{LogLine, Reader, ReaderError, TailStart, Tailer};
pub use service::{LiveService, ServiceError, ServiceHandle, Snapshot};
pub use stats::{ScanSummary, StatsAggregator, init_from_full_scan};
