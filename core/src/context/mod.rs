mod background_tasks;
mod config;
mod error;
mod log_files;
pub mod watcher;

pub use background_tasks::{BackgroundTasks, TaskSlot};
pub use config::{AppConfig, AppConfigExt, DEFAULT_CONFIG_FILE};
pub use error::{ConfigError, WatcherError};
pub use log_files::{
    LOG_FILE_PREFIX, LogFileMetaData, UNKNOWN_CHARACTER, character_name, is_game_log,
    list_log_files, newest_log_file,
};
pub use watcher::{DirectoryWatcher, RotationWatcher};
