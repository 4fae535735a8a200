use eqlive_core::{ConfigError, ReaderError, ServiceError, WatcherError};
use std::error::Error as _;
use thiserror::Error;

/// Anything that stops the binary with a non-zero exit code
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Watcher(#[from] WatcherError),

    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error("failed to bind {what} server on {addr}")]
    Bind {
        what: &'static str,
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write report")]
    Output(#[from] serde_json::Error),
}

impl AppError {
    /// The error and its whole source chain on one line.
    pub fn report(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}
