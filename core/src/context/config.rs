//! Application configuration
//!
//! Re-exports the shared `AppConfig` from eqlive-types and adds loading and
//! validation. Unlike most settings files the config must exist: without a
//! log directory there is nothing to watch.

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use eqlive_types::AppConfig;

use crate::context::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "eqlive.toml";

/// Extension trait for AppConfig loading
pub trait AppConfigExt: Sized {
    fn load_from(path: &Path) -> Result<Self, ConfigError>;
    fn validate(&self) -> Result<(), ConfigError>;
    fn resolve_relative_to(&mut self, base: &Path);
    fn rotation_interval(&self) -> Duration;
    fn tail_idle_wait(&self) -> Duration;
}

impl AppConfigExt for AppConfig {
    /// Load from a TOML file. Relative paths inside the file are resolved
    /// against the file's own directory.
    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::Missing {
                path: path.to_path_buf(),
            });
        }

        let mut config: AppConfig =
            confy::load_path(path).map_err(|source| ConfigError::Load {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;

        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.log_directory.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "log_directory",
                reason: "must not be empty".to_string(),
            });
        }
        if self.rotation_poll_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "rotation_poll_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.tail_poll_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "tail_poll_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        for field in [
            &mut self.log_directory,
            &mut self.item_catalog,
            &mut self.spell_catalog,
            &mut self.asset_directory,
        ] {
            *field = resolve_path(base, field);
        }
    }

    fn rotation_interval(&self) -> Duration {
        Duration::from_millis(self.rotation_poll_ms)
    }

    fn tail_idle_wait(&self) -> Duration {
        Duration::from_millis(self.tail_poll_ms)
    }
}

fn resolve_path(base: &Path, value: &str) -> String {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        value.to_string()
    } else {
        base.join(path).to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load_from(&dir.path().join("eqlive.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
    }

    #[test]
    fn loads_and_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eqlive.toml");
        std::fs::write(
            &path,
            "log_directory = \"/games/eq/Logs\"\nitem_catalog = \"data/items.csv\"\nws_port = 7001\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.log_directory, "/games/eq/Logs");
        assert_eq!(config.ws_port, 7001);
        assert_eq!(
            PathBuf::from(&config.item_catalog),
            dir.path().join("data/items.csv")
        );
        assert_eq!(config.rotation_interval(), Duration::from_secs(2));
        assert_eq!(config.tail_idle_wait(), Duration::from_millis(100));
    }

    #[test]
    fn rejects_zero_intervals_and_empty_directory() {
        let mut config = AppConfig::with_log_directory("/logs");
        config.tail_poll_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "tail_poll_ms", .. })
        ));

        assert!(matches!(
            AppConfig::default().validate(),
            Err(ConfigError::Invalid { field: "log_directory", .. })
        ));
    }
}
