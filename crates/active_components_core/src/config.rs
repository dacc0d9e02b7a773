//! Runtime configuration for logging and SQLite storage.
//!
//! # Responsibility
//! - Group tunables consumed by `init_logging` and `open_db*`.
//! - Provide build-mode aware defaults.

use crate::db::Migration;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_MAX_LOG_FILES: usize = 5;
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Returns the default log level for current build mode.
///
/// - `debug` builds -> `debug`
/// - `release` builds -> `info`
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// File logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error` (case-insensitive).
    pub level: String,
    /// Absolute directory receiving rotated log files.
    pub log_dir: PathBuf,
    pub max_file_size_bytes: u64,
    pub max_files: usize,
}

impl LoggingConfig {
    /// Creates a config with default level and rotation for `log_dir`.
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            level: default_log_level().to_string(),
            log_dir: log_dir.into(),
            max_file_size_bytes: DEFAULT_MAX_LOG_FILE_SIZE_BYTES,
            max_files: DEFAULT_MAX_LOG_FILES,
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

/// SQLite connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub busy_timeout: Duration,
    pub foreign_keys: bool,
    /// Schema steps applied on open, in strictly increasing version order.
    pub migrations: Vec<Migration>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            foreign_keys: true,
            migrations: Vec::new(),
        }
    }
}

impl StorageConfig {
    pub fn with_migrations(mut self, migrations: &[Migration]) -> Self {
        self.migrations = migrations.to_vec();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{default_log_level, LoggingConfig, StorageConfig};
    use crate::db::Migration;

    #[test]
    fn logging_config_starts_from_build_default_level() {
        let config = LoggingConfig::new("/tmp/logs");
        assert_eq!(config.level, default_log_level());
        assert_eq!(config.with_level("warn").level, "warn");
    }

    #[test]
    fn storage_config_defaults_enable_foreign_keys() {
        let config = StorageConfig::default();
        assert!(config.foreign_keys);
        assert!(config.migrations.is_empty());

        let config = config.with_migrations(&[Migration::new(1, "SELECT 1;")]);
        assert_eq!(config.migrations.len(), 1);
    }
}
