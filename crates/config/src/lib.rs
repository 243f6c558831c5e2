//! logspool configuration
//!
//! TOML-based configuration for the rotating journal sink and for the
//! embedding process's own diagnostics. Every section is optional except
//! `sink.path`.
//!
//! # Parsing
//!
//! ```
//! use logspool_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[sink]\npath = \"logs/app.parquet\"").unwrap();
//! assert_eq!(config.sink.batch_size, 8192);
//! ```
//!
//! # Example
//!
//! ```toml
//! [log]
//! level = "debug"
//! format = "json"
//!
//! [sink]
//! path = "logs/app.parquet"
//! compression = "zstd"
//! archive = "numeric"
//! rotation_interval = "1h"
//! ```

mod error;
mod logging;
mod sink;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, init_logging};
pub use sink::{ArchivePolicy, ColumnCompression, SinkSection};

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Diagnostics for the embedding process
    pub log: LogConfig,

    /// Rotating journal sink
    pub sink: SinkSection,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_empty_config_requires_sink_path() {
        let err = Config::from_str("").unwrap_err();
        assert!(err.to_string().contains("path"));
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_str("[sink]\npath = \"out/app.parquet\"").unwrap();
        assert_eq!(config.log.level, LogLevel::Info);
        assert_eq!(config.sink.path, "out/app.parquet");
        assert_eq!(config.sink.compression, ColumnCompression::Snappy);
        assert_eq!(config.sink.archive, ArchivePolicy::Numeric);
        assert!(config.sink.recover_on_open);
        assert!(!config.sink.rotate_on_close);
        assert!(config.sink.rotation_interval.is_none());
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
[log]
level = "debug"
format = "json"

[sink]
path = "/var/log/app/events.parquet"
compression = "zstd"
batch_size = 1024
archive = "timestamp"
recover_on_open = false
rotate_on_close = true
sync_on_close = false
rotation_interval = "15m"
working_dir = "/var/log/app/work"
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.sink.compression, ColumnCompression::Zstd);
        assert_eq!(config.sink.batch_size, 1024);
        assert_eq!(config.sink.archive, ArchivePolicy::Timestamp);
        assert!(!config.sink.recover_on_open);
        assert!(config.sink.rotate_on_close);
        assert!(!config.sink.sync_on_close);
        assert_eq!(
            config.sink.rotation_interval,
            Some(Duration::from_secs(15 * 60))
        );
        assert_eq!(
            config.sink.working_dir.as_deref(),
            Some("/var/log/app/work")
        );
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_str("[sink\npath = ").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_unknown_archive_policy_rejected() {
        let toml = "[sink]\npath = \"a.parquet\"\narchive = \"s3\"";
        assert!(matches!(
            Config::from_str(toml),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logspool.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "[sink]\npath = \"x.parquet\"\nbatch_size = 10").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.sink.batch_size, 10);
    }

    #[test]
    fn test_from_missing_file() {
        let err = Config::from_file("/definitely/not/here/logspool.toml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }));
        assert!(err.to_string().contains("logspool.toml"));
    }
}
