//! Configuration validation
//!
//! - `sink.path` is present and names a file
//! - `sink.path` does not share its name with the journal beside it
//! - with numeric archiving, `sink.path` does not end in a generation number
//! - `sink.batch_size` is non-zero
//! - `sink.rotation_interval`, when set, is at least one second

use std::path::Path;
use std::time::Duration;

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::sink::ArchivePolicy;

const MIN_ROTATION_INTERVAL: Duration = Duration::from_secs(1);

/// Extension the sink gives the journal beside its output
const JOURNAL_EXTENSION: &str = "jrnl";

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let sink = &config.sink;

    if sink.path.trim().is_empty() {
        return Err(ConfigError::missing_field("sink", "path"));
    }

    if sink.path.ends_with('/') || Path::new(&sink.path).file_name().is_none() {
        return Err(ConfigError::invalid_value(
            "sink",
            "path",
            format!("'{}' does not name a file", sink.path),
        ));
    }

    let extension = Path::new(&sink.path).extension().and_then(|e| e.to_str());
    if extension == Some(JOURNAL_EXTENSION) {
        return Err(ConfigError::invalid_value(
            "sink",
            "path",
            format!("'{}' would be its own journal", sink.path),
        ));
    }

    if sink.archive == ArchivePolicy::Numeric
        && let Some(ext) = extension
        && !ext.is_empty()
        && ext.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(ConfigError::invalid_value(
            "sink",
            "path",
            format!("'{}' collides with numeric archive generations", sink.path),
        ));
    }

    if sink.batch_size == 0 {
        return Err(ConfigError::invalid_value(
            "sink",
            "batch_size",
            "must be greater than zero",
        ));
    }

    if let Some(interval) = sink.rotation_interval
        && interval < MIN_ROTATION_INTERVAL
    {
        return Err(ConfigError::invalid_value(
            "sink",
            "rotation_interval",
            format!("{:?} is shorter than one second", interval),
        ));
    }

    if let Some(ref dir) = sink.working_dir
        && dir.trim().is_empty()
    {
        return Err(ConfigError::invalid_value(
            "sink",
            "working_dir",
            "must not be empty when set",
        ));
    }

    Ok(())
}
