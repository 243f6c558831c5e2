//! Rotating sink configuration
//!
//! ```toml
//! [sink]
//! path = "logs/app.parquet"
//! compression = "snappy"
//! archive = "numeric"
//! rotation_interval = "1h"
//! ```

use serde::Deserialize;
use std::time::Duration;

/// Compression codec for finalized columnar files
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColumnCompression {
    /// No compression
    #[serde(alias = "uncompressed")]
    None,
    /// Snappy compression (default, good balance)
    #[default]
    Snappy,
    /// LZ4 compression (faster, lower ratio)
    Lz4,
    /// Zstd compression (slower, best ratio)
    Zstd,
}

/// How finalized columnar files are moved out of the canonical output slot
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArchivePolicy {
    /// `app.1`, `app.2`, ... with older generations shifted outward (default)
    #[default]
    Numeric,
    /// `app-20250101T120000Z.parquet`
    Timestamp,
}

/// Configuration for the rotating journal sink
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkSection {
    /// Canonical columnar output path. The journal lives beside it with a
    /// `.jrnl` extension.
    /// Required
    pub path: String,

    /// Default: snappy
    pub compression: ColumnCompression,

    /// Rows per record batch while converting a journal
    /// Default: 8192
    pub batch_size: usize,

    /// Default: numeric
    pub archive: ArchivePolicy,

    /// Convert a journal left behind by a previous process when opening
    /// Default: true
    pub recover_on_open: bool,

    /// Rotate the active journal as part of closing the sink
    /// Default: false
    pub rotate_on_close: bool,

    /// fsync the journal when it is closed
    /// Default: true
    pub sync_on_close: bool,

    /// Rotate on a fixed schedule
    /// Default: none (rotation is driven by the caller)
    #[serde(default, with = "humantime_serde")]
    pub rotation_interval: Option<Duration>,

    /// Directory for per-rotation working directories
    /// Default: `.<output file name>.work` beside the journal
    pub working_dir: Option<String>,
}

impl Default for SinkSection {
    fn default() -> Self {
        Self {
            path: String::new(),
            compression: ColumnCompression::Snappy,
            batch_size: 8192,
            archive: ArchivePolicy::Numeric,
            recover_on_open: true,
            rotate_on_close: false,
            sync_on_close: true,
            rotation_interval: None,
            working_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let section = SinkSection::default();
        assert!(section.path.is_empty());
        assert_eq!(section.batch_size, 8192);
        assert!(section.sync_on_close);
        assert!(section.working_dir.is_none());
    }

    #[test]
    fn test_compression_names() {
        for (s, expected) in [
            ("none", ColumnCompression::None),
            ("uncompressed", ColumnCompression::None),
            ("snappy", ColumnCompression::Snappy),
            ("lz4", ColumnCompression::Lz4),
            ("zstd", ColumnCompression::Zstd),
        ] {
            let section: SinkSection =
                toml::from_str(&format!("path = \"a\"\ncompression = \"{}\"", s)).unwrap();
            assert_eq!(section.compression, expected);
        }
    }

    #[test]
    fn test_rotation_interval_humantime() {
        let section: SinkSection = toml::from_str("path = \"a\"\nrotation_interval = \"2h\"").unwrap();
        assert_eq!(section.rotation_interval, Some(Duration::from_secs(7200)));
    }
}
