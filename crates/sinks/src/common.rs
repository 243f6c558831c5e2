//! Error taxonomy and metrics shared by the journal, converter and sink

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::convert::ConvertError;

/// Sink errors
///
/// Three families matter to callers:
///
/// - [`is_critical`](Self::is_critical): the active journal could not be
///   closed during rotation. Durability of already-accepted entries is
///   unverified and the sink refuses further work.
/// - [`is_background`](Self::is_background): the asynchronous
///   convert/publish/archive step of a rotation failed. Logging continues
///   normally and no data was deleted.
/// - everything else: a single operation failed and may be retried by the
///   caller.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Closing the active journal failed during rotation
    #[error(
        "critical: failed to close journal {}; logging durability can no longer be verified: {source}",
        path.display()
    )]
    CriticalRotation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Sink refused work after a critical rotation failure
    #[error("sink unavailable after a critical rotation failure")]
    Unavailable,

    /// Sink has been closed
    #[error("sink closed")]
    Closed,

    /// Writing to the journal failed
    #[error("journal write failed for {}: {source}", path.display())]
    Journal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Entry could not be serialized
    #[error("failed to encode log entry: {0}")]
    Encode(#[from] serde_json::Error),

    /// Closed journal could not be moved to its working path
    #[error("failed to move journal {} to {}: {source}", from.display(), to.display())]
    Relocate {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Converting a working journal failed; the journal was preserved
    #[error("conversion of {} failed, journal preserved: {source}", journal.display())]
    Conversion {
        journal: PathBuf,
        #[source]
        source: ConvertError,
    },

    /// Finalized columnar file could not be moved onto the output path
    #[error("failed to publish {} as {}: {source}", from.display(), to.display())]
    Publish {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Archiver failed; the finalized file was left in place
    #[error("failed to archive {}, file left in place: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Conversion worker stopped before answering
    #[error("conversion queue closed")]
    QueueClosed,

    /// Conversion worker panicked or was cancelled
    #[error("conversion worker failed: {0}")]
    Worker(String),

    /// I/O error outside the journal write path
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SinkError {
    pub fn journal(path: &Path, source: io::Error) -> Self {
        Self::Journal {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn critical(path: &Path, source: io::Error) -> Self {
        Self::CriticalRotation {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn archive(path: &Path, source: io::Error) -> Self {
        Self::Archive {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Logging can no longer be trusted without external intervention
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::CriticalRotation { .. } | Self::Unavailable)
    }

    /// Failure of the post-rotation conversion step; logging is unaffected
    pub fn is_background(&self) -> bool {
        matches!(
            self,
            Self::Conversion { .. }
                | Self::Publish { .. }
                | Self::Archive { .. }
                | Self::Worker(_)
        )
    }
}

/// Sink-wide counters
#[derive(Debug, Default)]
pub struct SinkMetrics {
    pub entries_logged: AtomicU64,
    pub journal_bytes: AtomicU64,
    pub write_errors: AtomicU64,

    /// Rotations that scheduled a conversion
    pub rotations: AtomicU64,

    /// Rotations with nothing to convert
    pub idle_rotations: AtomicU64,

    pub conversions: AtomicU64,
    pub conversion_failures: AtomicU64,
    pub rows_converted: AtomicU64,
    pub malformed_records: AtomicU64,
    pub archives: AtomicU64,
    pub archive_failures: AtomicU64,
}

impl SinkMetrics {
    pub const fn new() -> Self {
        Self {
            entries_logged: AtomicU64::new(0),
            journal_bytes: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
            idle_rotations: AtomicU64::new(0),
            conversions: AtomicU64::new(0),
            conversion_failures: AtomicU64::new(0),
            rows_converted: AtomicU64::new(0),
            malformed_records: AtomicU64::new(0),
            archives: AtomicU64::new(0),
            archive_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn entry_logged(&self, bytes: u64) {
        self.entries_logged.fetch_add(1, Ordering::Relaxed);
        self.journal_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn idle_rotation(&self) {
        self.idle_rotations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished conversion
    #[inline]
    pub fn conversion(&self, rows: u64, malformed: u64) {
        self.conversions.fetch_add(1, Ordering::Relaxed);
        self.rows_converted.fetch_add(rows, Ordering::Relaxed);
        self.malformed_records
            .fetch_add(malformed, Ordering::Relaxed);
    }

    #[inline]
    pub fn conversion_failure(&self) {
        self.conversion_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn archived(&self) {
        self.archives.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn archive_failure(&self) {
        self.archive_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            entries_logged: self.entries_logged.load(Ordering::Relaxed),
            journal_bytes: self.journal_bytes.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            idle_rotations: self.idle_rotations.load(Ordering::Relaxed),
            conversions: self.conversions.load(Ordering::Relaxed),
            conversion_failures: self.conversion_failures.load(Ordering::Relaxed),
            rows_converted: self.rows_converted.load(Ordering::Relaxed),
            malformed_records: self.malformed_records.load(Ordering::Relaxed),
            archives: self.archives.load(Ordering::Relaxed),
            archive_failures: self.archive_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SinkMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub entries_logged: u64,
    pub journal_bytes: u64,
    pub write_errors: u64,
    pub rotations: u64,
    pub idle_rotations: u64,
    pub conversions: u64,
    pub conversion_failures: u64,
    pub rows_converted: u64,
    pub malformed_records: u64,
    pub archives: u64,
    pub archive_failures: u64,
}

#[cfg(test)]
#[path = "common_test.rs"]
mod common_test;
