//! Rate-limited diagnostics for malformed journal records
//!
//! A damaged journal can contain thousands of bad lines. Every one of them is
//! recorded in the conversion report, but only the first, and then at most one
//! per interval, reaches the log with a count of the ones suppressed since.
//!
//! ```ignore
//! let logger = RateLimitedLogger::new(Duration::from_secs(10));
//! for (line, raw, err) in bad_lines {
//!     logger.record_malformed(&journal, line, &err, raw);
//! }
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval between logged diagnostics
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Maximum raw line length included in a diagnostic (prevents log injection)
pub const MAX_DATA_LOG_LENGTH: usize = 256;

/// Truncate raw record bytes for inclusion in a log line or report
pub fn excerpt(data: &[u8]) -> String {
    if data.len() > MAX_DATA_LOG_LENGTH {
        format!(
            "{}... (truncated from {} bytes)",
            String::from_utf8_lossy(&data[..MAX_DATA_LOG_LENGTH]),
            data.len()
        )
    } else {
        String::from_utf8_lossy(data).into_owned()
    }
}

/// Thread-safe rate limiter for per-record warnings
pub struct RateLimitedLogger {
    min_interval: Duration,

    last_log_time: Mutex<Option<Instant>>,

    /// Diagnostics since the last one that was logged
    pending: AtomicU64,

    total: AtomicU64,
}

impl RateLimitedLogger {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_log_time: Mutex::new(None),
            pending: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Record a record that could not be decoded
    ///
    /// Returns true if a warning was emitted, false if it was suppressed.
    pub fn record_malformed(
        &self,
        journal: &Path,
        line: u64,
        error: &dyn std::fmt::Display,
        raw: &[u8],
    ) -> bool {
        self.pending.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);

        if !self.should_log() {
            return false;
        }

        let count = self.pending.swap(0, Ordering::Relaxed);
        let total = self.total.load(Ordering::Relaxed);
        let data = excerpt(raw);

        if count > 1 {
            tracing::warn!(
                journal = %journal.display(),
                line,
                error = %error,
                data = %data,
                suppressed_count = count - 1,
                total_malformed = total,
                "skipping malformed journal record (rate-limited)"
            );
        } else {
            tracing::warn!(
                journal = %journal.display(),
                line,
                error = %error,
                data = %data,
                total_malformed = total,
                "skipping malformed journal record"
            );
        }
        true
    }

    fn should_log(&self) -> bool {
        let mut last_time = self.last_log_time.lock();
        let now = Instant::now();

        match *last_time {
            Some(last) if now.duration_since(last) < self.min_interval => false,
            _ => {
                *last_time = Some(now);
                true
            }
        }
    }

    /// Diagnostics recorded since the last logged one
    pub fn pending_count(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    pub fn total_count(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

impl Default for RateLimitedLogger {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_error() -> serde_json::Error {
        serde_json::from_str::<serde_json::Value>("{").unwrap_err()
    }

    #[test]
    fn test_first_record_always_logs() {
        let logger = RateLimitedLogger::new(Duration::from_secs(10));
        assert!(logger.record_malformed(Path::new("j.jrnl"), 1, &parse_error(), b"{"));
        assert_eq!(logger.total_count(), 1);
        assert_eq!(logger.pending_count(), 0);
    }

    #[test]
    fn test_rapid_records_suppressed_but_counted() {
        let logger = RateLimitedLogger::new(Duration::from_secs(10));
        let err = parse_error();

        assert!(logger.record_malformed(Path::new("j.jrnl"), 1, &err, b"{"));
        for line in 2..12 {
            assert!(!logger.record_malformed(Path::new("j.jrnl"), line, &err, b"{"));
        }

        assert_eq!(logger.total_count(), 11);
        assert_eq!(logger.pending_count(), 10);
    }

    #[test]
    fn test_zero_interval_logs_everything() {
        let logger = RateLimitedLogger::new(Duration::ZERO);
        let err = parse_error();
        for line in 1..5 {
            assert!(logger.record_malformed(Path::new("j.jrnl"), line, &err, b"x"));
        }
    }

    #[test]
    fn test_excerpt_truncation() {
        let long = vec![b'x'; MAX_DATA_LOG_LENGTH + 100];
        let text = excerpt(&long);
        assert!(text.starts_with(&"x".repeat(MAX_DATA_LOG_LENGTH)));
        assert!(text.contains("truncated from 356 bytes"));

        assert_eq!(excerpt(b"short"), "short");
    }

    #[test]
    fn test_excerpt_invalid_utf8() {
        let text = excerpt(&[0xff, b'a']);
        assert!(text.ends_with('a'));
    }
}
