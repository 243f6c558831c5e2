//! Shared helpers for the journal and conversion pipeline
//!
//! - **fsync**: file and directory durability
//! - **rate_limited_logger**: per-record diagnostics without log floods

pub mod fsync;
pub mod rate_limited_logger;

pub use fsync::{fsync_dir, fsync_file, fsync_parent};
pub use rate_limited_logger::{
    DEFAULT_LOG_INTERVAL, MAX_DATA_LOG_LENGTH, RateLimitedLogger, excerpt,
};
