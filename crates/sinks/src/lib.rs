//! Logspool - Sinks
//!
//! Crash-safe rotating log sink: structured entries are staged in an
//! append-only JSON-lines journal and periodically converted into immutable
//! Parquet files that are archived under a pluggable retention policy.
//!
//! # Architecture
//!
//! ```text
//! [log()] --> [JournalWriter] --> app.jrnl
//!                  | rotate()
//!                  v
//!        [conversion worker] --> [Converter] --> app.parquet --> [Archiver] --> app.1
//! ```
//!
//! Entry submission and the journal swap share one mutex, so every accepted
//! entry lands in exactly one journal. Conversion and archiving run on a single
//! background worker in rotation order.
//!
//! # Example
//!
//! ```ignore
//! use logspool_sinks::{Level, LogEntry, RotatingSink, RotatingSinkConfig};
//!
//! let sink = RotatingSink::open(RotatingSinkConfig::new("logs/app.parquet"))?;
//! sink.log(&LogEntry::new(Level::Info, "started").with_field("port", 8080))?;
//!
//! if let Some(handle) = sink.rotate()?.into_handle() {
//!     let outcome = handle.wait().await?;
//!     println!("{} rows in {}", outcome.report.rows_written, outcome.archived.display());
//! }
//! sink.close().await?;
//! ```

// =============================================================================
// Components
// =============================================================================

/// Structured log entries
pub mod entry;

/// Append-only journal writer and replay
pub mod journal;

/// Parquet-backed columnar writer and reader
pub mod columnar;

/// Journal to columnar conversion
pub mod convert;

/// Archive strategies for finalized files
pub mod archive;

/// Rotating sink and its conversion worker
pub mod rotating;

// =============================================================================
// Shared
// =============================================================================

/// Error taxonomy and metrics
pub mod common;

/// fsync helpers and rate-limited diagnostics
pub mod util;

pub use archive::{Archiver, NumericArchiver, TimestampArchiver, numeric_archive, strategy_for};
pub use columnar::{
    ColumnError, ColumnReader, ColumnRow, ColumnWriter, ColumnWriterOptions, Compression,
};
pub use common::{MetricsSnapshot, SinkError, SinkMetrics};
pub use convert::{ConversionReport, ConvertError, Converter, RecordDiagnostic};
pub use entry::{FieldValue, Level, LogEntry};
pub use journal::{JournalReader, JournalWriter, Replayed, journal_path_for};
pub use rotating::{
    ConversionHandle, ConversionOutcome, Rotation, RotatingSink, RotatingSinkConfig,
};
