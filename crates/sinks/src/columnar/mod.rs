//! Columnar storage for converted journals
//!
//! Finalized log files are Parquet files with a fixed four-column schema (see
//! [`entry_schema`]). A file is written once by [`ColumnWriter`] and never
//! modified afterwards; [`ColumnReader`] reads it back with optional column
//! projection.
//!
//! # Compatibility
//!
//! Files can be read by any Parquet reader:
//! - DuckDB: `SELECT level, message FROM 'app.1'`
//! - Pandas: `pd.read_parquet("app.1")`
//! - Polars: `pl.read_parquet("app.1")`

mod reader;
mod schema;
mod writer;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use reader::ColumnReader;
pub use schema::{
    COLUMN_NAMES, ColumnRow, Compression, FIELDS_COLUMN, LEVEL_COLUMN, MESSAGE_COLUMN,
    TIMESTAMP_COLUMN, entry_schema, rows_to_record_batch,
};
pub use writer::{ColumnWriter, ColumnWriterOptions, DEFAULT_BATCH_SIZE};

/// Columnar file errors
#[derive(Debug, Error)]
pub enum ColumnError {
    /// Output file could not be created (including when it already exists)
    #[error("failed to create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("schema mismatch: {0}")]
    Schema(String),
}

#[cfg(test)]
#[path = "columnar_test.rs"]
mod columnar_test;
