//! Columnar schema for finalized log files
//!
//! One table, four columns:
//!
//! - `timestamp` (TIMESTAMP(MICROS, UTC)): when the entry was produced
//! - `level` (UTF8): lowercase severity
//! - `message` (UTF8)
//! - `fields` (MAP<UTF8, UTF8>): string-valued fields only

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, MapBuilder, RecordBatch, StringArray, StringBuilder, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Fields, Schema, SchemaRef, TimeUnit};
use chrono::{DateTime, Utc};
use logspool_config::ColumnCompression;

use crate::entry::LogEntry;

pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const LEVEL_COLUMN: &str = "level";
pub const MESSAGE_COLUMN: &str = "message";
pub const FIELDS_COLUMN: &str = "fields";

/// Column names in schema order
pub const COLUMN_NAMES: [&str; 4] = [
    TIMESTAMP_COLUMN,
    LEVEL_COLUMN,
    MESSAGE_COLUMN,
    FIELDS_COLUMN,
];

const TIMEZONE: &str = "UTC";

// =============================================================================
// Compression
// =============================================================================

/// Parquet compression codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// No compression
    None,
    /// Snappy compression (fast, moderate ratio)
    #[default]
    Snappy,
    /// LZ4 compression (very fast, lower ratio)
    Lz4,
    /// Zstd compression (slower, best ratio)
    Zstd,
}

impl Compression {
    /// Convert to parquet compression type
    pub fn to_parquet(self) -> parquet::basic::Compression {
        match self {
            Self::None => parquet::basic::Compression::UNCOMPRESSED,
            Self::Snappy => parquet::basic::Compression::SNAPPY,
            Self::Lz4 => parquet::basic::Compression::LZ4,
            Self::Zstd => parquet::basic::Compression::ZSTD(Default::default()),
        }
    }

    /// Parse from string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" | "uncompressed" => Some(Self::None),
            "snappy" => Some(Self::Snappy),
            "lz4" => Some(Self::Lz4),
            "zstd" => Some(Self::Zstd),
            _ => None,
        }
    }
}

impl From<ColumnCompression> for Compression {
    fn from(value: ColumnCompression) -> Self {
        match value {
            ColumnCompression::None => Self::None,
            ColumnCompression::Snappy => Self::Snappy,
            ColumnCompression::Lz4 => Self::Lz4,
            ColumnCompression::Zstd => Self::Zstd,
        }
    }
}

// =============================================================================
// Schema
// =============================================================================

/// Entry struct of the `fields` map, matching what `MapBuilder` produces
fn map_entries_field() -> Field {
    Field::new(
        "entries",
        DataType::Struct(Fields::from(vec![
            Field::new("keys", DataType::Utf8, false),
            Field::new("values", DataType::Utf8, true),
        ])),
        false,
    )
}

/// Create the Arrow schema for finalized log files
pub fn entry_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(
            TIMESTAMP_COLUMN,
            DataType::Timestamp(TimeUnit::Microsecond, Some(TIMEZONE.into())),
            false,
        ),
        Field::new(LEVEL_COLUMN, DataType::Utf8, false),
        Field::new(MESSAGE_COLUMN, DataType::Utf8, false),
        Field::new(
            FIELDS_COLUMN,
            DataType::Map(Arc::new(map_entries_field()), false),
            false,
        ),
    ]))
}

// =============================================================================
// Rows
// =============================================================================

/// One row of a finalized log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRow {
    /// Microsecond precision
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

impl From<&LogEntry> for ColumnRow {
    /// Project an entry onto the columnar schema
    ///
    /// Only string-valued fields survive; everything else is dropped. The
    /// journal keeps the full entry.
    fn from(entry: &LogEntry) -> Self {
        let fields = entry
            .fields
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect();

        Self {
            timestamp: entry.timestamp,
            level: entry.level.as_str().to_string(),
            message: entry.message.clone(),
            fields,
        }
    }
}

/// Convert rows to an Arrow RecordBatch in [`entry_schema`] order
pub fn rows_to_record_batch(
    rows: &[ColumnRow],
    schema: SchemaRef,
) -> Result<RecordBatch, arrow::error::ArrowError> {
    let len = rows.len();

    let mut timestamps = Vec::with_capacity(len);
    let mut levels = Vec::with_capacity(len);
    let mut messages = Vec::with_capacity(len);
    let mut fields = MapBuilder::new(None, StringBuilder::new(), StringBuilder::new());

    for row in rows {
        timestamps.push(row.timestamp.timestamp_micros());
        levels.push(row.level.as_str());
        messages.push(row.message.as_str());

        for (key, value) in &row.fields {
            fields.keys().append_value(key);
            fields.values().append_value(value);
        }
        // always a map, possibly empty
        fields.append(true)?;
    }

    // must match schema field order
    let columns: Vec<ArrayRef> = vec![
        Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone(TIMEZONE)),
        Arc::new(StringArray::from(levels)),
        Arc::new(StringArray::from(messages)),
        Arc::new(fields.finish()),
    ];

    RecordBatch::try_new(schema, columns)
}
