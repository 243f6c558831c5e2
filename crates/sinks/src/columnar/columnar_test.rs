//! Tests for the columnar writer and reader

use std::collections::BTreeMap;

use arrow::array::AsArray;
use arrow::datatypes::DataType;
use chrono::{TimeZone, Utc};
use logspool_config::ColumnCompression;
use tempfile::tempdir;

use super::*;
use crate::entry::{Level, LogEntry};

fn row(n: u32) -> ColumnRow {
    let mut fields = BTreeMap::new();
    fields.insert("host".to_string(), format!("web-{n}"));
    ColumnRow {
        timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, n).unwrap(),
        level: "info".to_string(),
        message: format!("row {n}"),
        fields,
    }
}

// =============================================================================
// Compression
// =============================================================================

#[test]
fn test_compression_to_parquet() {
    assert!(matches!(
        Compression::None.to_parquet(),
        parquet::basic::Compression::UNCOMPRESSED
    ));
    assert!(matches!(
        Compression::Snappy.to_parquet(),
        parquet::basic::Compression::SNAPPY
    ));
    assert!(matches!(
        Compression::Lz4.to_parquet(),
        parquet::basic::Compression::LZ4
    ));
    assert!(matches!(
        Compression::Zstd.to_parquet(),
        parquet::basic::Compression::ZSTD(_)
    ));
}

#[test]
fn test_compression_parse() {
    assert_eq!(Compression::parse("uncompressed"), Some(Compression::None));
    assert_eq!(Compression::parse("SNAPPY"), Some(Compression::Snappy));
    assert_eq!(Compression::parse("zstd"), Some(Compression::Zstd));
    assert_eq!(Compression::parse("gzip"), None);
    assert_eq!(Compression::default(), Compression::Snappy);
}

#[test]
fn test_compression_from_config() {
    assert_eq!(Compression::from(ColumnCompression::None), Compression::None);
    assert_eq!(Compression::from(ColumnCompression::Lz4), Compression::Lz4);
    assert_eq!(Compression::from(ColumnCompression::default()), Compression::Snappy);
}

// =============================================================================
// Schema
// =============================================================================

#[test]
fn test_entry_schema_fields() {
    let schema = entry_schema();
    assert_eq!(schema.fields().len(), 4);
    assert_eq!(schema.field(0).name(), "timestamp");
    assert!(matches!(schema.field(0).data_type(), DataType::Timestamp(_, Some(tz)) if &**tz == "UTC"));
    assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
    assert_eq!(schema.field(2).data_type(), &DataType::Utf8);
    assert!(matches!(schema.field(3).data_type(), DataType::Map(_, false)));
}

#[test]
fn test_row_from_entry_drops_non_string_fields() {
    let entry = LogEntry::new(Level::Error, "boom")
        .with_field("code", 500i64)
        .with_field("retry", false)
        .with_field("service", "api");

    let row = ColumnRow::from(&entry);
    assert_eq!(row.level, "error");
    assert_eq!(row.message, "boom");
    assert_eq!(row.fields.len(), 1);
    assert_eq!(row.fields["service"], "api");
}

#[test]
fn test_record_batch_matches_schema() {
    let mut empty = row(1);
    empty.fields.clear();

    let batch = rows_to_record_batch(&[row(0), empty], entry_schema()).unwrap();
    assert_eq!(batch.num_rows(), 2);

    let fields = batch.column(3).as_map();
    assert_eq!(fields.value_length(0), 1);
    assert_eq!(fields.value_length(1), 0);
}

// =============================================================================
// Writer / Reader
// =============================================================================

#[test]
fn test_write_and_read_rows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.parquet");

    let mut writer = ColumnWriter::create(&path, &ColumnWriterOptions::default()).unwrap();
    writer.write(&[row(0), row(1)]).unwrap();
    writer.write(&[row(2)]).unwrap();
    assert_eq!(writer.rows_written(), 3);
    let bytes = writer.finish().unwrap();
    assert_eq!(bytes, std::fs::metadata(&path).unwrap().len());

    let reader = ColumnReader::open(&path).unwrap();
    assert_eq!(reader.num_rows(), 3);
    assert_eq!(
        reader.column_names(),
        ["timestamp", "level", "message", "fields"]
    );

    let rows = reader.read_rows().unwrap();
    assert_eq!(rows, vec![row(0), row(1), row(2)]);
}

#[test]
fn test_empty_file_is_valid() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.parquet");

    let writer = ColumnWriter::create(&path, &ColumnWriterOptions::default()).unwrap();
    writer.finish().unwrap();

    let reader = ColumnReader::open(&path).unwrap();
    assert_eq!(reader.num_rows(), 0);
    assert!(reader.read_rows().unwrap().is_empty());
}

#[test]
fn test_select_columns_by_name() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.parquet");

    let options = ColumnWriterOptions::default().with_compression(Compression::Zstd);
    let mut writer = ColumnWriter::create(&path, &options).unwrap();
    writer.write(&[row(0), row(1)]).unwrap();
    writer.finish().unwrap();

    let reader = ColumnReader::open(&path).unwrap();
    let batches = reader.select(&["message"]).unwrap();
    let batch = &batches[0];
    assert_eq!(batch.num_columns(), 1);
    assert_eq!(batch.schema().field(0).name(), "message");

    let messages = batch.column(0).as_string::<i32>();
    assert_eq!(messages.value(0), "row 0");
    assert_eq!(messages.value(1), "row 1");
}

#[test]
fn test_select_unknown_column() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.parquet");

    let writer = ColumnWriter::create(&path, &ColumnWriterOptions::default()).unwrap();
    writer.finish().unwrap();

    let reader = ColumnReader::open(&path).unwrap();
    let err = reader.select(&["severity"]).unwrap_err();
    assert!(matches!(err, ColumnError::UnknownColumn(name) if name == "severity"));
}

#[test]
fn test_create_refuses_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.parquet");
    std::fs::write(&path, b"do not clobber").unwrap();

    let result = ColumnWriter::create(&path, &ColumnWriterOptions::default());
    assert!(matches!(result, Err(ColumnError::Create { .. })));
    assert_eq!(std::fs::read(&path).unwrap(), b"do not clobber");
}

#[test]
fn test_batch_size_floor() {
    let options = ColumnWriterOptions::default().with_batch_size(0);
    assert_eq!(options.batch_size, 1);
    assert_eq!(ColumnWriterOptions::default().batch_size, DEFAULT_BATCH_SIZE);
}
