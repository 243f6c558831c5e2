//! Tests for journal conversion

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::tempdir;

use super::*;
use crate::columnar::{ColumnReader, Compression};
use crate::entry::{Level, LogEntry};
use crate::journal::{JournalWriter, encode_line};

fn entry(n: usize) -> LogEntry {
    LogEntry::new(Level::Info, format!("entry {n}")).with_field("n", format!("{n}"))
}

fn write_journal(path: &Path, entries: impl IntoIterator<Item = LogEntry>) {
    let mut writer = JournalWriter::new(path);
    for e in entries {
        writer.append(&e).unwrap();
    }
    writer.close().unwrap();
}

fn messages(path: &Path) -> Vec<String> {
    ColumnReader::open(path)
        .unwrap()
        .read_rows()
        .unwrap()
        .into_iter()
        .map(|r| r.message)
        .collect()
}

#[test]
fn test_convert_preserves_count_and_order() {
    let dir = tempdir().unwrap();
    let journal = dir.path().join("app.jrnl");
    let output = dir.path().join("app.parquet");
    write_journal(&journal, (0..25).map(entry));

    // small batches force several record batches
    let converter = Converter::new(ColumnWriterOptions::default().with_batch_size(7));
    let report = converter.convert(&journal, &output).unwrap();

    assert_eq!(report.rows_written, 25);
    assert!(report.diagnostics.is_empty());
    assert_eq!(report.bytes, fs::metadata(&output).unwrap().len());

    let expected: Vec<String> = (0..25).map(|n| format!("entry {n}")).collect();
    assert_eq!(messages(&output), expected);
}

#[test]
fn test_convert_skips_malformed_line() {
    let dir = tempdir().unwrap();
    let journal = dir.path().join("app.jrnl");
    let output = dir.path().join("app.parquet");

    let mut file = fs::File::create(&journal).unwrap();
    for n in 0..3 {
        file.write_all(&encode_line(&entry(n)).unwrap()).unwrap();
    }
    file.write_all(b"{\"level\": \"info\", \"message\": truncated\n")
        .unwrap();
    for n in 3..5 {
        file.write_all(&encode_line(&entry(n)).unwrap()).unwrap();
    }
    drop(file);

    let converter = Converter::new(ColumnWriterOptions::default());
    let report = converter.convert(&journal, &output).unwrap();

    assert_eq!(report.rows_written, 5);
    assert_eq!(report.malformed(), 1);
    assert_eq!(report.diagnostics[0].line, 4);
    assert!(report.diagnostics[0].excerpt.contains("truncated"));
    assert_eq!(
        messages(&output),
        ["entry 0", "entry 1", "entry 2", "entry 3", "entry 4"]
    );

    // journal untouched
    assert_eq!(fs::read_to_string(&journal).unwrap().lines().count(), 6);
}

#[test]
fn test_convert_missing_journal() {
    let dir = tempdir().unwrap();
    let journal = dir.path().join("missing.jrnl");
    let output = dir.path().join("app.parquet");

    let converter = Converter::new(ColumnWriterOptions::default());
    let err = converter.convert(&journal, &output).unwrap_err();

    assert!(matches!(err, ConvertError::OpenJournal { .. }));
    assert!(!output.exists());
}

#[test]
fn test_convert_refuses_existing_output() {
    let dir = tempdir().unwrap();
    let journal = dir.path().join("app.jrnl");
    let output = dir.path().join("app.parquet");
    write_journal(&journal, [entry(0)]);
    fs::write(&output, b"previous generation").unwrap();

    let converter = Converter::new(ColumnWriterOptions::default());
    let err = converter.convert(&journal, &output).unwrap_err();

    assert!(matches!(err, ConvertError::Output { .. }));
    assert_eq!(fs::read(&output).unwrap(), b"previous generation");
}

#[test]
fn test_convert_drops_non_string_fields() {
    let dir = tempdir().unwrap();
    let journal = dir.path().join("app.jrnl");
    let output = dir.path().join("app.parquet");

    let mixed = LogEntry::new(Level::Warn, "disk nearly full")
        .with_field("mount", "/var")
        .with_field("used_pct", 97i64);
    write_journal(&journal, [mixed]);

    // journal keeps the integer field
    let raw = fs::read_to_string(&journal).unwrap();
    assert!(raw.contains("\"used_pct\":97"));

    let converter = Converter::new(ColumnWriterOptions::default());
    converter.convert(&journal, &output).unwrap();

    let rows = ColumnReader::open(&output).unwrap().read_rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].level, "warn");
    assert_eq!(rows[0].fields.get("mount").map(String::as_str), Some("/var"));
    assert!(!rows[0].fields.contains_key("used_pct"));
}

#[test]
fn test_convert_empty_journal() {
    let dir = tempdir().unwrap();
    let journal = dir.path().join("app.jrnl");
    let output = dir.path().join("app.parquet");
    fs::write(&journal, b"\n").unwrap();

    let converter = Converter::new(
        ColumnWriterOptions::default().with_compression(Compression::None),
    );
    let report = converter.convert(&journal, &output).unwrap();

    assert_eq!(report.rows_written, 0);
    assert_eq!(ColumnReader::open(&output).unwrap().num_rows(), 0);
}

#[test]
fn test_convert_all_lines_malformed() {
    let dir = tempdir().unwrap();
    let journal = dir.path().join("app.jrnl");
    let output = dir.path().join("app.parquet");
    fs::write(&journal, b"garbage\nmore garbage\n").unwrap();

    let converter = Converter::new(ColumnWriterOptions::default())
        .with_log_interval(std::time::Duration::ZERO);
    let report = converter.convert(&journal, &output).unwrap();

    assert_eq!(report.rows_written, 0);
    assert_eq!(report.malformed(), 2);
    let lines: Vec<u64> = report.diagnostics.iter().map(|d| d.line).collect();
    assert_eq!(lines, [1, 2]);
}
