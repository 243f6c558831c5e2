//! Parquet reader for finalized log files

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::array::{Array, AsArray, RecordBatch};
use arrow::datatypes::{SchemaRef, TimestampMicrosecondType};
use chrono::DateTime;
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::ColumnError;
use super::schema::{
    COLUMN_NAMES, ColumnRow, FIELDS_COLUMN, LEVEL_COLUMN, MESSAGE_COLUMN, TIMESTAMP_COLUMN,
};

/// Reader over one finalized columnar file
#[derive(Debug)]
pub struct ColumnReader {
    path: PathBuf,
    schema: SchemaRef,
    num_rows: u64,
}

impl ColumnReader {
    pub fn open(path: &Path) -> Result<Self, ColumnError> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
        let num_rows = builder.metadata().file_metadata().num_rows().max(0) as u64;

        Ok(Self {
            path: path.to_path_buf(),
            schema: builder.schema().clone(),
            num_rows,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    /// Top-level column names in file order
    pub fn column_names(&self) -> Vec<String> {
        self.schema.fields().iter().map(|f| f.name().clone()).collect()
    }

    pub fn num_rows(&self) -> u64 {
        self.num_rows
    }

    /// Read only the named columns
    pub fn select(&self, columns: &[&str]) -> Result<Vec<RecordBatch>, ColumnError> {
        let indices = columns
            .iter()
            .map(|name| {
                self.schema
                    .index_of(name)
                    .map_err(|_| ColumnError::UnknownColumn(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(&self.path)?)?;
        let mask = ProjectionMask::roots(builder.parquet_schema(), indices);
        let reader = builder.with_projection(mask).build()?;

        Ok(reader.collect::<Result<Vec<_>, _>>()?)
    }

    /// Decode every row
    pub fn read_rows(&self) -> Result<Vec<ColumnRow>, ColumnError> {
        let mut rows = Vec::with_capacity(self.num_rows as usize);
        for batch in self.select(&COLUMN_NAMES)? {
            decode_batch(&batch, &mut rows)?;
        }
        Ok(rows)
    }
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a dyn Array, ColumnError> {
    batch
        .column_by_name(name)
        .map(|c| c.as_ref())
        .ok_or_else(|| ColumnError::UnknownColumn(name.to_string()))
}

fn mismatch(name: &str) -> ColumnError {
    ColumnError::Schema(format!("unexpected type for column {name}"))
}

fn decode_batch(batch: &RecordBatch, rows: &mut Vec<ColumnRow>) -> Result<(), ColumnError> {
    let timestamps = column(batch, TIMESTAMP_COLUMN)?
        .as_primitive_opt::<TimestampMicrosecondType>()
        .ok_or_else(|| mismatch(TIMESTAMP_COLUMN))?;
    let levels = column(batch, LEVEL_COLUMN)?
        .as_string_opt::<i32>()
        .ok_or_else(|| mismatch(LEVEL_COLUMN))?;
    let messages = column(batch, MESSAGE_COLUMN)?
        .as_string_opt::<i32>()
        .ok_or_else(|| mismatch(MESSAGE_COLUMN))?;
    let fields = column(batch, FIELDS_COLUMN)?
        .as_map_opt()
        .ok_or_else(|| mismatch(FIELDS_COLUMN))?;

    let keys = fields
        .keys()
        .as_string_opt::<i32>()
        .ok_or_else(|| mismatch(FIELDS_COLUMN))?;
    let values = fields
        .values()
        .as_string_opt::<i32>()
        .ok_or_else(|| mismatch(FIELDS_COLUMN))?;
    let offsets = fields.value_offsets();

    for i in 0..batch.num_rows() {
        let micros = timestamps.value(i);
        let timestamp = DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| ColumnError::Schema(format!("timestamp out of range: {micros}")))?;

        let mut map = BTreeMap::new();
        if !fields.is_null(i) {
            for j in offsets[i] as usize..offsets[i + 1] as usize {
                if values.is_valid(j) {
                    map.insert(keys.value(j).to_string(), values.value(j).to_string());
                }
            }
        }

        rows.push(ColumnRow {
            timestamp,
            level: levels.value(i).to_string(),
            message: messages.value(i).to_string(),
            fields: map,
        });
    }
    Ok(())
}
