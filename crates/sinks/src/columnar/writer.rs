//! Parquet writer for finalized log files

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use arrow::datatypes::SchemaRef;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use super::ColumnError;
use super::schema::{ColumnRow, Compression, entry_schema, rows_to_record_batch};
use crate::util::fsync_file;

/// Default rows per record batch
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Options for [`ColumnWriter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnWriterOptions {
    pub compression: Compression,

    /// Rows buffered by callers before each [`ColumnWriter::write`]
    pub batch_size: usize,
}

impl Default for ColumnWriterOptions {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl ColumnWriterOptions {
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

// =============================================================================
// Column Writer
// =============================================================================

/// Writer producing one immutable columnar file
///
/// The file is created exclusively; an existing file at the path is an error.
/// Nothing written is considered finalized until [`finish`](Self::finish)
/// returns successfully.
pub struct ColumnWriter {
    path: PathBuf,
    schema: SchemaRef,
    writer: ArrowWriter<File>,
    rows_written: u64,
}

impl ColumnWriter {
    pub fn create(path: &Path, options: &ColumnWriterOptions) -> Result<Self, ColumnError> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|source| ColumnError::Create {
                path: path.to_path_buf(),
                source,
            })?;

        let schema = entry_schema();
        let props = WriterProperties::builder()
            .set_compression(options.compression.to_parquet())
            .build();

        let writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        Ok(Self {
            path: path.to_path_buf(),
            schema,
            writer,
            rows_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Write one batch of rows
    pub fn write(&mut self, rows: &[ColumnRow]) -> Result<(), ColumnError> {
        if rows.is_empty() {
            return Ok(());
        }

        let batch = rows_to_record_batch(rows, self.schema.clone())?;
        self.writer.write(&batch)?;
        self.rows_written += rows.len() as u64;
        Ok(())
    }

    /// Write the footer, sync and close the file
    ///
    /// Returns the size of the finalized file in bytes.
    pub fn finish(self) -> Result<u64, ColumnError> {
        self.writer.close()?;

        let file = File::open(&self.path)?;
        fsync_file(&file)?;

        let bytes = fs::metadata(&self.path)?.len();
        tracing::debug!(
            path = %self.path.display(),
            rows = self.rows_written,
            bytes,
            "columnar file finalized"
        );
        Ok(bytes)
    }
}
