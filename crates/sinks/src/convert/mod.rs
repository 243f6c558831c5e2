//! Journal to columnar conversion
//!
//! Replays a closed journal line by line and writes every decodable entry as
//! one row of a new columnar file. Conversion is best-effort: a line that does
//! not decode is recorded as a [`RecordDiagnostic`] and skipped, never aborting
//! the run. Structural failures (the journal cannot be opened or read, the
//! output cannot be written or finalized) abort with a [`ConvertError`] and
//! leave the journal untouched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::columnar::{ColumnError, ColumnRow, ColumnWriter, ColumnWriterOptions};
use crate::journal::{JournalReader, Replayed};
use crate::util::{DEFAULT_LOG_INTERVAL, RateLimitedLogger, excerpt};

/// Conversion errors
///
/// Per-record decode failures are not errors; see [`ConversionReport`].
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Journal could not be opened; the output was not touched
    #[error("failed to open journal {}: {source}", path.display())]
    OpenJournal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading the journal failed part way through
    #[error("failed to read journal {} after line {line}: {source}", path.display())]
    ReadJournal {
        path: PathBuf,
        line: u64,
        #[source]
        source: io::Error,
    },

    /// Writing or finalizing the columnar output failed
    #[error("failed to write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: ColumnError,
    },
}

/// One journal line that could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDiagnostic {
    /// 1-based line number in the journal
    pub line: u64,
    pub error: String,
    /// Truncated raw line
    pub excerpt: String,
}

/// Outcome of a successful conversion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionReport {
    pub rows_written: u64,
    pub diagnostics: Vec<RecordDiagnostic>,
    /// Size of the finalized columnar file
    pub bytes: u64,
}

impl ConversionReport {
    /// Number of lines skipped as undecodable
    pub fn malformed(&self) -> usize {
        self.diagnostics.len()
    }
}

// =============================================================================
// Converter
// =============================================================================

/// Journal converter
pub struct Converter {
    options: ColumnWriterOptions,
    diagnostics_log: RateLimitedLogger,
}

impl Converter {
    pub fn new(options: ColumnWriterOptions) -> Self {
        Self {
            options,
            diagnostics_log: RateLimitedLogger::new(DEFAULT_LOG_INTERVAL),
        }
    }

    /// Minimum interval between logged per-record diagnostics
    pub fn with_log_interval(mut self, interval: Duration) -> Self {
        self.diagnostics_log = RateLimitedLogger::new(interval);
        self
    }

    pub fn options(&self) -> &ColumnWriterOptions {
        &self.options
    }

    /// Convert the closed journal at `journal` into a new columnar file at
    /// `output`
    ///
    /// `output` must not exist. On error any partially written output is
    /// removed; the journal is never modified.
    pub fn convert(&self, journal: &Path, output: &Path) -> Result<ConversionReport, ConvertError> {
        let reader = JournalReader::open(journal).map_err(|source| ConvertError::OpenJournal {
            path: journal.to_path_buf(),
            source,
        })?;

        let writer = ColumnWriter::create(output, &self.options).map_err(|source| {
            ConvertError::Output {
                path: output.to_path_buf(),
                source,
            }
        })?;

        match self.drain(journal, reader, writer) {
            Ok(report) => {
                tracing::info!(
                    journal = %journal.display(),
                    output = %output.display(),
                    rows = report.rows_written,
                    malformed = report.malformed(),
                    bytes = report.bytes,
                    "journal converted"
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(remove_err) = fs::remove_file(output)
                    && remove_err.kind() != io::ErrorKind::NotFound
                {
                    tracing::warn!(
                        path = %output.display(),
                        error = %remove_err,
                        "failed to remove partial columnar file"
                    );
                }
                Err(e)
            }
        }
    }

    fn drain<R: io::BufRead>(
        &self,
        journal: &Path,
        reader: JournalReader<R>,
        mut writer: ColumnWriter,
    ) -> Result<ConversionReport, ConvertError> {
        let mut report = ConversionReport::default();
        let mut pending = Vec::with_capacity(self.options.batch_size);
        let mut last_line = 0;

        for record in reader {
            if let Ok(record) = &record {
                last_line = record.line();
            }
            match record {
                Ok(Replayed::Entry { entry, .. }) => {
                    pending.push(ColumnRow::from(&entry));
                    if pending.len() >= self.options.batch_size {
                        flush(&mut writer, &mut pending)?;
                    }
                }
                Ok(Replayed::Malformed { line, error, raw }) => {
                    self.diagnostics_log
                        .record_malformed(journal, line, &error, &raw);
                    report.diagnostics.push(RecordDiagnostic {
                        line,
                        error: error.to_string(),
                        excerpt: excerpt(&raw),
                    });
                }
                Err(source) => {
                    return Err(ConvertError::ReadJournal {
                        path: journal.to_path_buf(),
                        line: last_line,
                        source,
                    });
                }
            }
        }
        flush(&mut writer, &mut pending)?;

        report.rows_written = writer.rows_written();
        let output = writer.path().to_path_buf();
        report.bytes = writer
            .finish()
            .map_err(|source| ConvertError::Output { path: output, source })?;
        Ok(report)
    }
}

fn flush(writer: &mut ColumnWriter, pending: &mut Vec<ColumnRow>) -> Result<(), ConvertError> {
    writer.write(pending).map_err(|source| ConvertError::Output {
        path: writer.path().to_path_buf(),
        source,
    })?;
    pending.clear();
    Ok(())
}

#[cfg(test)]
#[path = "convert_test.rs"]
mod convert_test;
