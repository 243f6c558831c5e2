//! Append-only JSON-lines journal
//!
//! Entries are staged here before they are converted into a columnar file.
//! Each line is one self-contained JSON serialization of a [`LogEntry`]; lines
//! are written with a single `write_all` straight to the file, so on-disk order
//! is append order and there is no user-space buffer to lose.
//!
//! The file is opened lazily on the first append, in append mode, so an
//! existing journal is extended rather than truncated. A writer that never
//! wrote anything closes as a no-op and leaves no file behind.
//!
//! A failed append truncates the file back to its previous length, so a torn
//! prefix never merges with the next line.

mod reader;

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::common::SinkError;
use crate::entry::LogEntry;
use crate::util::{fsync_file, fsync_parent};

pub use reader::{JournalReader, Replayed};

/// Extension used for journal files
pub const JOURNAL_EXTENSION: &str = "jrnl";

/// Derive the journal path for a canonical output path
///
/// The final extension is replaced: `/var/log/app.parquet` -> `/var/log/app.jrnl`.
pub fn journal_path_for(output: &Path) -> PathBuf {
    output.with_extension(JOURNAL_EXTENSION)
}

/// Serialize an entry into one newline-terminated journal line
pub fn encode_line(entry: &LogEntry) -> Result<Vec<u8>, serde_json::Error> {
    let mut line = serde_json::to_vec(entry)?;
    line.push(b'\n');
    Ok(line)
}

/// Writer for one journal file
#[derive(Debug)]
pub struct JournalWriter {
    path: PathBuf,

    /// `None` until the first append
    file: Option<File>,

    /// fsync on close
    sync_on_close: bool,

    /// File length after the last successful append
    len: u64,

    entries_written: u64,
    bytes_written: u64,

    #[cfg(test)]
    faults: Faults,
}

/// Failures injected by tests
#[cfg(test)]
#[derive(Debug, Default)]
struct Faults {
    close: bool,
    torn_write: bool,
}

impl JournalWriter {
    /// Create a writer for `path` without touching the filesystem
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            sync_on_close: true,
            len: 0,
            entries_written: 0,
            bytes_written: 0,
            #[cfg(test)]
            faults: Faults::default(),
        }
    }

    /// Enable or disable fsync on close (default: enabled)
    pub fn with_sync_on_close(mut self, sync: bool) -> Self {
        self.sync_on_close = sync;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the underlying file has been opened
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Entries appended through this writer
    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    /// Bytes appended through this writer
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Serialize and append one entry
    pub fn append(&mut self, entry: &LogEntry) -> Result<(), SinkError> {
        let line = encode_line(entry)?;
        self.append_line(&line).map_err(|e| SinkError::journal(&self.path, e))
    }

    /// Append an already encoded line (see [`encode_line`])
    pub fn append_line(&mut self, line: &[u8]) -> io::Result<()> {
        let mut file = match self.file.take() {
            Some(file) => file,
            None => {
                let file = self.open()?;
                self.len = file.metadata()?.len();
                file
            }
        };

        let result = self.write_line(&mut file, line);
        if result.is_err()
            && let Err(e) = file.set_len(self.len)
        {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to truncate torn journal line"
            );
        }
        self.file = Some(file);
        result?;

        self.len += line.len() as u64;
        self.entries_written += 1;
        self.bytes_written += line.len() as u64;
        Ok(())
    }

    /// Flush and release the file
    ///
    /// A no-op when nothing was ever appended.
    pub fn close(&mut self) -> io::Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };

        #[cfg(test)]
        if std::mem::take(&mut self.faults.close) {
            return Err(io::Error::other("injected close failure"));
        }

        if self.sync_on_close {
            fsync_file(&file)?;
        }

        tracing::debug!(
            path = %self.path.display(),
            entries = self.entries_written,
            bytes = self.bytes_written,
            "journal closed"
        );
        Ok(())
    }

    fn write_line(&mut self, file: &mut File, line: &[u8]) -> io::Result<()> {
        #[cfg(test)]
        if std::mem::take(&mut self.faults.torn_write) {
            file.write_all(&line[..line.len() / 2])?;
            return Err(io::Error::other("injected torn write"));
        }

        file.write_all(line)
    }

    /// Fail the next `close` that has an open file
    #[cfg(test)]
    pub(crate) fn fail_next_close(&mut self) {
        self.faults.close = true;
    }

    /// Write half of the next line, then fail
    #[cfg(test)]
    pub(crate) fn tear_next_write(&mut self) {
        self.faults.torn_write = true;
    }

    fn open(&self) -> io::Result<File> {
        let existed = self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if !existed {
            fsync_parent(&self.path)?;
            tracing::debug!(path = %self.path.display(), "created journal");
        } else {
            tracing::debug!(path = %self.path.display(), "reopened existing journal");
        }

        Ok(file)
    }
}
