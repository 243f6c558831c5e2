//! Journal replay
//!
//! Turns a closed journal back into entries, one outcome per line. A line
//! that does not decode is reported as [`Replayed::Malformed`] and replay
//! carries on with the next line; only read errors end the sequence.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::entry::LogEntry;

/// Outcome of replaying one journal line
#[derive(Debug)]
pub enum Replayed {
    /// Line decoded into an entry
    Entry { line: u64, entry: LogEntry },

    /// Line could not be decoded
    Malformed {
        line: u64,
        error: serde_json::Error,
        raw: Vec<u8>,
    },
}

impl Replayed {
    /// 1-based line number in the journal
    pub fn line(&self) -> u64 {
        match self {
            Self::Entry { line, .. } | Self::Malformed { line, .. } => *line,
        }
    }
}

/// Iterator over the records of a journal
///
/// Blank lines (e.g. a trailing newline after a crash) are skipped silently.
pub struct JournalReader<R> {
    reader: R,
    line: u64,
    buf: Vec<u8>,
}

impl JournalReader<BufReader<File>> {
    /// Open a journal file for replay
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> JournalReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: Vec::new(),
        }
    }

    /// Lines consumed so far, including blank ones
    pub fn lines_read(&self) -> u64 {
        self.line
    }
}

impl<R: BufRead> Iterator for JournalReader<R> {
    type Item = io::Result<Replayed>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e)),
            }
            self.line += 1;

            let raw = trim_line(&self.buf);
            if raw.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let line = self.line;
            return Some(Ok(match serde_json::from_slice::<LogEntry>(raw) {
                Ok(entry) => Replayed::Entry { line, entry },
                Err(error) => Replayed::Malformed {
                    line,
                    error,
                    raw: raw.to_vec(),
                },
            }));
        }
    }
}

fn trim_line(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}
