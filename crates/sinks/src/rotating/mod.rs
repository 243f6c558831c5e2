//! Rotating journal sink
//!
//! Accepts entries from any number of threads, appends them to the active
//! journal, and on [`rotate`](RotatingSink::rotate) hands the closed journal to
//! a background worker that converts it into a columnar file and archives it.
//!
//! # Rotation
//!
//! ```text
//! [log()] --mutex--> [JournalWriter] --> app.jrnl
//!                         |
//!              rotate(): close, rename, install fresh writer
//!                         v
//!         .app.parquet.work/<ts>-<uuid>/journal.jrnl
//!                         |  (FIFO queue, one worker)
//!                         v
//!     [convert] -> app.parquet -> [archiver] -> app.1, app.2, ...
//! ```
//!
//! The swap happens under the same mutex `log()` takes, so every accepted
//! entry lands in exactly one journal. The conversion job is queued before the
//! mutex is released, which keeps queue order equal to rotation order.
//!
//! # Failure model
//!
//! - Closing the active journal fails: [`SinkError::CriticalRotation`]. The
//!   sink stops accepting work and every later call returns
//!   [`SinkError::Unavailable`].
//! - Moving the closed journal to its working directory fails:
//!   [`SinkError::Relocate`]. The journal stays where it is and is reopened in
//!   append mode by the next `log()`, so nothing is lost.
//! - The background step fails: reported through the [`ConversionHandle`] and
//!   the log. Working journals are preserved on conversion failure, finalized
//!   files are left at the output path on archive failure.

mod config;
mod worker;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::common::{SinkError, SinkMetrics};
use crate::convert::Converter;
use crate::entry::LogEntry;
use crate::journal::{JournalWriter, encode_line, journal_path_for};
use crate::util::{fsync_dir, fsync_parent};

pub use config::RotatingSinkConfig;
pub use worker::{ConversionHandle, ConversionOutcome};

use worker::{Job, Worker, run_worker};

/// File name of the journal inside a working directory
pub const WORK_JOURNAL_NAME: &str = "journal.jrnl";

/// Result of a successful [`RotatingSink::rotate`]
#[derive(Debug)]
pub enum Rotation {
    /// Nothing was written since the last rotation
    Idle,

    /// A journal was rotated and queued for conversion
    Scheduled(ConversionHandle),
}

impl Rotation {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn into_handle(self) -> Option<ConversionHandle> {
        match self {
            Self::Idle => None,
            Self::Scheduled(handle) => Some(handle),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    /// Active journal could not be closed during rotation
    Broken,
    Closed,
}

/// Everything guarded by the sink mutex
struct Inner {
    state: State,
    journal: JournalWriter,
    /// `None` once closed
    sender: Option<mpsc::UnboundedSender<Job>>,
    next_seq: u64,
}

impl Inner {
    fn ensure_usable(&self) -> Result<(), SinkError> {
        match self.state {
            State::Open => Ok(()),
            State::Broken => Err(SinkError::Unavailable),
            State::Closed => Err(SinkError::Closed),
        }
    }
}

// =============================================================================
// Rotating Sink
// =============================================================================

/// Crash-safe rotating log sink
///
/// Must be opened from within a tokio runtime; the conversion worker runs on
/// it. `log` and `rotate` are synchronous and may be called from any thread.
pub struct RotatingSink {
    output: PathBuf,
    journal_path: PathBuf,
    work_root: PathBuf,
    sync_on_close: bool,
    rotate_on_close: bool,
    rotation_interval: Option<Duration>,

    inner: Mutex<Inner>,
    worker: Mutex<Option<JoinHandle<()>>>,
    periodic: Mutex<Option<JoinHandle<()>>>,
    recovery: Mutex<Option<ConversionHandle>>,
    metrics: Arc<SinkMetrics>,
}

impl RotatingSink {
    /// Open the sink, start its conversion worker and, if enabled, queue a
    /// journal left behind by a previous process
    pub fn open(config: RotatingSinkConfig) -> Result<Self, SinkError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SinkError::Worker(format!("no tokio runtime: {e}")))?;

        let output = config.path.clone();
        let Some(file_name) = output.file_name() else {
            return Err(SinkError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("output path {} has no file name", output.display()),
            )));
        };

        let journal_path = journal_path_for(&output);
        if journal_path == output {
            return Err(SinkError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("output path {} would be its own journal", output.display()),
            )));
        }
        config.archiver.check_output(&output)?;

        let work_root = match &config.working_dir {
            Some(dir) => dir.clone(),
            None => {
                let mut name = std::ffi::OsString::from(".");
                name.push(file_name);
                name.push(".work");
                journal_path.with_file_name(name)
            }
        };

        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir_all(&work_root)?;

        let metrics = Arc::new(SinkMetrics::new());
        let worker = Arc::new(Worker {
            output: output.clone(),
            converter: Converter::new(config.column),
            archiver: Arc::clone(&config.archiver),
            metrics: Arc::clone(&metrics),
        });
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker_task = runtime.spawn(run_worker(receiver, worker));

        let sink = Self {
            output,
            journal_path: journal_path.clone(),
            work_root,
            sync_on_close: config.sync_on_close,
            rotate_on_close: config.rotate_on_close,
            rotation_interval: config.rotation_interval,
            inner: Mutex::new(Inner {
                state: State::Open,
                journal: JournalWriter::new(&journal_path)
                    .with_sync_on_close(config.sync_on_close),
                sender: Some(sender),
                next_seq: 1,
            }),
            worker: Mutex::new(Some(worker_task)),
            periodic: Mutex::new(None),
            recovery: Mutex::new(None),
            metrics,
        };

        let preserved = sink.preserved_journals()?;
        if !preserved.is_empty() {
            tracing::warn!(
                count = preserved.len(),
                root = %sink.work_root.display(),
                "working journals from failed conversions need manual recovery"
            );
        }

        if config.recover_on_open && has_entries(&sink.journal_path) {
            tracing::info!(path = %sink.journal_path.display(), "recovering leftover journal");
            let scheduled = sink.schedule(&mut sink.inner.lock());
            match scheduled {
                Ok(handle) => *sink.recovery.lock() = Some(handle),
                // journal stays in place and is appended to
                Err(e) => tracing::warn!(
                    path = %sink.journal_path.display(),
                    error = %e,
                    "failed to recover leftover journal"
                ),
            }
        }

        tracing::info!(
            output = %sink.output.display(),
            journal = %sink.journal_path.display(),
            "rotating sink opened"
        );
        Ok(sink)
    }

    /// Open the sink behind an `Arc` and start the configured periodic
    /// rotation, if any
    ///
    /// The rotation task stops when the sink is closed.
    pub fn open_shared(config: RotatingSinkConfig) -> Result<Arc<Self>, SinkError> {
        let sink = Arc::new(Self::open(config)?);
        if let Some(interval) = sink.rotation_interval {
            let driver = Self::spawn_periodic_rotation(Arc::clone(&sink), interval);
            *sink.periodic.lock() = Some(driver);
            tracing::info!(interval = ?interval, "periodic rotation started");
        }
        Ok(sink)
    }

    /// Canonical columnar output path
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Path of the active journal
    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }

    /// Root of the per-rotation working directories
    pub fn working_root(&self) -> &Path {
        &self.work_root
    }

    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    /// Handle for the conversion of a journal recovered at open, if any
    pub fn take_recovery(&self) -> Option<ConversionHandle> {
        self.recovery.lock().take()
    }

    /// Append one entry to the active journal
    pub fn log(&self, entry: &LogEntry) -> Result<(), SinkError> {
        let line = encode_line(entry)?;

        let mut inner = self.inner.lock();
        inner.ensure_usable()?;

        if let Err(e) = inner.journal.append_line(&line) {
            self.metrics.write_error();
            return Err(SinkError::journal(&self.journal_path, e));
        }
        self.metrics.entry_logged(line.len() as u64);
        Ok(())
    }

    /// Swap in a fresh journal and queue the closed one for conversion
    ///
    /// Returns [`Rotation::Idle`] when there is nothing to rotate. A
    /// [`SinkError::CriticalRotation`] leaves the sink unusable.
    pub fn rotate(&self) -> Result<Rotation, SinkError> {
        let mut inner = self.inner.lock();
        inner.ensure_usable()?;

        if !inner.journal.is_open() && !has_entries(&self.journal_path) {
            self.metrics.idle_rotation();
            tracing::debug!(path = %self.journal_path.display(), "nothing to rotate");
            return Ok(Rotation::Idle);
        }

        if let Err(e) = inner.journal.close() {
            inner.state = State::Broken;
            tracing::error!(
                path = %self.journal_path.display(),
                error = %e,
                "failed to close journal, sink is no longer accepting entries"
            );
            return Err(SinkError::critical(&self.journal_path, e));
        }

        let handle = self.schedule(&mut inner)?;
        Ok(Rotation::Scheduled(handle))
    }

    /// Stop accepting entries and wait for every queued conversion
    ///
    /// The active journal is closed and left in place for recovery unless
    /// `rotate_on_close` is set. Closing twice is a no-op.
    pub async fn close(&self) -> Result<(), SinkError> {
        if let Some(driver) = self.periodic.lock().take() {
            driver.abort();
        }

        let state = self.inner.lock().state;
        if state == State::Closed {
            return Ok(());
        }

        let mut result = Ok(());
        let mut final_rotation = None;
        if self.rotate_on_close && state == State::Open {
            match self.rotate() {
                Ok(rotation) => final_rotation = rotation.into_handle(),
                Err(SinkError::Closed) => return Ok(()),
                Err(e) => result = Err(e),
            }
        }

        let sender = {
            let mut inner = self.inner.lock();
            if inner.state == State::Closed {
                return result;
            }
            if inner.state == State::Open
                && let Err(e) = inner.journal.close()
            {
                self.metrics.write_error();
                if result.is_ok() {
                    result = Err(SinkError::journal(&self.journal_path, e));
                }
            }
            inner.state = State::Closed;
            inner.sender.take()
        };
        // lets the worker exit once the queue is drained
        drop(sender);

        if let Some(handle) = final_rotation
            && let Err(e) = handle.wait().await
            && result.is_ok()
        {
            result = Err(e);
        }

        let worker = self.worker.lock().take();
        if let Some(worker) = worker
            && let Err(e) = worker.await
            && result.is_ok()
        {
            result = Err(SinkError::Worker(e.to_string()));
        }

        tracing::info!(output = %self.output.display(), "rotating sink closed");
        result
    }

    /// Working journals left by conversions that failed (or are still queued)
    ///
    /// Oldest first. These are never reused by the sink.
    pub fn preserved_journals(&self) -> io::Result<Vec<PathBuf>> {
        let mut journals = Vec::new();
        for dir_entry in fs::read_dir(&self.work_root)? {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_dir() {
                continue;
            }
            let journal = dir_entry.path().join(WORK_JOURNAL_NAME);
            if journal.is_file() {
                journals.push(journal);
            }
        }
        journals.sort();
        Ok(journals)
    }

    /// Rotate on a fixed interval until the sink is closed or broken
    pub fn spawn_periodic_rotation(sink: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let rotating = Arc::clone(&sink);
                let result = match tokio::task::spawn_blocking(move || rotating.rotate()).await {
                    Ok(result) => result,
                    Err(e) => Err(SinkError::Worker(e.to_string())),
                };

                match result {
                    Ok(_) => {}
                    Err(SinkError::Closed) => break,
                    Err(e) if e.is_critical() => {
                        tracing::error!(error = %e, "periodic rotation stopped");
                        break;
                    }
                    Err(e) => tracing::warn!(error = %e, "periodic rotation failed"),
                }
            }

            tracing::debug!(output = %sink.output.display(), "periodic rotation finished");
        })
    }

    /// Move the closed journal to a fresh working directory, install a new
    /// writer and queue the job. Caller holds the sink mutex.
    fn schedule(&self, inner: &mut Inner) -> Result<ConversionHandle, SinkError> {
        let work_dir = create_work_dir(&self.work_root, fsync_parent).map_err(|source| SinkError::Relocate {
            from: self.journal_path.clone(),
            to: self.work_root.clone(),
            source,
        })?;
        let staged = work_dir.join(WORK_JOURNAL_NAME);

        if let Err(source) = fs::rename(&self.journal_path, &staged) {
            if let Err(e) = fs::remove_dir(&work_dir) {
                tracing::warn!(path = %work_dir.display(), error = %e, "failed to remove working directory");
            }
            return Err(SinkError::Relocate {
                from: self.journal_path.clone(),
                to: staged,
                source,
            });
        }
        for dir in [Some(work_dir.as_path()), self.journal_path.parent()]
            .into_iter()
            .flatten()
        {
            if let Err(e) = fsync_dir(dir) {
                tracing::warn!(path = %dir.display(), error = %e, "failed to sync directory");
            }
        }

        inner.journal =
            JournalWriter::new(&self.journal_path).with_sync_on_close(self.sync_on_close);

        let seq = inner.next_seq;
        inner.next_seq += 1;

        let (job, handle) = Job::new(seq, work_dir.clone(), staged);
        let sender = inner.sender.as_ref().ok_or(SinkError::Closed)?;
        sender.send(job).map_err(|_| SinkError::QueueClosed)?;

        self.metrics.rotation();
        tracing::info!(
            seq,
            journal = %self.journal_path.display(),
            work_dir = %work_dir.display(),
            "journal rotated"
        );
        Ok(handle)
    }
}

/// Create a fresh, uniquely named working directory under `root`
///
/// `sync` makes the new entry durable; when it fails the directory is removed
/// again.
fn create_work_dir(
    root: &Path,
    sync: impl FnOnce(&Path) -> io::Result<()>,
) -> io::Result<PathBuf> {
    let name = format!(
        "{}-{}",
        Utc::now().format("%Y%m%dT%H%M%S%.6fZ"),
        Uuid::new_v4().simple()
    );
    let dir = root.join(name);
    // never reuse an existing directory
    fs::create_dir(&dir)?;
    if let Err(e) = sync(&dir) {
        if let Err(cleanup) = fs::remove_dir(&dir) {
            tracing::warn!(path = %dir.display(), error = %cleanup, "failed to remove working directory");
        }
        return Err(e);
    }
    Ok(dir)
}

/// Whether a journal with at least one byte exists at `path`
fn has_entries(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}
