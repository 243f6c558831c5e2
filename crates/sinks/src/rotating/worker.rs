//! Background conversion worker
//!
//! One worker per sink drains rotation jobs strictly in the order they were
//! queued. Because it is the only task that ever touches the canonical output
//! path, two conversions can never race on it, and archive numbering follows
//! rotation order.
//!
//! Per job:
//!
//! ```text
//! [archive leftover output] -> [convert into work dir] -> [publish] -> [drop work dir] -> [archive]
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::archive::Archiver;
use crate::common::{SinkError, SinkMetrics};
use crate::convert::{ConversionReport, Converter};
use crate::util::fsync_parent;

/// What a finished rotation produced
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    /// Rotation sequence number, starting at 1 per sink
    pub seq: u64,
    pub report: ConversionReport,
    /// Where the archiver put the finalized file
    pub archived: PathBuf,
}

/// Pending result of one rotation's background step
#[derive(Debug)]
pub struct ConversionHandle {
    seq: u64,
    rx: oneshot::Receiver<Result<ConversionOutcome, SinkError>>,
}

impl ConversionHandle {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Wait for the conversion, publication and archiving to finish
    pub async fn wait(self) -> Result<ConversionOutcome, SinkError> {
        self.rx.await.map_err(|_| SinkError::QueueClosed)?
    }

    /// Blocking variant of [`wait`](Self::wait)
    ///
    /// Must not be called from within an async context.
    pub fn blocking_wait(self) -> Result<ConversionOutcome, SinkError> {
        self.rx.blocking_recv().map_err(|_| SinkError::QueueClosed)?
    }
}

/// One rotated journal waiting for conversion
pub(crate) struct Job {
    pub seq: u64,
    pub work_dir: PathBuf,
    pub journal: PathBuf,
    reply: oneshot::Sender<Result<ConversionOutcome, SinkError>>,
}

impl Job {
    pub fn new(seq: u64, work_dir: PathBuf, journal: PathBuf) -> (Self, ConversionHandle) {
        let (reply, rx) = oneshot::channel();
        let job = Self {
            seq,
            work_dir,
            journal,
            reply,
        };
        (job, ConversionHandle { seq, rx })
    }
}

pub(crate) struct Worker {
    pub output: PathBuf,
    pub converter: Converter,
    pub archiver: Arc<dyn Archiver>,
    pub metrics: Arc<SinkMetrics>,
}

/// Worker task body; returns once every sender is dropped and the queue is
/// empty
pub(crate) async fn run_worker(mut receiver: mpsc::UnboundedReceiver<Job>, worker: Arc<Worker>) {
    tracing::debug!(output = %worker.output.display(), "conversion worker started");

    while let Some(job) = receiver.recv().await {
        let Job {
            seq,
            work_dir,
            journal,
            reply,
        } = job;

        let task = Arc::clone(&worker);
        let task_dir = work_dir.clone();
        let result = match tokio::task::spawn_blocking(move || {
            task.process(seq, &task_dir, &journal)
        })
        .await
        {
            Ok(result) => result,
            Err(e) => Err(SinkError::Worker(e.to_string())),
        };

        match &result {
            Ok(outcome) => tracing::info!(
                seq,
                rows = outcome.report.rows_written,
                malformed = outcome.report.malformed(),
                archived = %outcome.archived.display(),
                "rotation finished"
            ),
            Err(e) => tracing::error!(
                seq,
                work_dir = %work_dir.display(),
                error = %e,
                "rotation background step failed"
            ),
        }

        // nobody may be waiting
        let _ = reply.send(result);
    }

    tracing::debug!(output = %worker.output.display(), "conversion worker stopped");
}

impl Worker {
    /// Convert, publish and archive one working journal
    ///
    /// On a conversion failure the working directory is left untouched. On an
    /// archive failure the finalized file stays at the output path and is
    /// archived before the next job converts.
    pub fn process(
        &self,
        seq: u64,
        work_dir: &Path,
        journal: &Path,
    ) -> Result<ConversionOutcome, SinkError> {
        self.archive_leftover()?;

        let file_name = self.output.file_name().ok_or_else(|| {
            SinkError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("output path {} has no file name", self.output.display()),
            ))
        })?;
        let staged = work_dir.join(file_name);

        let report = self.converter.convert(journal, &staged).map_err(|source| {
            self.metrics.conversion_failure();
            SinkError::Conversion {
                journal: journal.to_path_buf(),
                source,
            }
        })?;
        self.metrics
            .conversion(report.rows_written, report.malformed() as u64);

        self.publish(&staged)?;

        if let Err(e) = fs::remove_dir_all(work_dir) {
            tracing::warn!(
                path = %work_dir.display(),
                error = %e,
                "failed to remove working directory"
            );
        }

        let archived = self.archive()?;
        Ok(ConversionOutcome {
            seq,
            report,
            archived,
        })
    }

    /// Archive a finalized file left at the output path by an earlier job
    fn archive_leftover(&self) -> Result<(), SinkError> {
        if fs::symlink_metadata(&self.output).is_err() {
            return Ok(());
        }

        tracing::warn!(
            path = %self.output.display(),
            "output slot occupied by an earlier conversion, archiving it first"
        );
        self.archive().map(|_| ())
    }

    fn publish(&self, staged: &Path) -> Result<(), SinkError> {
        let publish_err = |source| {
            self.metrics.conversion_failure();
            SinkError::Publish {
                from: staged.to_path_buf(),
                to: self.output.clone(),
                source,
            }
        };

        if fs::symlink_metadata(&self.output).is_ok() {
            return Err(publish_err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "output path is occupied",
            )));
        }
        fs::rename(staged, &self.output).map_err(publish_err)?;

        if let Err(e) = fsync_parent(&self.output) {
            tracing::warn!(path = %self.output.display(), error = %e, "failed to sync output directory");
        }
        Ok(())
    }

    fn archive(&self) -> Result<PathBuf, SinkError> {
        match self.archiver.archive(&self.output) {
            Ok(archived) => {
                self.metrics.archived();
                tracing::debug!(
                    from = %self.output.display(),
                    to = %archived.display(),
                    "archived columnar file"
                );
                Ok(archived)
            }
            Err(e) => {
                self.metrics.archive_failure();
                Err(SinkError::archive(&self.output, e))
            }
        }
    }
}
