//! Rotating sink configuration

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use logspool_config::SinkSection;

use crate::archive::{Archiver, NumericArchiver, strategy_for};
use crate::columnar::{ColumnWriterOptions, Compression};

/// Configuration for [`RotatingSink`](super::RotatingSink)
#[derive(Clone)]
pub struct RotatingSinkConfig {
    /// Canonical columnar output path; the journal lives beside it
    pub path: PathBuf,

    /// Root for per-rotation working directories
    /// (default: `.<output file name>.work` beside the journal)
    pub working_dir: Option<PathBuf>,

    pub column: ColumnWriterOptions,

    /// Strategy that moves published files out of the output slot
    pub archiver: Arc<dyn Archiver>,

    /// Convert a non-empty journal found at open
    pub recover_on_open: bool,

    /// Rotate as part of [`close`](super::RotatingSink::close)
    pub rotate_on_close: bool,

    /// fsync the journal when it is closed
    pub sync_on_close: bool,

    /// Rotate on this interval once opened through
    /// [`open_shared`](super::RotatingSink::open_shared)
    pub rotation_interval: Option<Duration>,
}

impl RotatingSinkConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            working_dir: None,
            column: ColumnWriterOptions::default(),
            archiver: Arc::new(NumericArchiver),
            recover_on_open: true,
            rotate_on_close: false,
            sync_on_close: true,
            rotation_interval: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.column = self.column.with_compression(compression);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.column = self.column.with_batch_size(batch_size);
        self
    }

    /// Use a custom archive strategy (any `Fn(&Path) -> io::Result<PathBuf>`
    /// closure works)
    pub fn with_archiver(mut self, archiver: impl Archiver + 'static) -> Self {
        self.archiver = Arc::new(archiver);
        self
    }

    pub fn with_recover_on_open(mut self, recover: bool) -> Self {
        self.recover_on_open = recover;
        self
    }

    pub fn with_rotate_on_close(mut self, rotate: bool) -> Self {
        self.rotate_on_close = rotate;
        self
    }

    pub fn with_sync_on_close(mut self, sync: bool) -> Self {
        self.sync_on_close = sync;
        self
    }

    pub fn with_rotation_interval(mut self, interval: Duration) -> Self {
        self.rotation_interval = Some(interval);
        self
    }
}

impl From<&SinkSection> for RotatingSinkConfig {
    fn from(section: &SinkSection) -> Self {
        Self {
            path: PathBuf::from(&section.path),
            working_dir: section.working_dir.as_ref().map(PathBuf::from),
            column: ColumnWriterOptions::default()
                .with_compression(section.compression.into())
                .with_batch_size(section.batch_size),
            archiver: strategy_for(section.archive),
            recover_on_open: section.recover_on_open,
            rotate_on_close: section.rotate_on_close,
            sync_on_close: section.sync_on_close,
            rotation_interval: section.rotation_interval,
        }
    }
}

impl fmt::Debug for RotatingSinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingSinkConfig")
            .field("path", &self.path)
            .field("working_dir", &self.working_dir)
            .field("column", &self.column)
            .field("recover_on_open", &self.recover_on_open)
            .field("rotate_on_close", &self.rotate_on_close)
            .field("sync_on_close", &self.sync_on_close)
            .field("rotation_interval", &self.rotation_interval)
            .finish_non_exhaustive()
    }
}
