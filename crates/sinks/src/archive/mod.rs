//! Archive strategies for finalized columnar files
//!
//! After a conversion has been published at the canonical output path, an
//! [`Archiver`] moves it out of that slot so the next conversion can take it.
//! Archivers never overwrite an existing file: every rename first checks that
//! its target is free and fails with `AlreadyExists` otherwise.
//!
//! - [`NumericArchiver`]: `app.parquet` -> `app.1`, shifting `app.1` -> `app.2`
//!   and so on outward first (default)
//! - [`TimestampArchiver`]: `app.parquet` -> `app-20250101T120000Z.parquet`
//! - any `Fn(&Path) -> io::Result<PathBuf> + Send + Sync` closure

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use logspool_config::ArchivePolicy;

/// Relocates a finalized file out of the canonical output slot
///
/// Implementations must not share mutable state with the sink and must leave
/// the file where it is when they fail.
pub trait Archiver: Send + Sync {
    /// Move `path` away, returning where it went
    fn archive(&self, path: &Path) -> io::Result<PathBuf>;

    /// Reject canonical paths this strategy cannot archive safely
    fn check_output(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

impl<F> Archiver for F
where
    F: Fn(&Path) -> io::Result<PathBuf> + Send + Sync,
{
    fn archive(&self, path: &Path) -> io::Result<PathBuf> {
        self(path)
    }
}

/// Archiver for a configured policy
pub fn strategy_for(policy: ArchivePolicy) -> Arc<dyn Archiver> {
    match policy {
        ArchivePolicy::Numeric => Arc::new(NumericArchiver),
        ArchivePolicy::Timestamp => Arc::new(TimestampArchiver),
    }
}

/// Rename `from` to `to` unless `to` is taken
fn rename_no_clobber(from: &Path, to: &Path) -> io::Result<()> {
    if fs::symlink_metadata(to).is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("archive target {} already exists", to.display()),
        ));
    }
    fs::rename(from, to)
}

fn require_exists(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("nothing to archive at {}", path.display()),
        )),
        Err(e) => Err(e),
    }
}

// =============================================================================
// Numeric cascade
// =============================================================================

/// Numbered generations, newest at `.1`
///
/// Each rename is atomic; the cascade as a whole is not. A crash part way
/// through can leave a gap in the numbering but never loses a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericArchiver;

impl Archiver for NumericArchiver {
    fn archive(&self, path: &Path) -> io::Result<PathBuf> {
        numeric_archive(path)
    }

    fn check_output(&self, path: &Path) -> io::Result<()> {
        check_numeric_output(path)
    }
}

/// Path of generation `n` for canonical path `path`
///
/// The final extension is stripped before the number is appended:
/// `logs/app.parquet` -> `logs/app.3`.
pub fn generation_path(path: &Path, n: u64) -> PathBuf {
    path.with_extension(n.to_string())
}

/// Fails with `InvalidInput` when `path` is itself named like a generation
///
/// `logs/app.1` would be generation 1 of itself.
pub fn check_numeric_output(path: &Path) -> io::Result<()> {
    let numbered = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| !e.is_empty() && e.bytes().all(|b| b.is_ascii_digit()));
    if numbered {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "{} collides with its own numeric archive generations",
                path.display()
            ),
        ));
    }
    Ok(())
}

/// Move `path` to generation 1, shifting existing generations outward
pub fn numeric_archive(path: &Path) -> io::Result<PathBuf> {
    check_numeric_output(path)?;
    require_exists(path)?;

    // first free slot bounds the cascade
    let mut free = 1;
    while fs::symlink_metadata(generation_path(path, free)).is_ok() {
        free += 1;
    }

    for n in (1..free).rev() {
        let from = generation_path(path, n);
        let to = generation_path(path, n + 1);
        rename_no_clobber(&from, &to)?;
        tracing::debug!(from = %from.display(), to = %to.display(), "shifted archive generation");
    }

    let target = generation_path(path, 1);
    rename_no_clobber(path, &target)?;
    Ok(target)
}

// =============================================================================
// Timestamp
// =============================================================================

/// `dir/stem.ext` -> `dir/stem-<YYYYmmddTHHMMSSZ>.ext`
///
/// A `-<k>` suffix is added when several files are archived within the same
/// second.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampArchiver;

impl TimestampArchiver {
    /// Archive as if the current time were `now`
    pub fn archive_at(&self, path: &Path, now: DateTime<Utc>) -> io::Result<PathBuf> {
        require_exists(path)?;

        let stamp = now.format("%Y%m%dT%H%M%SZ").to_string();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

        let name_for = |k: u32| {
            let base = if k == 0 {
                format!("{stem}-{stamp}")
            } else {
                format!("{stem}-{stamp}-{k}")
            };
            match &ext {
                Some(ext) => path.with_file_name(format!("{base}.{ext}")),
                None => path.with_file_name(base),
            }
        };

        let mut k = 0;
        let mut target = name_for(k);
        while fs::symlink_metadata(&target).is_ok() {
            k += 1;
            target = name_for(k);
        }

        rename_no_clobber(path, &target)?;
        Ok(target)
    }
}

impl Archiver for TimestampArchiver {
    fn archive(&self, path: &Path) -> io::Result<PathBuf> {
        self.archive_at(path, Utc::now())
    }
}
