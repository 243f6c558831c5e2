//! fsync helpers
//!
//! Creating or renaming a file changes its directory entry; the entry only
//! survives power loss once the directory itself has been synced.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Sync a file's contents and metadata
pub fn fsync_file(file: &File) -> io::Result<()> {
    file.sync_all()
}

/// Sync a directory so entries created or renamed in it are durable
///
/// An empty path means the current directory.
pub fn fsync_dir(dir_path: &Path) -> io::Result<()> {
    let dir_path = if dir_path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir_path
    };
    let dir = OpenOptions::new().read(true).open(dir_path)?;
    dir.sync_all()
}

/// Sync the directory containing `path`
pub fn fsync_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) => fsync_dir(parent),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn fsync_file_works() {
        let dir = tempdir().unwrap();
        let mut file = File::create(dir.path().join("a.txt")).unwrap();
        file.write_all(b"data").unwrap();
        fsync_file(&file).unwrap();
    }

    #[test]
    fn fsync_dir_works() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("a.txt")).unwrap();
        fsync_dir(dir.path()).unwrap();
    }

    #[test]
    fn fsync_parent_of_relative_file() {
        fsync_parent(Path::new("relative.txt")).unwrap();
    }

    #[test]
    fn fsync_dir_nonexistent_fails() {
        assert!(fsync_dir(Path::new("/nonexistent/logspool/dir")).is_err());
    }
}
