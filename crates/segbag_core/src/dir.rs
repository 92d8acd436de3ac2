//! Bag directory management.
//!
//! ```text
//! <bag>/
//! ├─ LOCK            # Advisory lock for single-writer
//! ├─ metadata.json   # Catalog, written at close
//! ├─ <bag>.seg       # First segment
//! └─ <bag>_1.seg     # Segments after rotation
//! ```

use crate::error::{WriterError, WriterResult};
use crate::naming::next_segment_location;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";

/// An open bag directory.
///
/// Holds an exclusive lock on the directory for as long as it lives, so two
/// writers can never record into the same bag.
#[derive(Debug)]
pub struct BagDir {
    path: PathBuf,
    _lock_file: File,
}

impl BagDir {
    /// Creates the bag directory if needed and locks it.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::BagLocked`] if another writer holds the lock,
    /// [`WriterError::InvalidOptions`] if `path` exists and is not a
    /// directory, or an I/O error.
    pub fn open(path: &Path) -> WriterResult<Self> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        if !path.is_dir() {
            return Err(WriterError::invalid_options(format!(
                "bag location is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(WriterError::BagLocked {
                path: path.to_path_buf(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the bag directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the location of segment `rotation_index`, without any
    /// backend extension.
    #[must_use]
    pub fn segment_location(&self, rotation_index: u64) -> PathBuf {
        next_segment_location(&self.path, rotation_index)
    }

    /// Returns `path` relative to the bag directory, as stored in the
    /// catalog. Paths outside the directory are returned unchanged.
    #[must_use]
    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.path)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_nested_directory() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("out").join("run");

        let dir = BagDir::open(&path).unwrap();

        assert!(path.is_dir());
        assert!(path.join(LOCK_FILE).exists());
        assert_eq!(dir.path(), path);
    }

    #[test]
    fn second_open_is_locked() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("run");

        let _first = BagDir::open(&path).unwrap();
        let second = BagDir::open(&path);

        assert!(matches!(second, Err(WriterError::BagLocked { .. })));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("run");

        drop(BagDir::open(&path).unwrap());
        assert!(BagDir::open(&path).is_ok());
    }

    #[test]
    fn file_location_rejected() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("run");
        fs::write(&path, b"not a bag").unwrap();

        let result = BagDir::open(&path);
        assert!(matches!(result, Err(WriterError::InvalidOptions { .. })));
    }

    #[test]
    fn segment_locations_follow_naming() {
        let temp = tempdir().unwrap();
        let dir = BagDir::open(&temp.path().join("run")).unwrap();

        assert_eq!(dir.segment_location(0), temp.path().join("run").join("run"));
        assert_eq!(dir.segment_location(3), temp.path().join("run").join("run_3"));
        assert_eq!(dir.relative(&dir.segment_location(3)), "run_3");
    }
}
