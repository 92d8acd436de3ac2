//! File-based segment storage.

use crate::backend::{SegmentStorage, StorageFactory};
use crate::error::{StorageError, StorageResult};
use crate::frame::{decode_segment, encode_header, Frame};
use crate::types::{SerializedRecord, TopicMetadata};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Storage id served by [`FileStorageFactory`].
pub const FILE_STORAGE_ID: &str = "segfile";

/// Extension appended to every segment location.
pub const SEGMENT_EXTENSION: &str = "seg";

/// An append-only segment file.
///
/// Frames are written straight through to the file, so the size reported
/// by [`SegmentStorage::current_size_bytes`] always matches the bytes handed
/// to the OS.
///
/// # Durability
///
/// - `close()` flushes and calls `File::sync_all()`
/// - Dropping the handle without `close()` releases the file without syncing
///
/// # Example
///
/// ```no_run
/// use segbag_storage::{FileStorage, SegmentStorage, SerializedRecord, TopicMetadata};
/// use std::path::Path;
///
/// let mut segment = FileStorage::create(Path::new("bag/bag")).unwrap();
/// segment.create_topic(&TopicMetadata::new("/chatter", "std_msgs/String", "cdr")).unwrap();
/// segment.write(&SerializedRecord::new("/chatter", vec![0u8; 16], 1)).unwrap();
/// Box::new(segment).close().unwrap();
/// ```
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    file: File,
    size: u64,
    topics: HashSet<String>,
}

impl FileStorage {
    /// Creates a new segment file at `location` + `.seg`.
    ///
    /// Parent directories are created if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::SegmentExists`] if the file already exists,
    /// or an I/O error if it cannot be created.
    pub fn create(location: &Path) -> StorageResult<Self> {
        let path = segment_file_path(location);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StorageError::SegmentExists(path));
            }
            Err(e) => return Err(e.into()),
        };

        let header = encode_header();
        file.write_all(&header)?;

        Ok(Self {
            path,
            file,
            size: header.len() as u64,
            topics: HashSet::new(),
        })
    }

    fn append(&mut self, frame: &Frame) -> StorageResult<()> {
        let data = frame.encode()?;
        self.file.write_all(&data)?;
        self.size += data.len() as u64;
        Ok(())
    }
}

impl SegmentStorage for FileStorage {
    fn create_topic(&mut self, topic: &TopicMetadata) -> StorageResult<()> {
        self.append(&Frame::TopicCreated(topic.clone()))?;
        self.topics.insert(topic.name.clone());
        Ok(())
    }

    fn remove_topic(&mut self, topic: &TopicMetadata) -> StorageResult<()> {
        if !self.topics.contains(&topic.name) {
            return Err(StorageError::UnknownTopic(topic.name.clone()));
        }
        self.append(&Frame::TopicRemoved(topic.clone()))?;
        self.topics.remove(&topic.name);
        Ok(())
    }

    fn write(&mut self, record: &SerializedRecord) -> StorageResult<()> {
        if !self.topics.contains(&record.topic_name) {
            return Err(StorageError::UnknownTopic(record.topic_name.clone()));
        }
        self.append(&Frame::Message(record.clone()))
    }

    fn current_size_bytes(&self) -> StorageResult<u64> {
        Ok(self.size)
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn storage_identifier(&self) -> &str {
        FILE_STORAGE_ID
    }

    fn close(mut self: Box<Self>) -> StorageResult<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

/// Factory for [`FileStorage`] segments.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileStorageFactory;

impl FileStorageFactory {
    /// Creates a file storage factory.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl StorageFactory for FileStorageFactory {
    fn open_read_write(
        &self,
        location: &Path,
        storage_id: &str,
    ) -> StorageResult<Box<dyn SegmentStorage>> {
        if storage_id != FILE_STORAGE_ID {
            return Err(StorageError::UnknownBackend(storage_id.to_string()));
        }
        Ok(Box::new(FileStorage::create(location)?))
    }
}

/// Reads and decodes every frame of a segment file.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read, or
/// [`StorageError::Corrupted`] if its contents are not a valid segment.
pub fn read_segment(path: &Path) -> StorageResult<Vec<Frame>> {
    let data = std::fs::read(path)?;
    decode_segment(&data)
}

pub(crate) fn segment_file_path(location: &Path) -> PathBuf {
    let mut name = OsString::from(location.as_os_str());
    name.push(".");
    name.push(SEGMENT_EXTENSION);
    PathBuf::from(name)
}
