//! In-memory segment storage for testing.

use crate::backend::{SegmentStorage, StorageFactory};
use crate::error::{StorageError, StorageResult};
use crate::file::segment_file_path;
use crate::frame::{Frame, SEGMENT_HEADER_SIZE};
use crate::types::{SerializedRecord, TopicMetadata};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Storage id served by [`MemoryStorageFactory`].
pub const MEMORY_STORAGE_ID: &str = "memory";

/// Contents of one in-memory segment.
#[derive(Debug, Clone, Default)]
pub struct MemorySegment {
    /// Frames in write order.
    pub frames: Vec<Frame>,
    /// Size the segment would have on disk.
    pub size: u64,
    /// Whether a handle on this segment is still live.
    pub open: bool,
}

impl MemorySegment {
    /// Returns the message records of this segment.
    #[must_use]
    pub fn messages(&self) -> Vec<SerializedRecord> {
        self.frames
            .iter()
            .filter_map(|frame| match frame {
                Frame::Message(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns every topic creation recorded in this segment.
    #[must_use]
    pub fn created_topics(&self) -> Vec<TopicMetadata> {
        self.frames
            .iter()
            .filter_map(|frame| match frame {
                Frame::TopicCreated(topic) => Some(topic.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Shared, inspectable set of in-memory segments keyed by path.
///
/// Segments stay in the store after their handle is released so tests can
/// examine what a writer produced.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    segments: Arc<RwLock<BTreeMap<PathBuf, MemorySegment>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the paths of every segment ever opened, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.segments.read().keys().cloned().collect()
    }

    /// Returns a copy of the segment at `path`.
    #[must_use]
    pub fn segment(&self, path: &Path) -> Option<MemorySegment> {
        self.segments.read().get(path).cloned()
    }

    /// Returns the number of segments with a live handle.
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.segments.read().values().filter(|s| s.open).count()
    }

    /// Returns the total number of messages across all segments.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.segments
            .read()
            .values()
            .map(|s| s.messages().len())
            .sum()
    }

    fn update<T>(&self, path: &Path, f: impl FnOnce(&mut MemorySegment) -> T) -> T {
        let mut segments = self.segments.write();
        let segment = segments.entry(path.to_path_buf()).or_default();
        f(segment)
    }
}

/// A segment held in a [`MemoryStore`].
///
/// Size accounting matches [`crate::FileStorage`] byte for byte, so rotation
/// thresholds behave the same against both backends.
#[derive(Debug)]
pub struct MemoryStorage {
    path: PathBuf,
    store: MemoryStore,
    topics: HashSet<String>,
}

impl MemoryStorage {
    fn append(&mut self, frame: Frame) -> StorageResult<()> {
        let len = frame.encode()?.len() as u64;
        self.store.update(&self.path, |segment| {
            segment.size += len;
            segment.frames.push(frame);
        });
        Ok(())
    }
}

impl SegmentStorage for MemoryStorage {
    fn create_topic(&mut self, topic: &TopicMetadata) -> StorageResult<()> {
        self.append(Frame::TopicCreated(topic.clone()))?;
        self.topics.insert(topic.name.clone());
        Ok(())
    }

    fn remove_topic(&mut self, topic: &TopicMetadata) -> StorageResult<()> {
        if !self.topics.remove(&topic.name) {
            return Err(StorageError::UnknownTopic(topic.name.clone()));
        }
        self.append(Frame::TopicRemoved(topic.clone()))
    }

    fn write(&mut self, record: &SerializedRecord) -> StorageResult<()> {
        if !self.topics.contains(&record.topic_name) {
            return Err(StorageError::UnknownTopic(record.topic_name.clone()));
        }
        self.append(Frame::Message(record.clone()))
    }

    fn current_size_bytes(&self) -> StorageResult<u64> {
        let segments = self.store.segments.read();
        Ok(segments.get(&self.path).map_or(0, |segment| segment.size))
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn storage_identifier(&self) -> &str {
        MEMORY_STORAGE_ID
    }

    fn close(self: Box<Self>) -> StorageResult<()> {
        Ok(())
    }
}

impl Drop for MemoryStorage {
    fn drop(&mut self) {
        if let Some(segment) = self.store.segments.write().get_mut(&self.path) {
            segment.open = false;
        }
    }
}

/// Factory for [`MemoryStorage`] segments sharing one [`MemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageFactory {
    store: MemoryStore,
}

impl MemoryStorageFactory {
    /// Creates a factory with a fresh store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory writing into an existing store.
    #[must_use]
    pub fn with_store(store: MemoryStore) -> Self {
        Self { store }
    }

    /// Returns the store segments are written to.
    #[must_use]
    pub fn store(&self) -> MemoryStore {
        self.store.clone()
    }
}

impl StorageFactory for MemoryStorageFactory {
    fn open_read_write(
        &self,
        location: &Path,
        storage_id: &str,
    ) -> StorageResult<Box<dyn SegmentStorage>> {
        if storage_id != MEMORY_STORAGE_ID {
            return Err(StorageError::UnknownBackend(storage_id.to_string()));
        }

        let path = segment_file_path(location);
        {
            let mut segments = self.store.segments.write();
            if segments.contains_key(&path) {
                return Err(StorageError::SegmentExists(path));
            }
            segments.insert(
                path.clone(),
                MemorySegment {
                    frames: Vec::new(),
                    size: SEGMENT_HEADER_SIZE,
                    open: true,
                },
            );
        }

        Ok(Box::new(MemoryStorage {
            path,
            store: self.store.clone(),
            topics: HashSet::new(),
        }))
    }
}
