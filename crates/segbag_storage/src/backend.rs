//! Segment storage trait definitions.

use crate::error::StorageResult;
use crate::types::{SerializedRecord, TopicMetadata};
use std::path::Path;

/// A writable handle on one segment of a bag.
///
/// Backends own the physical format of a segment. The writer only
/// registers topics, appends records and asks for the current size to
/// decide when to rotate.
///
/// # Invariants
///
/// - `current_size_bytes` reflects every record accepted by `write`
/// - `path` is stable for the lifetime of the handle and remains valid
///   after the handle has been closed
/// - After `close` returns, the segment file is no longer held open
pub trait SegmentStorage: Send {
    /// Registers a topic in this segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic cannot be recorded by the backend.
    fn create_topic(&mut self, topic: &TopicMetadata) -> StorageResult<()>;

    /// Removes a topic from this segment.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::UnknownTopic`] if the topic was never
    /// created in this segment, or an I/O error.
    fn remove_topic(&mut self, topic: &TopicMetadata) -> StorageResult<()>;

    /// Appends a record to the segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be encoded or written.
    fn write(&mut self, record: &SerializedRecord) -> StorageResult<()>;

    /// Returns the size of the segment in bytes, as seen by the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn current_size_bytes(&self) -> StorageResult<u64>;

    /// Returns the location of the segment, including the backend's extension.
    fn path(&self) -> &Path;

    /// Returns the identifier of the backend that produced this segment.
    fn storage_identifier(&self) -> &str;

    /// Flushes and releases the segment.
    ///
    /// # Errors
    ///
    /// Returns an error if pending data could not be made durable. The
    /// handle is released either way.
    fn close(self: Box<Self>) -> StorageResult<()>;
}

/// Creates writable segment handles.
///
/// A factory must outlive every handle it produced.
pub trait StorageFactory: Send + Sync {
    /// Opens a new segment for writing at `location`.
    ///
    /// The backend derives the final file name from `location`, typically by
    /// appending its own extension.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::UnknownBackend`] if `storage_id` is not
    /// served by this factory, [`crate::StorageError::SegmentExists`] if a
    /// segment already exists there, or an I/O error.
    fn open_read_write(
        &self,
        location: &Path,
        storage_id: &str,
    ) -> StorageResult<Box<dyn SegmentStorage>>;
}
