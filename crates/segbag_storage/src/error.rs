//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No backend is registered for the requested storage id.
    #[error("no storage backend registered for id '{0}'")]
    UnknownBackend(String),

    /// A segment already exists at the requested location.
    #[error("segment already exists: {}", .0.display())]
    SegmentExists(PathBuf),

    /// A frame body could not be encoded.
    #[error("frame encoding failed: {0}")]
    Encoding(String),

    /// The segment file is corrupted.
    #[error("segment corrupted: {0}")]
    Corrupted(String),

    /// The topic is not known to this segment.
    #[error("topic '{0}' is not registered in this segment")]
    UnknownTopic(String),
}
