//! Error types for the bag writer.

use segbag_storage::StorageError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for writer operations.
pub type WriterResult<T> = Result<T, WriterError>;

/// Result type for compression plugins.
pub type CompressionResult<T> = Result<T, CompressionError>;

/// Result type for converter plugins.
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Result type for metadata persistence.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// How a caller should treat a [`WriterError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller used the writer incorrectly. Nothing was changed.
    Precondition,
    /// A resource could not be acquired or written. The session is over.
    Fatal,
    /// The operation was rejected but the bag remains usable.
    Recoverable,
}

/// Errors returned by [`crate::Writer`].
#[derive(Debug, Error)]
pub enum WriterError {
    /// No bag is open.
    #[error("bag is not open, call open() first")]
    NotOpen,

    /// A bag is already open on this writer.
    #[error("bag is already open")]
    AlreadyOpen,

    /// The topic was never registered with `create_topic`.
    #[error("topic not registered: {name}")]
    TopicNotRegistered {
        /// Name of the topic.
        name: String,
    },

    /// The options passed to `open` are unusable.
    #[error("invalid options: {message}")]
    InvalidOptions {
        /// Description of the problem.
        message: String,
    },

    /// Another writer holds the bag directory.
    #[error("bag directory locked: {}", path.display())]
    BagLocked {
        /// The bag directory.
        path: PathBuf,
    },

    /// No writable segment could be opened.
    #[error("no storage could be opened at {}: {source}", location.display())]
    StorageUnavailable {
        /// Requested segment location.
        location: PathBuf,
        /// Backend error.
        source: StorageError,
    },

    /// The active segment rejected an operation.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// No compressor is registered for the requested format.
    #[error("no compressor available for format '{format}'")]
    CompressorUnavailable {
        /// Requested compression format.
        format: String,
    },

    /// No converter is registered for the requested format pair.
    #[error("no converter available from '{input}' to '{output}'")]
    ConverterUnavailable {
        /// Input serialization format.
        input: String,
        /// Output serialization format.
        output: String,
    },

    /// A record could not be converted.
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// The catalog could not be persisted.
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl WriterError {
    /// Creates a not-open error.
    pub fn not_open() -> Self {
        Self::NotOpen
    }

    /// Creates a topic-not-registered error.
    pub fn topic_not_registered(name: impl Into<String>) -> Self {
        Self::TopicNotRegistered { name: name.into() }
    }

    /// Creates an invalid options error.
    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            message: message.into(),
        }
    }

    /// Creates a storage unavailable error.
    pub fn storage_unavailable(location: impl Into<PathBuf>, source: StorageError) -> Self {
        Self::StorageUnavailable {
            location: location.into(),
            source,
        }
    }

    /// Creates a compressor unavailable error.
    pub fn compressor_unavailable(format: impl Into<String>) -> Self {
        Self::CompressorUnavailable {
            format: format.into(),
        }
    }

    /// Creates a converter unavailable error.
    pub fn converter_unavailable(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self::ConverterUnavailable {
            input: input.into(),
            output: output.into(),
        }
    }

    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotOpen
            | Self::AlreadyOpen
            | Self::TopicNotRegistered { .. }
            | Self::InvalidOptions { .. } => ErrorKind::Precondition,
            Self::Conversion(_) => ErrorKind::Recoverable,
            Self::BagLocked { .. }
            | Self::StorageUnavailable { .. }
            | Self::Storage(_)
            | Self::CompressorUnavailable { .. }
            | Self::ConverterUnavailable { .. }
            | Self::Metadata(_)
            | Self::Io(_) => ErrorKind::Fatal,
        }
    }

    /// Returns true if the error ended the writing session.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

/// Errors raised by compression plugins.
#[derive(Debug, Error)]
pub enum CompressionError {
    /// I/O error while reading or writing a segment.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The compressor reported success but produced no file.
    #[error("compressed output missing: {}", .0.display())]
    MissingOutput(PathBuf),

    /// The input does not carry the expected compression suffix.
    #[error("not a '{identifier}' compressed file: {}", path.display())]
    UnexpectedInput {
        /// Offending path.
        path: PathBuf,
        /// Expected compression identifier.
        identifier: String,
    },

    /// Compression was requested while no compressor is configured.
    #[error("no compressor configured")]
    NotConfigured,
}

/// Errors raised by converter plugins.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The record's topic was never registered with the converter.
    #[error("topic '{0}' is not registered with the converter")]
    UnknownTopic(String),

    /// The payload could not be decoded in the input format.
    #[error("cannot decode payload: {0}")]
    Decode(String),

    /// The payload could not be encoded in the output format.
    #[error("cannot encode payload: {0}")]
    Encode(String),
}

/// Errors raised while persisting or loading the catalog.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The catalog could not be serialized or parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The catalog was written by a newer version.
    #[error("unsupported metadata version: {0}")]
    UnsupportedVersion(u32),
}

/// A compression mode string that is not `NONE`, `FILE` or `MESSAGE`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported compression mode: \"{0}\"")]
pub struct UnknownCompressionMode(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_errors_are_not_fatal() {
        assert_eq!(WriterError::not_open().kind(), ErrorKind::Precondition);
        assert_eq!(
            WriterError::topic_not_registered("never_created").kind(),
            ErrorKind::Precondition
        );
        assert!(!WriterError::AlreadyOpen.is_fatal());
    }

    #[test]
    fn acquisition_errors_are_fatal() {
        let err = WriterError::storage_unavailable(
            "bag/bag_1",
            StorageError::UnknownBackend("sqlite3".into()),
        );
        assert!(err.is_fatal());
        assert!(WriterError::compressor_unavailable("lz77").is_fatal());
        assert!(WriterError::converter_unavailable("a", "b").is_fatal());
    }

    #[test]
    fn conversion_errors_are_recoverable() {
        let err = WriterError::from(ConversionError::UnknownTopic("/a".into()));
        assert_eq!(err.kind(), ErrorKind::Recoverable);
    }

    #[test]
    fn messages_name_the_subject() {
        let err = WriterError::topic_not_registered("never_created");
        assert_eq!(err.to_string(), "topic not registered: never_created");

        let err = UnknownCompressionMode("ZIP".into());
        assert_eq!(err.to_string(), "unsupported compression mode: \"ZIP\"");
    }
}
