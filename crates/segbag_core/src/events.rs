//! Structured writer events.
//!
//! The writer reports what happens to a bag through an [`EventSink`]
//! instead of logging directly, so embedding applications and tests can
//! observe rotations and compression failures.

use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Something that happened to an open bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterEvent {
    /// A bag was opened and its first segment created.
    Opened {
        /// Bag directory.
        location: PathBuf,
        /// Storage backend writing the segments.
        storage_id: String,
        /// `NONE`, `FILE` or `MESSAGE`.
        compression_mode: String,
        /// Compressor identifier, empty when compression is off.
        compression_format: String,
    },
    /// A topic was registered.
    TopicCreated {
        /// Topic name.
        name: String,
    },
    /// A topic was removed.
    TopicRemoved {
        /// Topic name.
        name: String,
    },
    /// The active segment was closed and a new one opened.
    SegmentRotated {
        /// Segment that was closed.
        closed: PathBuf,
        /// Segment that is now active.
        opened: PathBuf,
        /// Index of the new segment.
        rotation: u64,
    },
    /// A closed segment was replaced by its compressed version.
    SegmentCompressed {
        /// Uncompressed segment, now deleted.
        original: PathBuf,
        /// Compressed segment.
        compressed: PathBuf,
        /// Time spent compressing.
        elapsed: Duration,
    },
    /// A closed segment could not be compressed and was kept as is.
    SegmentCompressionFailed {
        /// Segment kept uncompressed.
        path: PathBuf,
        /// Error message.
        error: String,
    },
    /// A payload could not be compressed and was written uncompressed.
    RecordCompressionFailed {
        /// Topic of the record.
        topic: String,
        /// Error message.
        error: String,
    },
    /// A fatal error discarded the session. No catalog was written.
    SessionAborted {
        /// Error message.
        error: String,
    },
    /// The bag was closed and its catalog persisted.
    Closed {
        /// Bag directory.
        location: PathBuf,
        /// Number of segments.
        segments: usize,
        /// Number of messages.
        message_count: u64,
    },
}

/// Receives writer events.
pub trait EventSink: Send + Sync {
    /// Handles one event.
    fn emit(&self, event: &WriterEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &WriterEvent) {
        match event {
            WriterEvent::Opened {
                location,
                storage_id,
                compression_mode,
                compression_format,
            } => info!(
                target: "segbag::writer",
                location = %location.display(),
                storage_id = %storage_id,
                compression_mode = %compression_mode,
                compression_format = %compression_format,
                "opened bag"
            ),
            WriterEvent::TopicCreated { name } => {
                debug!(target: "segbag::writer", topic = %name, "topic created");
            }
            WriterEvent::TopicRemoved { name } => {
                debug!(target: "segbag::writer", topic = %name, "topic removed");
            }
            WriterEvent::SegmentRotated {
                closed,
                opened,
                rotation,
            } => debug!(
                target: "segbag::writer",
                closed = %closed.display(),
                opened = %opened.display(),
                rotation,
                "rotated segment"
            ),
            WriterEvent::SegmentCompressed {
                original,
                compressed,
                elapsed,
            } => info!(
                target: "segbag::compression",
                original = %original.display(),
                compressed = %compressed.display(),
                elapsed_ms = elapsed.as_millis() as u64,
                "compressed segment"
            ),
            WriterEvent::SegmentCompressionFailed { path, error } => warn!(
                target: "segbag::compression",
                path = %path.display(),
                error = %error,
                "segment compression failed, keeping uncompressed segment"
            ),
            WriterEvent::RecordCompressionFailed { topic, error } => warn!(
                target: "segbag::compression",
                topic = %topic,
                error = %error,
                "payload compression failed, writing uncompressed"
            ),
            WriterEvent::SessionAborted { error } => {
                error!(target: "segbag::writer", error = %error, "session aborted");
            }
            WriterEvent::Closed {
                location,
                segments,
                message_count,
            } => info!(
                target: "segbag::writer",
                location = %location.display(),
                segments,
                message_count,
                "closed bag"
            ),
        }
    }
}
