//! Writer statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing what a writer has done since it was created.
///
/// All counters are atomic and survive across sessions; they are never
/// reset by `open` or `close`.
#[derive(Debug, Default)]
pub struct WriterStats {
    /// Records written to storage.
    messages_written: AtomicU64,
    /// Payload bytes written to storage, after conversion and compression.
    bytes_written: AtomicU64,
    /// Segment rotations.
    rotations: AtomicU64,
    /// Segments replaced by their compressed version.
    segments_compressed: AtomicU64,
    /// Segment or payload compressions that failed.
    compression_failures: AtomicU64,
    /// Sessions discarded by a fatal error.
    sessions_aborted: AtomicU64,
}

impl WriterStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_write(&self, bytes: u64) {
        self.messages_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_segment_compressed(&self) {
        self.segments_compressed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_compression_failure(&self) {
        self.compression_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_abort(&self) {
        self.sessions_aborted.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of records written.
    pub fn messages_written(&self) -> u64 {
        self.messages_written.load(Ordering::Relaxed)
    }

    /// Returns the number of payload bytes written.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Returns the number of rotations.
    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    /// Returns the number of compressed segments.
    pub fn segments_compressed(&self) -> u64 {
        self.segments_compressed.load(Ordering::Relaxed)
    }

    /// Returns the number of failed compressions.
    pub fn compression_failures(&self) -> u64 {
        self.compression_failures.load(Ordering::Relaxed)
    }

    /// Returns the number of aborted sessions.
    pub fn sessions_aborted(&self) -> u64 {
        self.sessions_aborted.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            messages_written: self.messages_written(),
            bytes_written: self.bytes_written(),
            rotations: self.rotations(),
            segments_compressed: self.segments_compressed(),
            compression_failures: self.compression_failures(),
            sessions_aborted: self.sessions_aborted(),
        }
    }
}

/// A point-in-time copy of [`WriterStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Records written.
    pub messages_written: u64,
    /// Payload bytes written.
    pub bytes_written: u64,
    /// Segment rotations.
    pub rotations: u64,
    /// Compressed segments.
    pub segments_compressed: u64,
    /// Failed compressions.
    pub compression_failures: u64,
    /// Aborted sessions.
    pub sessions_aborted: u64,
}
