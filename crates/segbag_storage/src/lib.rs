//! # segbag storage
//!
//! Segment storage traits, the record model, and storage backends for segbag.
//!
//! A bag is written as a sequence of segments. Each segment is produced by a
//! [`SegmentStorage`] handle obtained from a [`StorageFactory`]. Backends own
//! their on-disk format; the writer in `segbag_core` only ever talks to them
//! through these traits.
//!
//! ## Available Backends
//!
//! - [`FileStorage`] (`"segfile"`) - Append-only framed segment files
//! - [`MemoryStorage`] (`"memory"`) - Segments held in a shared [`MemoryStore`]
//!
//! ## Example
//!
//! ```rust
//! use segbag_storage::{MemoryStorageFactory, SerializedRecord, StorageFactory, TopicMetadata};
//! use std::path::Path;
//!
//! let factory = MemoryStorageFactory::new();
//! let mut segment = factory.open_read_write(Path::new("bag/bag"), "memory").unwrap();
//! let topic = TopicMetadata::new("/chatter", "std_msgs/String", "cdr");
//! segment.create_topic(&topic).unwrap();
//! segment.write(&SerializedRecord::new("/chatter", vec![1, 2, 3], 42)).unwrap();
//! assert!(segment.current_size_bytes().unwrap() > 0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod frame;
mod memory;
mod plugins;
mod types;

pub use backend::{SegmentStorage, StorageFactory};
pub use error::{StorageError, StorageResult};
pub use file::{read_segment, FileStorage, FileStorageFactory, FILE_STORAGE_ID, SEGMENT_EXTENSION};
pub use frame::{compute_crc32, Frame, FRAME_OVERHEAD, SEGMENT_HEADER_SIZE, SEGMENT_MAGIC, SEGMENT_VERSION};
pub use memory::{MemorySegment, MemoryStorage, MemoryStorageFactory, MemoryStore, MEMORY_STORAGE_ID};
pub use plugins::StoragePlugins;
pub use types::{SerializedRecord, TopicMetadata};
