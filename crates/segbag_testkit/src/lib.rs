//! # segbag testkit
//!
//! Test utilities for segbag.
//!
//! This crate provides:
//! - Fixtures for temporary bags
//! - Fakes for every writer collaborator (storage, compression,
//!   conversion, events, catalog persistence)
//! - Property-based test generators using proptest
//! - Cross-crate integration scenarios
//!
//! ## Usage
//!
//! ```rust
//! use segbag_testkit::prelude::*;
//!
//! let mut bag = TestBag::memory();
//! bag.open_default().unwrap();
//! bag.writer.create_topic(&topic("/chatter")).unwrap();
//! bag.writer.write(record("/chatter", 64, 1)).unwrap();
//! let catalog = bag.writer.close().unwrap().unwrap();
//! assert_eq!(catalog.message_count, 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fakes;
pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fakes::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fakes::*;
pub use fixtures::*;
pub use generators::*;
