//! Record model shared by every layer of the bag writer.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Description of a topic: a named, typed channel of records.
///
/// Topics are identified by `name`; two values with the same name describe
/// the same topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicMetadata {
    /// Topic name, e.g. `/chatter`.
    pub name: String,
    /// Message type carried on the topic.
    #[serde(rename = "type")]
    pub topic_type: String,
    /// Serialization format of the payloads, e.g. `cdr` or `cbor`.
    pub serialization_format: String,
}

impl TopicMetadata {
    /// Creates topic metadata.
    pub fn new(
        name: impl Into<String>,
        topic_type: impl Into<String>,
        serialization_format: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            topic_type: topic_type.into(),
            serialization_format: serialization_format.into(),
        }
    }
}

/// A timestamped, binary-serialized record on a topic.
///
/// The payload is immutable and cheaply cloneable. Conversion and
/// compression never touch a record in place; they produce a new one via
/// [`SerializedRecord::with_payload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedRecord {
    /// Name of the topic the record belongs to.
    pub topic_name: String,
    /// Serialized message bytes.
    pub payload: Bytes,
    /// Receive time in nanoseconds since the epoch.
    pub timestamp: i64,
}

impl SerializedRecord {
    /// Creates a record.
    pub fn new(topic_name: impl Into<String>, payload: impl Into<Bytes>, timestamp: i64) -> Self {
        Self {
            topic_name: topic_name.into(),
            payload: payload.into(),
            timestamp,
        }
    }

    /// Returns a new record with the same topic and timestamp and a replaced payload.
    #[must_use]
    pub fn with_payload(&self, payload: impl Into<Bytes>) -> Self {
        Self {
            topic_name: self.topic_name.clone(),
            payload: payload.into(),
            timestamp: self.timestamp,
        }
    }

    /// Returns the payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns true if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
