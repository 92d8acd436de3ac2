//! CBOR and JSON payload conversion.

use super::Converter;
use crate::error::{ConversionError, ConversionResult};
use segbag_storage::SerializedRecord;
use std::collections::HashMap;

/// Format name of CBOR payloads.
pub(crate) const CBOR_FORMAT: &str = "cbor";
/// Format name of JSON payloads.
pub(crate) const JSON_FORMAT: &str = "json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    CborToJson,
    JsonToCbor,
}

/// Re-encodes self-describing payloads between CBOR and JSON.
///
/// Both formats carry their own structure, so the topic type is only
/// recorded, not interpreted.
#[derive(Debug, Clone)]
pub struct CborJsonConverter {
    direction: Direction,
    topics: HashMap<String, String>,
}

impl CborJsonConverter {
    /// Creates a converter from CBOR to JSON.
    #[must_use]
    pub fn cbor_to_json() -> Self {
        Self::with_direction(Direction::CborToJson)
    }

    /// Creates a converter from JSON to CBOR.
    #[must_use]
    pub fn json_to_cbor() -> Self {
        Self::with_direction(Direction::JsonToCbor)
    }

    fn with_direction(direction: Direction) -> Self {
        Self {
            direction,
            topics: HashMap::new(),
        }
    }

    /// Returns the message type registered for `topic_name`.
    #[must_use]
    pub fn topic_type(&self, topic_name: &str) -> Option<&str> {
        self.topics.get(topic_name).map(String::as_str)
    }
}

impl Converter for CborJsonConverter {
    fn register_topic(&mut self, topic_name: &str, topic_type: &str) -> ConversionResult<()> {
        self.topics
            .insert(topic_name.to_string(), topic_type.to_string());
        Ok(())
    }

    fn convert(&self, record: &SerializedRecord) -> ConversionResult<SerializedRecord> {
        if !self.topics.contains_key(&record.topic_name) {
            return Err(ConversionError::UnknownTopic(record.topic_name.clone()));
        }

        let payload = match self.direction {
            Direction::CborToJson => {
                let value: ciborium::Value = ciborium::from_reader(&record.payload[..])
                    .map_err(|e| ConversionError::Decode(e.to_string()))?;
                serde_json::to_vec(&value).map_err(|e| ConversionError::Encode(e.to_string()))?
            }
            Direction::JsonToCbor => {
                let value: serde_json::Value = serde_json::from_slice(&record.payload)
                    .map_err(|e| ConversionError::Decode(e.to_string()))?;
                let mut buf = Vec::new();
                ciborium::into_writer(&value, &mut buf)
                    .map_err(|e| ConversionError::Encode(e.to_string()))?;
                buf
            }
        };

        Ok(record.with_payload(payload))
    }
}
