//! Serialization format conversion.
//!
//! A converter translates record payloads from the format they are
//! produced in to the format they should be stored in. The writer only
//! builds one when the two formats differ.

mod cbor_json;
mod plugins;

pub use cbor_json::CborJsonConverter;
pub use plugins::ConverterPlugins;

use crate::error::ConversionResult;
use segbag_storage::SerializedRecord;

/// Translates record payloads between two serialization formats.
pub trait Converter: Send {
    /// Makes the converter aware of a topic and its message type.
    ///
    /// # Errors
    ///
    /// Returns an error if the type cannot be handled.
    fn register_topic(&mut self, topic_name: &str, topic_type: &str) -> ConversionResult<()>;

    /// Returns a copy of `record` with its payload in the output format.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic was never registered or the payload
    /// cannot be decoded or re-encoded.
    fn convert(&self, record: &SerializedRecord) -> ConversionResult<SerializedRecord>;
}

/// Builds converters for pairs of serialization formats.
pub trait ConverterFactory: Send + Sync {
    /// Returns a converter from `input` to `output`, or `None` if the pair
    /// is not supported.
    fn create_converter(&self, input: &str, output: &str) -> Option<Box<dyn Converter>>;
}
