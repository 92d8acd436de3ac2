//! Registry of converter plugins keyed by format pair.

use super::cbor_json::{CborJsonConverter, CBOR_FORMAT, JSON_FORMAT};
use super::{Converter, ConverterFactory};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type ConverterConstructor = Arc<dyn Fn() -> Box<dyn Converter> + Send + Sync>;

/// Maps `(input, output)` format pairs to converter constructors.
#[derive(Clone, Default)]
pub struct ConverterPlugins {
    converters: HashMap<(String, String), ConverterConstructor>,
}

impl ConverterPlugins {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with CBOR to JSON and JSON to CBOR.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new()
            .register(CBOR_FORMAT, JSON_FORMAT, || {
                Box::new(CborJsonConverter::cbor_to_json())
            })
            .register(JSON_FORMAT, CBOR_FORMAT, || {
                Box::new(CborJsonConverter::json_to_cbor())
            })
    }

    /// Registers a converter constructor for `input` to `output`.
    #[must_use]
    pub fn register<F>(mut self, input: impl Into<String>, output: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Box<dyn Converter> + Send + Sync + 'static,
    {
        self.converters
            .insert((input.into(), output.into()), Arc::new(constructor));
        self
    }
}

impl ConverterFactory for ConverterPlugins {
    fn create_converter(&self, input: &str, output: &str) -> Option<Box<dyn Converter>> {
        let constructor = self
            .converters
            .get(&(input.to_string(), output.to_string()));
        if constructor.is_none() {
            tracing::error!(target: "segbag::converter", input, output, "no converter for format pair");
        }
        constructor.map(|constructor| constructor())
    }
}

impl fmt::Debug for ConverterPlugins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs: Vec<_> = self.converters.keys().collect();
        pairs.sort();
        f.debug_struct("ConverterPlugins")
            .field("converters", &pairs)
            .finish()
    }
}
