//! Body codecs keyed by content type.
//!
//! A [`Codec`] turns a [`serde_json::Value`] into bytes and back for one
//! media type. The [`CodecRegistry`] picks a codec from a `Content-Type`
//! value, ignoring parameters such as `charset`.

mod json;
mod text;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

pub use json::JsonCodec;
pub use text::TextCodec;

use crate::error::{CodecError, CodecResult};

/// Encodes and decodes bodies of one media type.
pub trait Codec: Send + Sync {
    /// The bare media type handled by this codec, e.g. `application/json`.
    fn content_type(&self) -> &'static str;

    /// Encodes `value` into bytes.
    fn encode(&self, value: &Value) -> CodecResult<Vec<u8>>;

    /// Decodes `bytes` into a value.
    fn decode(&self, bytes: &[u8]) -> CodecResult<Value>;
}

/// Returns the bare, lower-cased media type of a `Content-Type` value.
///
/// ```
/// assert_eq!(
///     lapis_core::codec::media_type("Application/JSON; charset=utf-8"),
///     "application/json"
/// );
/// ```
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Codecs indexed by media type.
#[derive(Clone)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl CodecRegistry {
    /// Creates a registry without any codec.
    pub fn empty() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Creates a registry with [`JsonCodec`] and [`TextCodec`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(JsonCodec);
        registry.register(TextCodec);
        registry
    }

    /// Registers `codec`, replacing any codec for the same media type.
    pub fn register<C: Codec + 'static>(&mut self, codec: C) {
        self.codecs
            .insert(codec.content_type().to_string(), Arc::new(codec));
    }

    /// Looks up the codec for a `Content-Type` value.
    pub fn get(&self, content_type: &str) -> Option<Arc<dyn Codec>> {
        self.codecs.get(&media_type(content_type)).cloned()
    }

    pub fn contains(&self, content_type: &str) -> bool {
        self.codecs.contains_key(&media_type(content_type))
    }

    /// Encodes `value` with the codec for `content_type`.
    pub fn encode(&self, content_type: &str, value: &Value) -> CodecResult<Vec<u8>> {
        self.require(content_type)?.encode(value)
    }

    /// Decodes `bytes` with the codec for `content_type`.
    pub fn decode(&self, content_type: &str, bytes: &[u8]) -> CodecResult<Value> {
        self.require(content_type)?.decode(bytes)
    }

    fn require(&self, content_type: &str) -> CodecResult<Arc<dyn Codec>> {
        self.get(content_type)
            .ok_or_else(|| CodecError::NotFound(content_type.to_string()))
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.codecs.keys().collect();
        types.sort();
        f.debug_struct("CodecRegistry")
            .field("content_types", &types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_ignores_parameters() {
        let registry = CodecRegistry::with_defaults();
        assert!(registry.contains("application/json; charset=utf-8"));
        assert!(registry.contains("TEXT/PLAIN"));
        assert!(!registry.contains("application/xml"));
    }

    #[test]
    fn test_missing_codec() {
        let registry = CodecRegistry::empty();
        let err = registry.encode("application/json", &json!({})).unwrap_err();
        assert_eq!(err, CodecError::NotFound("application/json".into()));
    }
}
