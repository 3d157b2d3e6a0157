use serde_json::Value;

use super::Codec;
use crate::codes::CONTENT_TYPE_JSON;
use crate::error::{CodecError, CodecResult};

/// `application/json` codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        CONTENT_TYPE_JSON
    }

    fn encode(&self, value: &Value) -> CodecResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<Value> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_object() {
        let bytes = JsonCodec.encode(&json!({"id": "42"})).unwrap();
        assert_eq!(bytes, br#"{"id":"42"}"#);
    }

    #[test]
    fn test_decode_malformed() {
        let err = JsonCodec.decode(b"{not json").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }
}
