use serde_json::Value;

use super::Codec;
use crate::codes::CONTENT_TYPE_TEXT;
use crate::error::{CodecError, CodecResult};

/// `text/plain` codec. Only string values can be encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Codec for TextCodec {
    fn content_type(&self) -> &'static str {
        CONTENT_TYPE_TEXT
    }

    fn encode(&self, value: &Value) -> CodecResult<Vec<u8>> {
        match value {
            Value::String(s) => Ok(s.as_bytes().to_vec()),
            other => Err(CodecError::invalid(
                CONTENT_TYPE_TEXT,
                format!("expected a string, got {other}"),
            )),
        }
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<Value> {
        String::from_utf8(bytes.to_vec())
            .map(Value::String)
            .map_err(|e| CodecError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_strings_encode() {
        assert_eq!(TextCodec.encode(&json!("hi")).unwrap(), b"hi");
        let err = TextCodec.encode(&json!({"a": 1})).unwrap_err();
        assert!(matches!(err, CodecError::InvalidContent { .. }));
    }

    #[test]
    fn test_decode_utf8() {
        assert_eq!(TextCodec.decode("héllo".as_bytes()).unwrap(), json!("héllo"));
        assert!(TextCodec.decode(&[0xff, 0xfe]).is_err());
    }
}
