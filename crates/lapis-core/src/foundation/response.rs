//! Outbound response state.

use serde_json::Value;

use super::header::Header;
use crate::codes::{CONTENT_CHARSET_DEFAULT, CONTENT_TYPE_DEFAULT};

/// What a response carries before it is encoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// A structured value. Strings are written as-is; anything else goes
    /// through the codec for the response content type.
    Value(Value),
    /// Raw bytes, written as-is.
    Bytes(Vec<u8>),
}

impl Content {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Bytes(_) => None,
        }
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Value(Value::String(text))
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Value(Value::String(text.to_string()))
    }
}

/// Status, headers and content of the response under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: u16,
    message: Option<String>,
    headers: Header,
    content: Option<Content>,
    content_type: String,
    charset: String,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            message: None,
            headers: Header::new(),
            content: None,
            content_type: CONTENT_TYPE_DEFAULT.to_string(),
            charset: CONTENT_CHARSET_DEFAULT.to_string(),
        }
    }
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn headers(&self) -> &Header {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Header {
        &mut self.headers
    }

    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    pub fn set_content(&mut self, content: impl Into<Content>) {
        self.content = Some(content.into());
    }

    pub fn take_content(&mut self) -> Option<Content> {
        self.content.take()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = content_type.into();
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    pub fn set_charset(&mut self, charset: impl Into<String>) {
        self.charset = charset.into();
    }

    /// The `Content-Type` header value, e.g. `application/json; charset=utf-8`.
    pub fn content_type_header(&self) -> String {
        if self.charset.is_empty() {
            self.content_type.clone()
        } else {
            format!("{}; charset={}", self.content_type, self.charset)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let response = Response::new();
        assert_eq!(response.status(), 200);
        assert!(!response.has_content());
        assert_eq!(
            response.content_type_header(),
            "application/json; charset=utf-8"
        );
    }

    #[test]
    fn test_content_conversions() {
        let mut response = Response::new();
        response.set_content("plain");
        assert_eq!(response.content(), Some(&Content::Value(json!("plain"))));
        response.set_content(vec![1_u8, 2]);
        assert_eq!(response.take_content(), Some(Content::Bytes(vec![1, 2])));
        assert!(!response.has_content());
    }
}
