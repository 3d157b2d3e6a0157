//! Case-insensitive header map.

use std::collections::BTreeMap;

/// Header names are normalized to `Title-Case`, so `content-type`,
/// `CONTENT-TYPE` and `Content-Type` address the same entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    items: BTreeMap<String, String>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.items.get(&normalize(key)).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.items.insert(normalize(key), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.items.remove(&normalize(key))
    }

    pub fn has(&self, key: &str) -> bool {
        self.items.contains_key(&normalize(key))
    }

    pub fn all(&self) -> &BTreeMap<String, String> {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// `x-request-id` → `X-Request-Id`.
fn normalize(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = true;
    for c in key.chars() {
        if upper {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        upper = !c.is_alphanumeric();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_keys() {
        let mut header = Header::new();
        header.set("content-TYPE", "application/json");

        assert_eq!(header.get("Content-Type"), Some("application/json"));
        assert!(header.has("CONTENT-TYPE"));
        assert_eq!(header.all().keys().next().map(String::as_str), Some("Content-Type"));

        header.set("content-type", "text/plain");
        assert_eq!(header.len(), 1);
        assert_eq!(header.remove("Content-type").as_deref(), Some("text/plain"));
        assert!(header.is_empty());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("x-request-id"), "X-Request-Id");
        assert_eq!(normalize("ETAG"), "Etag");
    }
}
