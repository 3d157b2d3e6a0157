//! Per-request parameter store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key/value parameters of one request.
///
/// Populated from the query string when the request is built, then from path
/// captures when a route matches; hooks may add more before the handler runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamBag {
    items: BTreeMap<String, Value>,
}

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.items.get(key)
    }

    /// Returns the value under `key` if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.items.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.items.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.items.remove(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn all(&self) -> &BTreeMap<String, Value> {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ParamBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = Self::new();
        bag.extend(iter);
        bag
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for ParamBag {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bag_operations() {
        let mut bag = ParamBag::new();
        bag.set("id", "42");
        bag.set("page", 2);

        assert!(bag.has("id"));
        assert_eq!(bag.get_str("id"), Some("42"));
        assert_eq!(bag.get("page"), Some(&json!(2)));
        assert_eq!(bag.get_str("page"), None);

        assert_eq!(bag.remove("id"), Some(json!("42")));
        assert!(!bag.has("id"));
        assert_eq!(bag.len(), 1);
    }

    #[test]
    fn test_serializes_as_map() {
        let bag: ParamBag = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(serde_json::to_value(&bag).unwrap(), json!({"a": "1", "b": "2"}));
    }
}
