//! The per-request parameter store.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::params::infer::{group, scan};

/// Every inbound parameter of one request, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Params {
    values: Map<String, Value>,
}

impl Params {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a raw query string (without the leading `?`).
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::new();
        if let Some(query) = query {
            params.merge_encoded(query.as_bytes());
        }
        params
    }

    /// Merge `application/x-www-form-urlencoded` pairs through inference.
    pub(crate) fn merge_encoded(&mut self, encoded: &[u8]) {
        let pairs = url::form_urlencoded::parse(encoded)
            .map(|(key, value)| (key.into_owned(), value.into_owned()));
        self.merge_raw(group(pairs));
    }

    /// Merge grouped raw strings through inference, overwriting existing keys.
    pub(crate) fn merge_raw(&mut self, grouped: Vec<(String, Vec<String>)>) {
        for (key, raw) in grouped {
            if let Some(value) = scan(&raw) {
                self.values.insert(key, value);
            }
        }
    }

    /// Merge already-typed values, overwriting existing keys.
    pub(crate) fn merge_typed(&mut self, typed: Map<String, Value>) {
        for (key, value) in typed {
            self.values.insert(key, value);
        }
    }

    /// Add or overwrite a single key.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// The whole store.
    pub fn all(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Map<String, Value>> for Params {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_query_infers_and_groups() {
        let params = Params::from_query(Some("ids=[1,2,3]&name=Ann&tag=a&tag=b&tag=c"));
        assert_eq!(params.value("ids"), Some(&json!([1, 2, 3])));
        assert_eq!(params.value("name"), Some(&json!("Ann")));
        assert_eq!(params.value("tag"), Some(&json!(["a", "b", "c"])));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_from_query_decodes_percent_encoding() {
        let params = Params::from_query(Some("q=hello%20world&m=%7B%22a%22%3A1%7D"));
        assert_eq!(params.value("q"), Some(&json!("hello world")));
        assert_eq!(params.value("m"), Some(&json!({"a": 1})));
    }

    #[test]
    fn test_missing_query_is_empty() {
        assert!(Params::from_query(None).is_empty());
    }

    #[test]
    fn test_typed_merge_wins_over_query() {
        let mut params = Params::from_query(Some("id=1&keep=yes"));
        let body = json!({"id": 5});
        if let Value::Object(map) = body {
            params.merge_typed(map);
        }
        assert_eq!(params.value("id"), Some(&json!(5)));
        assert_eq!(params.value("keep"), Some(&json!("yes")));
    }

    #[test]
    fn test_append_overwrites_one_key() {
        let mut params = Params::from_query(Some("a=1"));
        params.append("a", "2");
        params.append("b", 3);
        assert_eq!(params.value("a"), Some(&json!("2")));
        assert_eq!(params.value("b"), Some(&json!(3)));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let params = Params::from_query(Some("x=1"));
        assert_eq!(serde_json::to_value(&params).unwrap(), json!({"x": "1"}));
    }
}
