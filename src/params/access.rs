//! Typed, read-only access to a parameter store.
//!
//! # Coercion rules
//! - Numbers are cast; floats truncate toward zero and negative values
//!   saturate to zero for unsigned targets
//! - Strings are parsed (integers strictly, floats as `f64`)
//! - Booleans map to 1 and 0
//! - Arrays, objects, null and unparseable strings give no value
//!
//! Lenient getters turn "no value" into zero or `false`. The `try_*` getters
//! return `None` instead, for callers that must tell an absent key from a
//! present zero.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};

use crate::http::error::RequestError;
use crate::params::store::Params;

/// Read access shared by [`Params`] and everything that wraps one.
///
/// Implementors only provide [`ParamAccess::params`]; every getter is derived
/// from it.
pub trait ParamAccess {
    fn params(&self) -> &Params;

    /// String form of a value. Strings come back verbatim, other values as
    /// compact JSON, absent or null keys as `""`.
    fn get(&self, key: &str) -> String {
        match self.params().value(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        }
    }

    fn try_u64(&self, key: &str) -> Option<u64> {
        self.params().value(key).and_then(to_u64)
    }

    fn get_u64(&self, key: &str) -> u64 {
        self.try_u64(key).unwrap_or_default()
    }

    fn get_u32(&self, key: &str) -> u32 {
        self.get_u64(key) as u32
    }

    fn get_usize(&self, key: &str) -> usize {
        self.get_u64(key) as usize
    }

    fn try_i64(&self, key: &str) -> Option<i64> {
        self.params().value(key).and_then(to_i64)
    }

    fn get_i64(&self, key: &str) -> i64 {
        self.try_i64(key).unwrap_or_default()
    }

    fn get_i32(&self, key: &str) -> i32 {
        self.get_i64(key) as i32
    }

    fn get_isize(&self, key: &str) -> isize {
        self.get_i64(key) as isize
    }

    fn try_f64(&self, key: &str) -> Option<f64> {
        self.params().value(key).and_then(to_f64)
    }

    fn get_f64(&self, key: &str) -> f64 {
        self.try_f64(key).unwrap_or_default()
    }

    fn get_f32(&self, key: &str) -> f32 {
        self.get_f64(key) as f32
    }

    /// `true` for a `true` boolean, a positive number, or a string that is
    /// `"true"` or parses to a positive number.
    fn try_bool(&self, key: &str) -> Option<bool> {
        self.params().value(key).and_then(to_bool)
    }

    fn get_bool(&self, key: &str) -> bool {
        self.try_bool(key).unwrap_or_default()
    }

    /// Parse an RFC 3339 timestamp such as `2023-01-02T15:04:05+07:00`.
    fn get_time(&self, key: &str) -> Result<DateTime<FixedOffset>, RequestError> {
        let value = match self.params().value(key) {
            None | Some(Value::Null) => return Err(RequestError::MissingTime),
            Some(value) => value,
        };
        let raw = value.as_str().ok_or(RequestError::InvalidTime)?;
        DateTime::parse_from_rfc3339(raw).map_err(|_| RequestError::InvalidTime)
    }

    fn get_time_opt(&self, key: &str) -> Option<DateTime<FixedOffset>> {
        self.get_time(key).ok()
    }

    fn get_array(&self, key: &str) -> Option<&[Value]> {
        self.params()
            .value(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
    }

    /// The array under `key` with repeated elements removed, first
    /// occurrence kept.
    fn get_array_unique(&self, key: &str) -> Option<Vec<Value>> {
        let items = self.get_array(key)?;
        let mut seen = HashSet::new();
        Some(
            items
                .iter()
                .filter(|item| seen.insert(item.to_string()))
                .cloned()
                .collect(),
        )
    }

    fn get_map(&self, key: &str) -> Option<&Map<String, Value>> {
        self.params().value(key).and_then(Value::as_object)
    }

    /// Serialized JSON of the value; `null` when the key is absent.
    fn get_json(&self, key: &str) -> Vec<u8> {
        serde_json::to_vec(self.params().value(key).unwrap_or(&Value::Null)).unwrap_or_default()
    }

    /// Every key exists.
    fn has(&self, keys: &[&str]) -> bool {
        keys.iter().all(|key| self.params().value(key).is_some())
    }

    /// Every key exists, is not null, and strings are not blank and lists
    /// not empty.
    fn filled(&self, keys: &[&str]) -> bool {
        keys.iter().all(|key| match self.params().value(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(text)) => !text.trim().is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        })
    }
}

impl ParamAccess for Params {
    fn params(&self) -> &Params {
        self
    }
}

fn to_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().map(|float| float as u64)),
        Value::String(text) => text.trim().parse().ok(),
        Value::Bool(flag) => Some(u64::from(*flag)),
        _ => None,
    }
}

fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float as i64)),
        Value::String(text) => text.trim().parse().ok(),
        Value::Bool(flag) => Some(i64::from(*flag)),
        _ => None,
    }
}

fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => text
            .trim()
            .parse::<bool>()
            .ok()
            .or_else(|| to_f64(value).map(|float| float > 0.0)),
        other => to_f64(other).map(|float| float > 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => Params::from(map),
            _ => Params::new(),
        }
    }

    #[test]
    fn test_get_string_forms() {
        let p = params(json!({"s": "Ann", "n": 5, "a": [1, 2], "z": null}));
        assert_eq!(p.get("s"), "Ann");
        assert_eq!(p.get("n"), "5");
        assert_eq!(p.get("a"), "[1,2]");
        assert_eq!(p.get("z"), "");
        assert_eq!(p.get("missing"), "");
    }

    #[test]
    fn test_integer_coercion() {
        let p = params(json!({
            "num": 5,
            "float": 7.9,
            "neg": -3,
            "text": " 42 ",
            "bad": "4x",
            "decimal_text": "5.5",
            "yes": true,
            "no": false,
            "list": [1]
        }));
        assert_eq!(p.get_i64("num"), 5);
        assert_eq!(p.get_i64("float"), 7);
        assert_eq!(p.get_i64("neg"), -3);
        assert_eq!(p.get_u64("neg"), 0);
        assert_eq!(p.get_i64("text"), 42);
        assert_eq!(p.get_u32("text"), 42);
        assert_eq!(p.get_i64("bad"), 0);
        assert_eq!(p.get_i64("decimal_text"), 0);
        assert_eq!(p.get_i64("yes"), 1);
        assert_eq!(p.get_usize("no"), 0);
        assert_eq!(p.get_i32("list"), 0);
        assert_eq!(p.get_isize("missing"), 0);
    }

    #[test]
    fn test_try_getters_distinguish_absent_from_zero() {
        let p = params(json!({"zero": 0, "bad": "abc"}));
        assert_eq!(p.try_i64("zero"), Some(0));
        assert_eq!(p.try_i64("missing"), None);
        assert_eq!(p.try_u64("bad"), None);
        assert_eq!(p.try_f64("zero"), Some(0.0));
        assert_eq!(p.try_bool("missing"), None);
    }

    #[test]
    fn test_float_coercion() {
        let p = params(json!({"f": 1.5, "s": "2.25", "b": true}));
        assert_eq!(p.get_f64("f"), 1.5);
        assert_eq!(p.get_f32("s"), 2.25);
        assert_eq!(p.get_f64("b"), 1.0);
        assert_eq!(p.get_f64("missing"), 0.0);
    }

    #[test]
    fn test_bool_coercion() {
        let p = params(json!({
            "t": true,
            "one": 1,
            "zero": 0,
            "positive_text": "0.5",
            "word": "true",
            "garbage": "yes"
        }));
        assert!(p.get_bool("t"));
        assert!(p.get_bool("one"));
        assert!(!p.get_bool("zero"));
        assert!(p.get_bool("positive_text"));
        assert!(p.get_bool("word"));
        assert!(!p.get_bool("garbage"));
        assert!(!p.get_bool("missing"));
    }

    #[test]
    fn test_get_time() {
        let p = params(json!({
            "at": "2023-01-02T15:04:05+07:00",
            "utc": "2023-01-02T15:04:05Z",
            "bad": "02/01/2023",
            "num": 12
        }));
        let at = p.get_time("at").unwrap();
        assert_eq!(at.offset().local_minus_utc(), 7 * 3600);
        assert!(p.get_time("utc").is_ok());
        assert!(matches!(p.get_time("bad"), Err(RequestError::InvalidTime)));
        assert!(matches!(p.get_time("num"), Err(RequestError::InvalidTime)));
        assert!(matches!(p.get_time("missing"), Err(RequestError::MissingTime)));
        assert!(p.get_time_opt("bad").is_none());
        assert!(p.get_time_opt("utc").is_some());
    }

    #[test]
    fn test_get_time_messages() {
        let p = Params::new();
        assert_eq!(p.get_time("x").unwrap_err().to_string(), "no time specified");
        let p = params(json!({"x": "yesterday"}));
        assert_eq!(
            p.get_time("x").unwrap_err().to_string(),
            "use RFC3339 format string for datetime"
        );
    }

    #[test]
    fn test_collections() {
        let p = params(json!({
            "ids": [1, 2, 2, "2", 1, 3],
            "map": {"obj": {"id": [9]}},
            "text": "x"
        }));
        assert_eq!(p.get_array("ids").map(<[Value]>::len), Some(6));
        assert_eq!(
            p.get_array_unique("ids"),
            Some(vec![json!(1), json!(2), json!("2"), json!(3)])
        );
        assert!(p.get_array("text").is_none());
        assert_eq!(p.get_map("map").and_then(|m| m.get("obj")), Some(&json!({"id": [9]})));
        assert!(p.get_map("ids").is_none());
    }

    #[test]
    fn test_get_json() {
        let p = params(json!({"m": {"a": [1]}}));
        assert_eq!(p.get_json("m"), br#"{"a":[1]}"#.to_vec());
        assert_eq!(p.get_json("missing"), b"null".to_vec());
    }

    #[test]
    fn test_has_and_filled() {
        let p = params(json!({
            "blank": "   ",
            "name": "Ann",
            "empty": [],
            "list": [0],
            "nothing": null,
            "zero": 0
        }));
        assert!(p.has(&["blank", "name", "empty", "nothing"]));
        assert!(!p.has(&["name", "missing"]));
        assert!(!p.filled(&["blank"]));
        assert!(p.filled(&["name", "list", "zero"]));
        assert!(!p.filled(&["empty"]));
        assert!(!p.filled(&["nothing"]));
        assert!(p.has(&[]));
        assert!(p.filled(&[]));
    }
}
