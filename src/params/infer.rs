//! Value-type inference for raw string parameters.
//!
//! Query strings, url-encoded forms and multipart fields only carry text. A
//! value that parses as a JSON array or object is stored as that structure;
//! anything else stays a plain string.

use std::collections::HashMap;

use serde_json::{Map, Value};

/// Infer the stored shape of a single raw value.
///
/// Arrays are tried before objects. Scalars such as `5`, `true` or `null`
/// are left as strings; the lenient getters convert them on read.
pub fn identify(raw: &str) -> Value {
    if let Ok(items) = serde_json::from_str::<Vec<Value>>(raw) {
        return Value::Array(items);
    }
    if let Ok(object) = serde_json::from_str::<Map<String, Value>>(raw) {
        return Value::Object(object);
    }
    Value::String(raw.to_string())
}

/// Collapse all raw values submitted under one key.
///
/// One value is stored unwrapped, several become an ordered list, none
/// produces no entry at all.
pub fn scan<S: AsRef<str>>(raw: &[S]) -> Option<Value> {
    match raw {
        [] => None,
        [single] => Some(identify(single.as_ref())),
        many => Some(Value::Array(
            many.iter().map(|value| identify(value.as_ref())).collect(),
        )),
    }
}

/// Group decoded pairs by key.
///
/// Keys keep the order of their first appearance and values keep
/// submission order.
pub fn group<T>(pairs: impl IntoIterator<Item = (String, T)>) -> Vec<(String, Vec<T>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut grouped: Vec<(String, Vec<T>)> = Vec::new();

    for (key, value) in pairs {
        match index.get(&key) {
            Some(&slot) => grouped[slot].1.push(value),
            None => {
                index.insert(key.clone(), grouped.len());
                grouped.push((key, vec![value]));
            }
        }
    }

    grouped
}
