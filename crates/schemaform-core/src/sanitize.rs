//! Pre-validation value cleanup.
//!
//! The structural validator never sees the raw derived document. Untouched
//! optional fields hold `null` and cleared text inputs hold `""`; both would
//! trip type and format constraints the user never violated. Stripping them
//! (and any object or array left empty afterwards) turns "untouched" into
//! "absent", so only `required` fires for missing input.

use serde_json::{Map, Value};

/// Remove `null` values and empty strings, then any object or array left
/// empty, working bottom-up. The root value itself is never dropped.
pub fn strip_null_and_empty(value: &Value) -> Value {
    match value {
        Value::Object(obj) => Value::Object(strip_object(obj)),
        Value::Array(items) => Value::Array(strip_array(items)),
        other => other.clone(),
    }
}

fn strip_object(obj: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in obj {
        if let Some(kept) = strip_entry(value) {
            out.insert(key.clone(), kept);
        }
    }
    out
}

fn strip_array(items: &[Value]) -> Vec<Value> {
    items.iter().filter_map(strip_entry).collect()
}

fn strip_entry(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Object(obj) => {
            let stripped = strip_object(obj);
            (!stripped.is_empty()).then_some(Value::Object(stripped))
        }
        Value::Array(items) => {
            let stripped = strip_array(items);
            (!stripped.is_empty()).then_some(Value::Array(stripped))
        }
        other => Some(other.clone()),
    }
}
