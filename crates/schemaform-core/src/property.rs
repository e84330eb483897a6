//! Schema fragment introspection.
//!
//! Small pure helpers shared by the resolver and the tree builder. They all
//! read a normalized schema fragment (no `$ref`, no `allOf`) and never touch
//! data values.

use serde_json::{Map, Value};

use crate::version::SchemaVersion;

/// The declared `type` keyword, if it is a string.
pub fn schema_type(schema: &Value) -> Option<&str> {
    schema.get("type").and_then(Value::as_str)
}

/// A schema describes a tuple when `minItems` and `maxItems` are both
/// numeric and equal. Homogeneous arrays never set both to the same value.
pub fn is_tuple(schema: &Value) -> bool {
    let min = schema.get("minItems").and_then(Value::as_u64);
    let max = schema.get("maxItems").and_then(Value::as_u64);
    matches!((min, max), (Some(min), Some(max)) if min == max)
}

/// Fixed position count of a tuple schema.
pub fn tuple_size(schema: &Value) -> usize {
    schema
        .get("minItems")
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize
}

/// Effective lower bound for a numeric schema. `exclusiveMinimum` is
/// tightened by one, matching the integer-oriented forms this engine serves.
pub fn get_min(schema: &Value) -> Option<f64> {
    if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
        return Some(min);
    }
    schema
        .get("exclusiveMinimum")
        .and_then(Value::as_f64)
        .map(|m| m + 1.0)
}

/// Effective upper bound for a numeric schema, see [`get_min`].
pub fn get_max(schema: &Value) -> Option<f64> {
    if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
        return Some(max);
    }
    schema
        .get("exclusiveMaximum")
        .and_then(Value::as_f64)
        .map(|m| m - 1.0)
}

/// Declared properties of an object schema, in declaration order.
pub fn object_properties(schema: &Value) -> Option<&Map<String, Value>> {
    schema.get("properties").and_then(Value::as_object)
}

/// The schema for user-added object properties. `additionalProperties: true`
/// yields the empty (accept-anything) schema; `false` or absent yields none.
pub fn additional_properties_schema(schema: &Value) -> Option<Value> {
    match schema.get("additionalProperties") {
        Some(Value::Bool(true)) => Some(Value::Object(Map::new())),
        Some(Value::Object(obj)) => Some(Value::Object(obj.clone())),
        _ => None,
    }
}

/// Whether `key` appears in the schema's `required` list.
pub fn is_required_key(schema: &Value, key: &str) -> bool {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().any(|k| k.as_str() == Some(key)))
        .unwrap_or(false)
}

/// A child of an object node is removable when the object schema does not
/// declare it, i.e. it came in through `additionalProperties` or as an
/// unexpected key in the data.
pub fn is_removable_child(schema: &Value, key: &str) -> bool {
    object_properties(schema)
        .map(|props| !props.contains_key(key))
        .unwrap_or(true)
}

/// The homogeneous item schema of a (non-tuple) array.
pub fn array_item_schema(schema: &Value) -> Value {
    schema
        .get("items")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// The per-position schema of a tuple position.
///
/// Tuples spell their positional schemas under `items` (v1) or `prefixItems`
/// (v2). When the keyword holds an array, positions map by index (out of
/// range positions get no schema); a single schema object applies to every
/// position.
pub fn tuple_item_schema<'a>(
    schema: &'a Value,
    version: SchemaVersion,
    index: usize,
) -> Option<&'a Value> {
    let keyword = match version {
        SchemaVersion::PydanticV1 => "items",
        SchemaVersion::PydanticV2 => "prefixItems",
    };
    match schema.get(keyword) {
        Some(Value::Array(positions)) => positions.get(index),
        Some(single) => Some(single),
        None => None,
    }
}

/// Unwrap the nullable-union idiom: an `anyOf` of exactly two branches where
/// the second is `{"type": "null"}` is the first branch minus nullability.
/// The wrapper's `title`, `description` and `default` carry over to the
/// unwrapped schema where it does not set its own.
pub fn unwrap_nullable_any_of(schema: &Value) -> Option<Value> {
    let branches = schema.get("anyOf").and_then(Value::as_array)?;
    if branches.len() != 2 {
        return None;
    }
    if branches[1].get("type").and_then(Value::as_str) != Some("null") {
        return None;
    }
    let mut unwrapped = branches[0].clone();
    if let Some(obj) = unwrapped.as_object_mut() {
        for keyword in ["title", "description", "default"] {
            if !obj.contains_key(keyword) {
                if let Some(inherited) = schema.get(keyword) {
                    obj.insert(keyword.to_string(), inherited.clone());
                }
            }
        }
    }
    Some(unwrapped)
}
