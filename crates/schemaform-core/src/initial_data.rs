//! Initial value resolution.
//!
//! Given a normalized schema fragment and an optional raw value, compute the
//! effective starting value for the form node that will mirror it. This is
//! where defaults are applied, required arrays are padded up to `minItems`,
//! tuples are filled position by position, and data that does not fit the
//! schema is passed through untouched so the tree builder can surface it as
//! an invalid or unexpected node instead of dropping it.
//!
//! Resolution never fails: any raw value, however malformed, produces some
//! value.

use serde_json::{Map, Value};

use crate::property;
use crate::version::SchemaVersion;

/// Resolve the whole-document value a form is loaded with.
///
/// Defaults are applied only when the caller supplied no meaningful initial
/// value (absent, null, or an empty object). Loading a previously saved
/// document must reproduce it as-is, without re-injecting defaults into
/// fields the user cleared.
pub fn resolve_document_value(
    schema: &Value,
    version: SchemaVersion,
    initial: Option<&Value>,
) -> Value {
    let use_defaults = match initial {
        None | Some(Value::Null) => true,
        Some(Value::Object(obj)) => obj.is_empty(),
        Some(_) => false,
    };
    resolve_property_value(schema, version, true, initial, use_defaults)
}

/// Resolve the starting value for a single schema node.
///
/// The rules apply in order: declared `default` (once, not recursively),
/// nullable-`anyOf` unwrap, `oneOf` branch steering, `const`, then the
/// declared type.
pub fn resolve_property_value(
    schema: &Value,
    version: SchemaVersion,
    required: bool,
    raw: Option<&Value>,
    use_defaults: bool,
) -> Value {
    if use_defaults {
        if let Some(default) = schema.get("default") {
            return resolve_property_value(schema, version, required, Some(default), false);
        }
    }

    if let Some(unwrapped) = property::unwrap_nullable_any_of(schema) {
        return resolve_property_value(&unwrapped, version, required, raw, use_defaults);
    }

    if let Some(branches) = schema.get("oneOf").and_then(Value::as_array) {
        return resolve_one_of(schema, branches, version, required, raw, use_defaults);
    }

    if let Some(constant) = schema.get("const") {
        return constant.clone();
    }

    match property::schema_type(schema) {
        Some("object") => resolve_object(schema, version, raw, use_defaults),
        Some("array") if property::is_tuple(schema) => {
            resolve_tuple(schema, version, required, raw, use_defaults)
        }
        Some("array") => resolve_array(schema, version, required, raw, use_defaults),
        Some(_) => raw.cloned().unwrap_or(Value::Null),
        None => Value::Null,
    }
}

/// Steer into the branch named by the raw value's discriminator, when one
/// matches the rewritten mapping. A raw value whose discriminator matches no
/// branch passes through unchanged for later user correction.
fn resolve_one_of(
    schema: &Value,
    branches: &[Value],
    version: SchemaVersion,
    required: bool,
    raw: Option<&Value>,
    use_defaults: bool,
) -> Value {
    if let Some(raw) = raw {
        if let Some(index) = discriminated_branch(schema, raw) {
            if let Some(branch) = branches.get(index) {
                return resolve_property_value(branch, version, required, Some(raw), use_defaults);
            }
        }
        return raw.clone();
    }
    match branches.first() {
        Some(branch) => resolve_property_value(branch, version, required, None, use_defaults),
        None => Value::Null,
    }
}

/// Look up the raw value's discriminator label in the (index-rewritten)
/// mapping.
fn discriminated_branch(schema: &Value, raw: &Value) -> Option<usize> {
    let discriminator = schema.get("discriminator")?;
    let property_name = discriminator.get("propertyName")?.as_str()?;
    let label = raw.get(property_name)?.as_str()?;
    discriminator
        .get("mapping")?
        .get(label)?
        .as_u64()
        .map(|i| i as usize)
}

fn resolve_object(
    schema: &Value,
    version: SchemaVersion,
    raw: Option<&Value>,
    use_defaults: bool,
) -> Value {
    let raw_obj = match raw {
        Some(Value::Object(obj)) => Some(obj),
        None | Some(Value::Null) => None,
        // Shape mismatch, preserved for the builder to flag.
        Some(other) => return other.clone(),
    };

    let mut out = Map::new();
    if let Some(props) = property::object_properties(schema) {
        for (key, child_schema) in props {
            let child_raw = raw_obj.and_then(|o| o.get(key));
            out.insert(
                key.clone(),
                resolve_property_value(
                    child_schema,
                    version,
                    property::is_required_key(schema, key),
                    child_raw,
                    use_defaults,
                ),
            );
        }
    }
    // Extra keys are copied through verbatim, even under
    // additionalProperties: false, so nothing the user stored is lost.
    if let Some(raw_obj) = raw_obj {
        for (key, value) in raw_obj {
            if !out.contains_key(key) {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(out)
}

fn resolve_array(
    schema: &Value,
    version: SchemaVersion,
    required: bool,
    raw: Option<&Value>,
    use_defaults: bool,
) -> Value {
    let raw_items: &[Value] = match raw {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => &[],
        Some(other) => return other.clone(),
    };

    let item_schema = property::array_item_schema(schema);
    let mut out: Vec<Value> = raw_items
        .iter()
        .map(|item| resolve_property_value(&item_schema, version, required, Some(item), use_defaults))
        .collect();

    if required {
        let min_items = schema.get("minItems").and_then(Value::as_u64).unwrap_or(0) as usize;
        while out.len() < min_items {
            out.push(resolve_property_value(
                &item_schema,
                version,
                required,
                None,
                use_defaults,
            ));
        }
    }
    Value::Array(out)
}

fn resolve_tuple(
    schema: &Value,
    version: SchemaVersion,
    required: bool,
    raw: Option<&Value>,
    use_defaults: bool,
) -> Value {
    let raw_items: &[Value] = match raw {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => &[],
        Some(other) => return other.clone(),
    };

    // An optional tuple left empty stays empty: tuples are filled as a whole
    // through the populate operation, never position by position.
    if !required && raw_items.is_empty() {
        return Value::Array(Vec::new());
    }

    let size = property::tuple_size(schema);
    let mut out = Vec::with_capacity(size.max(raw_items.len()));
    for (index, item) in raw_items.iter().enumerate() {
        match property::tuple_item_schema(schema, version, index) {
            Some(item_schema) => out.push(resolve_property_value(
                item_schema,
                version,
                required,
                Some(item),
                use_defaults,
            )),
            // Positions beyond the fixed size pass through verbatim.
            None => out.push(item.clone()),
        }
    }
    for index in raw_items.len()..size {
        match property::tuple_item_schema(schema, version, index) {
            Some(item_schema) => out.push(resolve_property_value(
                item_schema,
                version,
                false,
                None,
                use_defaults,
            )),
            None => out.push(Value::Null),
        }
    }
    Value::Array(out)
}
