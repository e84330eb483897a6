//! Schema normalization.
//!
//! Raw pydantic schemas arrive with `$ref` indirection, `allOf` wrappers and
//! discriminator mappings expressed as schema pointers. The rest of the
//! engine only ever sees the normalized form produced here:
//! - ignored top-level properties are stripped (and removed from `required`)
//! - discriminator mappings are rewritten to integer `oneOf` indices
//! - every `$ref` is replaced by a deep copy of the referenced fragment
//! - every `allOf` is merged into a single schema object
//!
//! Normalization is a pure schema-to-schema transform: it never looks at
//! data. The pipeline order matters: discriminator mappings are matched
//! against the *unresolved* `$ref` strings of the sibling `oneOf` branches,
//! so the rewrite must run before reference resolution.

use serde_json::{Map, Value};

use crate::errors::{SchemaFormError, SchemaFormResult};

/// Hard cap on nested `$ref` expansion, guarding against reference cycles.
const MAX_REF_DEPTH: usize = 64;

/// Produce the normalized schema consumed by the tree builder.
///
/// `ignored` names top-level properties to drop entirely (typically
/// arguments injected by the surrounding system rather than the user).
pub fn normalize_schema(schema: &Value, ignored: &[String]) -> SchemaFormResult<Value> {
    let stripped = strip_ignored_properties(schema, ignored);
    let rewritten = rewrite_discriminators(&stripped);
    let resolved = replace_references(&rewritten, &rewritten, 0)?;
    Ok(merge_all_of(&resolved))
}

/// Remove the named top-level properties and their entries in `required`.
pub fn strip_ignored_properties(schema: &Value, ignored: &[String]) -> Value {
    let mut out = schema.clone();
    if let Some(obj) = out.as_object_mut() {
        if let Some(props) = obj.get_mut("properties").and_then(Value::as_object_mut) {
            props.retain(|k, _| !ignored.iter().any(|i| i == k));
        }
        if let Some(required) = obj.get_mut("required").and_then(Value::as_array_mut) {
            required.retain(|k| {
                k.as_str()
                    .map(|k| !ignored.iter().any(|i| i == k))
                    .unwrap_or(true)
            });
        }
    }
    out
}

/// Rewrite `discriminator.mapping` values from schema-pointer strings to the
/// integer index of the matching `oneOf` branch. The match compares the
/// pointer against each branch's own (still unresolved) `$ref`. Unmatched
/// mappings pass through unchanged.
fn rewrite_discriminators(node: &Value) -> Value {
    match node {
        Value::Array(items) => Value::Array(items.iter().map(rewrite_discriminators).collect()),
        Value::Object(obj) => {
            let mut out = Map::new();
            for (key, child) in obj {
                if key == "discriminator" {
                    out.insert(key.clone(), rewrite_mapping(child, obj.get("oneOf")));
                } else {
                    out.insert(key.clone(), rewrite_discriminators(child));
                }
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn rewrite_mapping(discriminator: &Value, one_of: Option<&Value>) -> Value {
    let (Some(disc), Some(branches)) = (discriminator.as_object(), one_of.and_then(Value::as_array))
    else {
        return discriminator.clone();
    };
    let Some(mapping) = disc.get("mapping").and_then(Value::as_object) else {
        return discriminator.clone();
    };

    let mut rewritten = Map::new();
    for (label, pointer) in mapping {
        let index = pointer.as_str().and_then(|p| {
            branches
                .iter()
                .position(|b| b.get("$ref").and_then(Value::as_str) == Some(p))
        });
        match index {
            Some(i) => rewritten.insert(label.clone(), Value::from(i)),
            None => rewritten.insert(label.clone(), pointer.clone()),
        };
    }

    let mut out = disc.clone();
    out.insert("mapping".to_string(), Value::Object(rewritten));
    Value::Object(out)
}

/// Recursively replace `$ref` objects with deep copies of the referenced
/// fragment. Sibling keywords of a `$ref` node and the referenced fragment's
/// keywords are written into a fresh object in iteration order, so collisions
/// resolve to whichever is written last.
fn replace_references(doc: &Value, node: &Value, depth: usize) -> SchemaFormResult<Value> {
    if depth > MAX_REF_DEPTH {
        return Err(SchemaFormError::unresolvable_reference(
            "reference nesting exceeds the supported depth (reference cycle?)",
        ));
    }
    match node {
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(replace_references(doc, item, depth)?);
            }
            Ok(Value::Array(out))
        }
        Value::Object(obj) => {
            let mut out = Map::new();
            for (key, child) in obj {
                if key == "$ref" {
                    let Some(pointer) = child.as_str() else {
                        out.insert(key.clone(), replace_references(doc, child, depth)?);
                        continue;
                    };
                    let fragment = resolve_pointer(doc, pointer)?;
                    let Some(fragment) = fragment.as_object() else {
                        return Err(SchemaFormError::unresolvable_reference(format!(
                            "reference {pointer} does not point to a schema object"
                        )));
                    };
                    for (k, v) in fragment {
                        out.insert(k.clone(), replace_references(doc, v, depth + 1)?);
                    }
                } else {
                    out.insert(key.clone(), replace_references(doc, child, depth)?);
                }
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

/// Follow a `#/a/b/c` pointer from the document root.
fn resolve_pointer<'a>(doc: &'a Value, pointer: &str) -> SchemaFormResult<&'a Value> {
    let Some(path) = pointer.strip_prefix("#/") else {
        return Err(SchemaFormError::unresolvable_reference(format!(
            "unsupported $ref format: {pointer}"
        )));
    };
    let mut current = doc;
    for segment in path.split('/') {
        current = match current {
            Value::Object(obj) => obj.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
        .ok_or_else(|| {
            SchemaFormError::unresolvable_reference(format!(
                "unable to resolve reference {pointer}: key {segment} not found"
            ))
        })?;
    }
    Ok(current)
}

/// Recursively merge `allOf` arrays into a single schema object.
///
/// Members are normalized first, then merged keyword by keyword into the
/// accumulator: array-valued keywords concatenate, object-valued keywords
/// shallow-merge, anything else overwrites.
fn merge_all_of(node: &Value) -> Value {
    match node {
        Value::Array(items) => Value::Array(items.iter().map(merge_all_of).collect()),
        Value::Object(obj) => {
            let mut out = Map::new();
            for (key, child) in obj {
                if key == "allOf" {
                    if let Some(members) = child.as_array() {
                        for member in members {
                            if let Value::Object(merged) = merge_all_of(member) {
                                for (k, v) in merged {
                                    merge_keyword(&mut out, k, v);
                                }
                            }
                        }
                        continue;
                    }
                }
                out.insert(key.clone(), merge_all_of(child));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn merge_keyword(acc: &mut Map<String, Value>, key: String, value: Value) {
    match (acc.get_mut(&key), value) {
        (Some(Value::Array(existing)), Value::Array(mut incoming)) => {
            existing.append(&mut incoming);
        }
        (Some(Value::Object(existing)), Value::Object(incoming)) => {
            for (k, v) in incoming {
                existing.insert(k, v);
            }
        }
        (_, value) => {
            acc.insert(key, value);
        }
    }
}

/// Produce a validator-compatible view of the schema: `discriminator` is
/// removed from any node that also carries `oneOf`. The form tree's own
/// branch selection supersedes validator-driven discriminators.
pub fn strip_discriminator(schema: &Value) -> Value {
    match schema {
        Value::Array(items) => Value::Array(items.iter().map(strip_discriminator).collect()),
        Value::Object(obj) => {
            let mut out = Map::new();
            for (key, child) in obj {
                if key == "discriminator" && obj.contains_key("oneOf") {
                    continue;
                }
                out.insert(key.clone(), strip_discriminator(child));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn discriminated_schema() -> Value {
        json!({
            "$defs": {
                "ProcessAModel": {
                    "properties": {
                        "step": { "const": "ProcessA", "type": "string" },
                        "parameter1": { "type": "number" }
                    },
                    "required": ["step", "parameter1"],
                    "title": "ProcessAModel",
                    "type": "object"
                },
                "ProcessBModel": {
                    "properties": {
                        "step": { "const": "ProcessB", "type": "string" },
                        "parameter1": { "type": "number" }
                    },
                    "required": ["step", "parameter1"],
                    "title": "ProcessBModel",
                    "type": "object"
                }
            },
            "properties": {
                "proc_step": {
                    "discriminator": {
                        "mapping": {
                            "ProcessA": "#/$defs/ProcessAModel",
                            "ProcessB": "#/$defs/ProcessBModel"
                        },
                        "propertyName": "step"
                    },
                    "oneOf": [
                        { "$ref": "#/$defs/ProcessAModel" },
                        { "$ref": "#/$defs/ProcessBModel" }
                    ],
                    "title": "Proc Step"
                }
            },
            "required": ["proc_step"],
            "type": "object"
        })
    }

    #[test]
    fn rewrites_discriminator_mapping_to_indices() {
        let schema = normalize_schema(&discriminated_schema(), &[]).unwrap();
        let mapping = &schema["properties"]["proc_step"]["discriminator"]["mapping"];
        assert_eq!(mapping["ProcessA"], json!(0));
        assert_eq!(mapping["ProcessB"], json!(1));

        let branches = schema["properties"]["proc_step"]["oneOf"].as_array().unwrap();
        assert_eq!(branches[0]["title"], "ProcessAModel");
        assert_eq!(branches[1]["title"], "ProcessBModel");
    }

    #[test]
    fn resolves_nested_references() {
        let schema = normalize_schema(
            &json!({
                "type": "object",
                "properties": {
                    "simple": { "type": "string" },
                    "referenced1": { "title": "Referenced 1", "$ref": "#/definitions/Ref1" }
                },
                "required": ["referenced1"],
                "definitions": {
                    "Ref1": {
                        "type": "object",
                        "properties": {
                            "referenced2": {
                                "type": "array",
                                "items": { "$ref": "#/definitions/Ref2" }
                            }
                        }
                    },
                    "Ref2": {
                        "type": "object",
                        "properties": { "ref2string": { "type": "string" } }
                    }
                }
            }),
            &[],
        )
        .unwrap();

        let referenced1 = &schema["properties"]["referenced1"];
        assert_eq!(referenced1["title"], "Referenced 1");
        assert_eq!(referenced1["type"], "object");
        let items = &referenced1["properties"]["referenced2"]["items"];
        assert_eq!(items["type"], "object");
        assert_eq!(items["properties"]["ref2string"]["type"], "string");
    }

    #[test]
    fn rejects_external_reference() {
        let schema = json!({ "properties": { "p": { "$ref": "http://example.com/x" } } });
        let err = normalize_schema(&schema, &[]).unwrap_err();
        assert!(err.to_string().contains("unsupported $ref format"));
    }

    #[test]
    fn reports_missing_reference_segment() {
        let schema = json!({ "properties": { "p": { "$ref": "#/definitions/Missing" } } });
        let err = normalize_schema(&schema, &[]).unwrap_err();
        assert!(err.to_string().contains("key definitions not found"));
    }

    #[test]
    fn rejects_reference_cycles() {
        let schema = json!({
            "definitions": { "Loop": { "$ref": "#/definitions/Loop" } },
            "properties": { "p": { "$ref": "#/definitions/Loop" } }
        });
        let err = normalize_schema(&schema, &[]).unwrap_err();
        assert!(err.to_string().contains("reference nesting"));
    }

    #[test]
    fn merges_all_of() {
        let schema = normalize_schema(
            &json!({
                "type": "object",
                "properties": {
                    "allOfNumber": {
                        "title": "My Number",
                        "allOf": [
                            { "type": "number", "minimum": 5 },
                            { "type": "number", "maximum": 10 }
                        ]
                    },
                    "allOfEnum": {
                        "allOf": [{ "enum": ["A"] }, { "enum": ["B"] }]
                    },
                    "allOfObject": {
                        "allOf": [
                            {
                                "type": "object",
                                "default": { "k1": "v1" },
                                "properties": { "k1": { "type": "string" } }
                            },
                            {
                                "type": "object",
                                "default": { "k2": "v2" },
                                "properties": { "k2": { "type": "string" } }
                            }
                        ]
                    }
                }
            }),
            &[],
        )
        .unwrap();

        let number = &schema["properties"]["allOfNumber"];
        assert_eq!(number["type"], "number");
        assert_eq!(number["title"], "My Number");
        assert_eq!(number["minimum"], 5);
        assert_eq!(number["maximum"], 10);
        assert_eq!(schema["properties"]["allOfEnum"]["enum"], json!(["A", "B"]));
        assert_eq!(
            schema["properties"]["allOfObject"],
            json!({
                "type": "object",
                "default": { "k1": "v1", "k2": "v2" },
                "properties": {
                    "k1": { "type": "string" },
                    "k2": { "type": "string" }
                }
            })
        );
    }

    #[test]
    fn keeps_null_default() {
        let schema = normalize_schema(
            &json!({
                "type": "object",
                "properties": { "testProp": { "default": null, "type": "string" } }
            }),
            &[],
        )
        .unwrap();
        assert_eq!(schema["properties"]["testProp"]["default"], Value::Null);
    }

    #[test]
    fn strips_ignored_properties_and_required() {
        let schema = normalize_schema(
            &json!({
                "type": "object",
                "properties": {
                    "keep": { "type": "string" },
                    "zarr_url": { "type": "string" }
                },
                "required": ["keep", "zarr_url"]
            }),
            &["zarr_url".to_string()],
        )
        .unwrap();
        assert!(schema["properties"].get("zarr_url").is_none());
        assert_eq!(schema["required"], json!(["keep"]));
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_schema(&discriminated_schema(), &[]).unwrap();
        let twice = normalize_schema(&once, &[]).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn strip_discriminator_only_touches_one_of_nodes() {
        let stripped = strip_discriminator(&discriminated_schema());
        assert!(stripped["properties"]["proc_step"].get("discriminator").is_none());
        assert!(stripped["properties"]["proc_step"].get("oneOf").is_some());
        assert_eq!(stripped["$defs"], discriminated_schema()["$defs"]);
    }
}
