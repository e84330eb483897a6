//! Tree construction.
//!
//! Builds a [`FormNode`] subtree from a normalized schema fragment and a
//! resolved value. Dispatch on schema shape follows a fixed priority:
//! `enum` first, then the nullable-`anyOf` unwrap, then `oneOf`, then the
//! declared `type`. The order matters because schemas combine keywords (an
//! `enum` usually sits next to a `type`).
//!
//! A value whose runtime shape conflicts with the schema never aborts the
//! build: it becomes an `Invalid` node, and data with no schema counterpart
//! becomes an `Unexpected` node. Both stay in the tree for the user to
//! inspect and repair.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::element::{child_path, ConditionalState, Discriminator, FormNode, NodeKind};
use crate::initial_data::resolve_property_value;
use crate::property;
use crate::version::SchemaVersion;

/// Parameters shared by every node construction in one tree.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext {
    pub version: SchemaVersion,
}

/// Build the root node of a form.
pub fn build_root(ctx: &BuildContext, schema: &Value, value: &Value) -> FormNode {
    build_node(ctx, schema, None, String::new(), true, false, value)
}

/// Build one node and its subtree.
pub fn build_node(
    ctx: &BuildContext,
    schema: &Value,
    key: Option<String>,
    path: String,
    required: bool,
    removable: bool,
    value: &Value,
) -> FormNode {
    if let Some(unwrapped) = property::unwrap_nullable_any_of(schema) {
        if schema.get("enum").is_none() {
            return build_node(ctx, &unwrapped, key, path, required, removable, value);
        }
    }

    let base = |kind: NodeKind| FormNode {
        id: Uuid::new_v4(),
        title: node_title(schema, key.as_deref(), removable),
        description: schema
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        key: key.clone(),
        path: path.clone(),
        required,
        removable,
        schema: schema.clone(),
        errors: Vec::new(),
        has_errors: false,
        kind,
    };

    if let Some(options) = schema.get("enum").and_then(Value::as_array) {
        return base(NodeKind::Enum {
            value: value.clone(),
            options: options.clone(),
        });
    }

    if schema.get("oneOf").is_some() {
        return base(NodeKind::Conditional(build_conditional(
            ctx, schema, &path, value,
        )));
    }

    match property::schema_type(schema) {
        Some("object") => match value {
            Value::Object(map) => base(build_object(ctx, schema, &path, required, map)),
            Value::Null => base(build_object(ctx, schema, &path, required, &Map::new())),
            other => base(NodeKind::Invalid {
                value: other.clone(),
            }),
        },
        Some("array") if property::is_tuple(schema) => match value {
            Value::Array(items) => base(build_tuple(ctx, schema, &path, required, items)),
            Value::Null => base(build_tuple(ctx, schema, &path, required, &[])),
            other => base(NodeKind::Invalid {
                value: other.clone(),
            }),
        },
        Some("array") => match value {
            Value::Array(items) => base(build_array(ctx, schema, &path, required, items)),
            Value::Null => base(build_array(ctx, schema, &path, required, &[])),
            other => base(NodeKind::Invalid {
                value: other.clone(),
            }),
        },
        Some("number") | Some("integer") => {
            if value.is_number() || value.is_null() {
                base(NodeKind::Number {
                    value: value.clone(),
                    min: property::get_min(schema),
                    max: property::get_max(schema),
                    bad_input: false,
                })
            } else {
                base(NodeKind::Invalid {
                    value: value.clone(),
                })
            }
        }
        Some("boolean") => base(NodeKind::Boolean {
            value: value.clone(),
        }),
        _ => base(NodeKind::String {
            value: value.clone(),
        }),
    }
}

/// Build the subtree for one `oneOf` branch. The branch shares the
/// conditional's path, since both describe the same value. When a
/// discriminator exists, its constant child is stripped from the branch:
/// the conditional re-inserts the pair when deriving its value.
pub fn build_branch(
    ctx: &BuildContext,
    schema: &Value,
    discriminator: Option<&Discriminator>,
    path: String,
    value: &Value,
) -> FormNode {
    let mut node = build_node(ctx, schema, None, path, true, false, value);
    if let Some(discriminator) = discriminator {
        if let NodeKind::Object { children, .. } = &mut node.kind {
            children.retain(|c| c.key.as_deref() != Some(discriminator.property_name.as_str()));
        }
    }
    node
}

/// Title rule: a user-added (removable) property is titled by its key; a
/// declared one prefers the schema's `title`, then its key.
fn node_title(schema: &Value, key: Option<&str>, removable: bool) -> String {
    if removable {
        if let Some(key) = key {
            return key.to_string();
        }
    }
    schema
        .get("title")
        .and_then(Value::as_str)
        .or(key)
        .unwrap_or_default()
        .to_string()
}

fn build_object(
    ctx: &BuildContext,
    schema: &Value,
    path: &str,
    required: bool,
    value: &Map<String, Value>,
) -> NodeKind {
    let additional = property::additional_properties_schema(schema);
    let mut children = Vec::new();

    if let Some(props) = property::object_properties(schema) {
        for (child_key, child_schema) in props {
            let child_value = value.get(child_key).cloned().unwrap_or(Value::Null);
            children.push(build_node(
                ctx,
                child_schema,
                Some(child_key.clone()),
                child_path(path, child_key),
                property::is_required_key(schema, child_key),
                property::is_removable_child(schema, child_key),
                &child_value,
            ));
        }
    }

    for (child_key, child_value) in value {
        if children.iter().any(|c| c.key.as_deref() == Some(child_key)) {
            continue;
        }
        let node = match &additional {
            Some(additional_schema) => build_node(
                ctx,
                additional_schema,
                Some(child_key.clone()),
                child_path(path, child_key),
                false,
                true,
                child_value,
            ),
            // No schema admits this key: keep it opaque, offer removal.
            None => unexpected_node(child_key, path, child_value),
        };
        children.push(node);
    }

    NodeKind::Object {
        children,
        additional,
        collapsed: !required,
    }
}

fn unexpected_node(key: &str, parent_path: &str, value: &Value) -> FormNode {
    FormNode {
        id: Uuid::new_v4(),
        key: Some(key.to_string()),
        path: child_path(parent_path, key),
        title: key.to_string(),
        description: String::new(),
        required: false,
        removable: true,
        schema: Value::Object(Map::new()),
        errors: Vec::new(),
        has_errors: false,
        kind: NodeKind::Unexpected {
            value: value.clone(),
        },
    }
}

fn build_array(
    ctx: &BuildContext,
    schema: &Value,
    path: &str,
    required: bool,
    items: &[Value],
) -> NodeKind {
    let item_schema = property::array_item_schema(schema);
    let children = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            build_node(
                ctx,
                &item_schema,
                None,
                child_path(path, &index.to_string()),
                false,
                true,
                item,
            )
        })
        .collect();
    NodeKind::Array {
        children,
        items: item_schema,
        min_items: schema.get("minItems").and_then(Value::as_u64),
        max_items: schema.get("maxItems").and_then(Value::as_u64),
        collapsed: !required,
    }
}

fn build_tuple(
    ctx: &BuildContext,
    schema: &Value,
    path: &str,
    required: bool,
    items: &[Value],
) -> NodeKind {
    let size = property::tuple_size(schema);
    let mut children = Vec::new();
    if required || !items.is_empty() {
        for index in 0..size.max(items.len()) {
            let item_value = items.get(index).cloned().unwrap_or(Value::Null);
            let segment = index.to_string();
            match property::tuple_item_schema(schema, ctx.version, index) {
                Some(item_schema) => children.push(build_node(
                    ctx,
                    item_schema,
                    None,
                    child_path(path, &segment),
                    false,
                    false,
                    &item_value,
                )),
                // A position beyond the fixed size has no schema.
                None => {
                    let mut node = unexpected_node(&segment, path, &item_value);
                    node.key = None;
                    node.title = String::new();
                    children.push(node);
                }
            }
        }
    }
    NodeKind::Tuple {
        children,
        size,
        collapsed: !required,
    }
}

fn build_conditional(
    ctx: &BuildContext,
    schema: &Value,
    path: &str,
    value: &Value,
) -> ConditionalState {
    let branches: Vec<Value> = schema
        .get("oneOf")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let discriminator = read_discriminator(schema, branches.len());

    let mut state = ConditionalState {
        discriminator,
        branches,
        selected_index: None,
        selected: None,
        residual: Value::Null,
    };

    let selected_index = match &state.discriminator {
        Some(discriminator) => match discriminated_index(discriminator, value) {
            Some(index) => Some(index),
            None => {
                if value_steers_selection(value) {
                    // The data names a branch nobody knows: keep it whole
                    // for the user to fix, select nothing.
                    state.residual = value.clone();
                    return state;
                }
                (!state.branches.is_empty()).then_some(0)
            }
        },
        None => (!state.branches.is_empty()).then_some(0),
    };

    if let Some(index) = selected_index {
        let branch_schema = state.branches[index].clone();
        let branch_value = if value_steers_selection(value) {
            value.clone()
        } else {
            resolve_property_value(&branch_schema, ctx.version, true, None, true)
        };
        state.selected_index = Some(index);
        state.selected = Some(Box::new(build_branch(
            ctx,
            &branch_schema,
            state.discriminator.as_ref(),
            path.to_string(),
            &branch_value,
        )));
    }
    state
}

fn value_steers_selection(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

/// Invert the rewritten `mapping` into a label per branch index.
fn read_discriminator(schema: &Value, branch_count: usize) -> Option<Discriminator> {
    let discriminator = schema.get("discriminator")?;
    let property_name = discriminator
        .get("propertyName")
        .and_then(Value::as_str)?
        .to_string();
    let mut labels = vec![None; branch_count];
    if let Some(mapping) = discriminator.get("mapping").and_then(Value::as_object) {
        for (label, index) in mapping {
            if let Some(index) = index.as_u64() {
                if let Some(slot) = labels.get_mut(index as usize) {
                    *slot = Some(label.clone());
                }
            }
        }
    }
    Some(Discriminator {
        property_name,
        labels,
    })
}

fn discriminated_index(discriminator: &Discriminator, value: &Value) -> Option<usize> {
    let label = value.get(&discriminator.property_name)?.as_str()?;
    discriminator
        .labels
        .iter()
        .position(|l| l.as_deref() == Some(label))
}
