//! The form node tree.
//!
//! One [`FormNode`] mirrors one normalized schema fragment plus its current
//! value and error state. The shape-specific payload lives in [`NodeKind`],
//! one variant per schema shape. All editing goes through the mutation
//! methods here; the rendering layer never builds or rewires nodes itself.
//!
//! Mutations that a user can reasonably trigger on a stale view (removing a
//! key that is already gone, moving the first item up) log a warning and
//! return `false` instead of failing. Only `add_property` and
//! `select_branch` return real errors, since their failures need to be shown
//! to the user.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::builder::{build_branch, build_node, BuildContext};
use crate::errors::{SchemaFormError, SchemaFormResult};
use crate::initial_data::resolve_property_value;
use crate::property;

/// Join a parent path and a child segment. The root path is `""`, so every
/// node path starts with `/`, matching validator instance paths.
pub(crate) fn child_path(parent: &str, segment: &str) -> String {
    format!("{parent}/{segment}")
}

/// A single element of the form tree.
#[derive(Debug, Clone)]
pub struct FormNode {
    /// Identity, unique within one tree.
    pub id: Uuid,
    /// Property name, or `None` for array and tuple members.
    pub key: Option<String>,
    /// JSON-pointer-like location in the derived value.
    pub path: String,
    pub title: String,
    pub description: String,
    pub required: bool,
    /// True only for additional object properties and array items.
    pub removable: bool,
    /// Owned copy of the normalized schema fragment this node mirrors.
    pub schema: Value,
    /// Messages attached by the last validation pass.
    pub errors: Vec<String>,
    /// Set when this node or any descendant carries an error.
    pub has_errors: bool,
    pub kind: NodeKind,
}

/// Shape-specific node payload.
#[derive(Debug, Clone)]
pub enum NodeKind {
    String {
        value: Value,
    },
    Boolean {
        value: Value,
    },
    Number {
        value: Value,
        min: Option<f64>,
        max: Option<f64>,
        /// The rendered input holds text that does not parse as a number.
        bad_input: bool,
    },
    Enum {
        value: Value,
        options: Vec<Value>,
    },
    Object {
        children: Vec<FormNode>,
        /// Schema for user-added properties, when permitted.
        additional: Option<Value>,
        collapsed: bool,
    },
    Array {
        children: Vec<FormNode>,
        items: Value,
        min_items: Option<u64>,
        max_items: Option<u64>,
        collapsed: bool,
    },
    Tuple {
        children: Vec<FormNode>,
        size: usize,
        collapsed: bool,
    },
    Conditional(ConditionalState),
    /// Data with no corresponding schema property, kept for inspection.
    Unexpected { value: Value },
    /// Data whose runtime type conflicts with the declared schema type.
    Invalid { value: Value },
}

/// State of a `oneOf` node.
#[derive(Debug, Clone)]
pub struct ConditionalState {
    pub discriminator: Option<Discriminator>,
    /// The branch schemas, in `oneOf` order.
    pub branches: Vec<Value>,
    pub selected_index: Option<usize>,
    /// The form subtree for the selected branch. It shares this node's path,
    /// since the branch value and the conditional value are the same object.
    pub selected: Option<Box<FormNode>>,
    /// Raw value kept verbatim when no branch could be selected.
    pub residual: Value,
}

/// Discriminator descriptor of a `oneOf` node.
#[derive(Debug, Clone)]
pub struct Discriminator {
    /// Name of the constant-valued property selecting the branch.
    pub property_name: String,
    /// Label per branch index, inverted from the rewritten mapping.
    pub labels: Vec<Option<String>>,
}

impl FormNode {
    /// Direct children, for tree walks. A conditional exposes its selected
    /// branch's children, matching how its value is derived.
    pub fn children(&self) -> &[FormNode] {
        match &self.kind {
            NodeKind::Object { children, .. }
            | NodeKind::Array { children, .. }
            | NodeKind::Tuple { children, .. } => children,
            NodeKind::Conditional(state) => state
                .selected
                .as_deref()
                .map(FormNode::children)
                .unwrap_or(&[]),
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> &mut [FormNode] {
        match &mut self.kind {
            NodeKind::Object { children, .. }
            | NodeKind::Array { children, .. }
            | NodeKind::Tuple { children, .. } => children,
            NodeKind::Conditional(state) => state
                .selected
                .as_deref_mut()
                .map(FormNode::children_mut)
                .unwrap_or(&mut []),
            _ => &mut [],
        }
    }

    /// Re-derive the plain JSON value this subtree represents.
    pub fn derive_value(&self) -> Value {
        match &self.kind {
            NodeKind::String { value }
            | NodeKind::Boolean { value }
            | NodeKind::Enum { value, .. } => value.clone(),
            NodeKind::Number { value, bad_input, .. } => {
                if *bad_input {
                    // Sentinel: keeps the document structurally present but
                    // semantically invalid until the input is fixed.
                    Value::String("invalid".to_string())
                } else {
                    value.clone()
                }
            }
            NodeKind::Object { children, .. } => {
                let mut out = Map::new();
                for child in children {
                    if let Some(key) = &child.key {
                        out.insert(key.clone(), child.derive_value());
                    }
                }
                Value::Object(out)
            }
            NodeKind::Array { children, .. } | NodeKind::Tuple { children, .. } => {
                Value::Array(children.iter().map(FormNode::derive_value).collect())
            }
            NodeKind::Conditional(state) => state.derive_value(),
            NodeKind::Unexpected { value } | NodeKind::Invalid { value } => value.clone(),
        }
    }

    /// Clear error state across the whole subtree.
    pub fn clear_errors_deep(&mut self) {
        self.errors.clear();
        self.has_errors = false;
        if let NodeKind::Conditional(state) = &mut self.kind {
            if let Some(selected) = &mut state.selected {
                selected.clear_errors_deep();
            }
            return;
        }
        for child in self.children_mut() {
            child.clear_errors_deep();
        }
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.has_errors = true;
    }

    /// Move this subtree to a new path, rewriting descendant paths.
    pub(crate) fn rebase(&mut self, new_path: &str) {
        self.path = new_path.to_string();
        match &mut self.kind {
            NodeKind::Object { children, .. } => {
                for child in children {
                    if let Some(key) = child.key.clone() {
                        child.rebase(&child_path(new_path, &key));
                    }
                }
            }
            NodeKind::Array { children, .. } | NodeKind::Tuple { children, .. } => {
                for (index, child) in children.iter_mut().enumerate() {
                    child.rebase(&child_path(new_path, &index.to_string()));
                }
            }
            NodeKind::Conditional(state) => {
                if let Some(selected) = &mut state.selected {
                    selected.rebase(new_path);
                }
            }
            _ => {}
        }
    }

    /// Set the value of a leaf node. A number node also drops its bad-input
    /// flag, since a stored value supersedes whatever text was typed.
    pub fn set_value(&mut self, new_value: Value) -> bool {
        match &mut self.kind {
            NodeKind::String { value }
            | NodeKind::Boolean { value }
            | NodeKind::Enum { value, .. } => {
                *value = new_value;
                true
            }
            NodeKind::Number { value, bad_input, .. } => {
                *value = new_value;
                *bad_input = false;
                true
            }
            _ => {
                tracing::warn!(path = %self.path, "set_value on a non-leaf node");
                false
            }
        }
    }

    pub fn set_bad_input(&mut self, flag: bool) -> bool {
        match &mut self.kind {
            NodeKind::Number { bad_input, .. } => {
                *bad_input = flag;
                true
            }
            _ => {
                tracing::warn!(path = %self.path, "set_bad_input on a non-number node");
                false
            }
        }
    }

    pub fn set_collapsed(&mut self, flag: bool) -> bool {
        match &mut self.kind {
            NodeKind::Object { collapsed, .. }
            | NodeKind::Array { collapsed, .. }
            | NodeKind::Tuple { collapsed, .. } => {
                *collapsed = flag;
                true
            }
            _ => false,
        }
    }

    /// Add a user-defined property to an object node.
    pub fn add_property(&mut self, ctx: &BuildContext, key: &str) -> SchemaFormResult<()> {
        let NodeKind::Object {
            children,
            additional,
            ..
        } = &mut self.kind
        else {
            return Err(SchemaFormError::invalid_operation(
                "add_property on a non-object node",
            ));
        };
        let Some(additional) = additional.clone() else {
            return Err(SchemaFormError::invalid_argument(
                "object does not accept additional properties",
            ));
        };
        if key.is_empty() {
            return Err(SchemaFormError::invalid_argument("property name must not be empty"));
        }
        if children.iter().any(|c| c.key.as_deref() == Some(key)) {
            return Err(SchemaFormError::invalid_argument(format!(
                "object already has a property named '{key}'"
            )));
        }
        let value = resolve_property_value(
            &additional,
            ctx.version,
            false,
            additional.get("default"),
            false,
        );
        let mut child = build_node(
            ctx,
            &additional,
            Some(key.to_string()),
            child_path(&self.path, key),
            false,
            true,
            &value,
        );
        child.title = key.to_string();
        children.push(child);
        Ok(())
    }

    /// Remove a removable property by key.
    pub fn remove_property(&mut self, key: &str) -> bool {
        let NodeKind::Object { children, .. } = &mut self.kind else {
            tracing::warn!(path = %self.path, "remove_property on a non-object node");
            return false;
        };
        let Some(index) = children.iter().position(|c| c.key.as_deref() == Some(key)) else {
            tracing::warn!(path = %self.path, key, "remove_property: no such key");
            return false;
        };
        if !children[index].removable {
            tracing::warn!(path = %self.path, key, "remove_property: child is not removable");
            return false;
        }
        children.remove(index);
        true
    }

    /// Rebuild the child at `index` from its declared default. No-op when
    /// the child's schema has no default.
    pub fn reset_property(&mut self, ctx: &BuildContext, index: usize) -> bool {
        let path = self.path.clone();
        let NodeKind::Object { children, .. } = &mut self.kind else {
            tracing::warn!(path = %path, "reset_property on a non-object node");
            return false;
        };
        let Some(child) = children.get(index) else {
            tracing::warn!(path = %path, index, "reset_property: index out of range");
            return false;
        };
        let Some(default) = child.schema.get("default").cloned() else {
            return false;
        };
        children[index] = rebuild_child(ctx, &children[index], &default);
        true
    }

    /// Replace an invalid child with one freshly built from its schema,
    /// recovering from a stored type mismatch.
    pub fn fix_invalid_property(&mut self, ctx: &BuildContext, index: usize) -> bool {
        let path = self.path.clone();
        let NodeKind::Object { children, .. } = &mut self.kind else {
            tracing::warn!(path = %path, "fix_invalid_property on a non-object node");
            return false;
        };
        let Some(child) = children.get(index) else {
            tracing::warn!(path = %path, index, "fix_invalid_property: index out of range");
            return false;
        };
        if !matches!(child.kind, NodeKind::Invalid { .. }) {
            tracing::warn!(path = %path, index, "fix_invalid_property: child is not invalid");
            return false;
        }
        let value = resolve_property_value(&child.schema, ctx.version, child.required, None, true);
        children[index] = rebuild_child(ctx, &children[index], &value);
        true
    }

    /// Append a fresh item to an array node. No-op at `maxItems`.
    pub fn push_item(&mut self, ctx: &BuildContext) -> bool {
        let path = self.path.clone();
        let NodeKind::Array {
            children,
            items,
            max_items,
            ..
        } = &mut self.kind
        else {
            tracing::warn!(path = %path, "push_item on a non-array node");
            return false;
        };
        if let Some(max) = max_items {
            if children.len() as u64 == *max {
                return false;
            }
        }
        let value = resolve_property_value(items, ctx.version, false, None, true);
        let index = children.len();
        children.push(build_node(
            ctx,
            &items.clone(),
            None,
            child_path(&path, &index.to_string()),
            false,
            true,
            &value,
        ));
        true
    }

    /// Remove an array item and renumber the remaining children.
    pub fn remove_item(&mut self, index: usize) -> bool {
        let path = self.path.clone();
        let NodeKind::Array { children, .. } = &mut self.kind else {
            tracing::warn!(path = %path, "remove_item on a non-array node");
            return false;
        };
        if index >= children.len() {
            tracing::warn!(path = %path, index, "remove_item: index out of range");
            return false;
        }
        children.remove(index);
        renumber(&path, children);
        true
    }

    pub fn move_item_up(&mut self, index: usize) -> bool {
        let path = self.path.clone();
        let NodeKind::Array { children, .. } = &mut self.kind else {
            tracing::warn!(path = %path, "move_item_up on a non-array node");
            return false;
        };
        if index == 0 || index >= children.len() {
            return false;
        }
        children.swap(index - 1, index);
        renumber(&path, children);
        true
    }

    pub fn move_item_down(&mut self, index: usize) -> bool {
        let path = self.path.clone();
        let NodeKind::Array { children, .. } = &mut self.kind else {
            tracing::warn!(path = %path, "move_item_down on a non-array node");
            return false;
        };
        if index + 1 >= children.len() {
            return false;
        }
        children.swap(index, index + 1);
        renumber(&path, children);
        true
    }

    /// Fill every tuple position at once. Position values come from each
    /// position schema's own default, falling back to the tuple's declared
    /// default array by index.
    pub fn populate_tuple(&mut self, ctx: &BuildContext) -> bool {
        let path = self.path.clone();
        let schema = self.schema.clone();
        let NodeKind::Tuple { children, size, .. } = &mut self.kind else {
            tracing::warn!(path = %path, "populate_tuple on a non-tuple node");
            return false;
        };
        let tuple_default = schema.get("default").and_then(Value::as_array);
        let mut fresh = Vec::with_capacity(*size);
        for index in 0..*size {
            let item_schema = property::tuple_item_schema(&schema, ctx.version, index)
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new()));
            let raw = item_schema
                .get("default")
                .cloned()
                .or_else(|| tuple_default.and_then(|d| d.get(index).cloned()));
            let value =
                resolve_property_value(&item_schema, ctx.version, false, raw.as_ref(), false);
            fresh.push(build_node(
                ctx,
                &item_schema,
                None,
                child_path(&path, &index.to_string()),
                false,
                false,
                &value,
            ));
        }
        *children = fresh;
        true
    }

    /// Empty a tuple node. Tuples are cleared as a whole, never partially.
    pub fn clear_tuple(&mut self) -> bool {
        let NodeKind::Tuple { children, .. } = &mut self.kind else {
            tracing::warn!(path = %self.path, "clear_tuple on a non-tuple node");
            return false;
        };
        children.clear();
        true
    }

    /// Drop a tuple position beyond the declared fixed size.
    pub fn remove_extra_item(&mut self, index: usize) -> bool {
        let path = self.path.clone();
        let NodeKind::Tuple { children, size, .. } = &mut self.kind else {
            tracing::warn!(path = %path, "remove_extra_item on a non-tuple node");
            return false;
        };
        if index < *size || index >= children.len() {
            tracing::warn!(path = %path, index, "remove_extra_item: not an extra position");
            return false;
        }
        children.remove(index);
        renumber(&path, children);
        true
    }

    /// Replace the selected branch of a conditional node with a freshly
    /// built subtree for `oneOf[index]`, loading that branch's defaults.
    pub fn select_branch(&mut self, ctx: &BuildContext, index: usize) -> SchemaFormResult<()> {
        let path = self.path.clone();
        let NodeKind::Conditional(state) = &mut self.kind else {
            return Err(SchemaFormError::invalid_operation(
                "select_branch on a non-conditional node",
            ));
        };
        let Some(branch_schema) = state.branches.get(index).cloned() else {
            return Err(SchemaFormError::invalid_argument(format!(
                "branch index {index} out of range ({} branches)",
                state.branches.len()
            )));
        };
        let value = resolve_property_value(&branch_schema, ctx.version, true, None, true);
        state.selected_index = Some(index);
        state.selected = Some(Box::new(build_branch(
            ctx,
            &branch_schema,
            state.discriminator.as_ref(),
            path,
            &value,
        )));
        state.residual = Value::Null;
        Ok(())
    }
}

impl ConditionalState {
    fn derive_value(&self) -> Value {
        let Some(selected) = &self.selected else {
            // No branch selected: the raw value is preserved untouched.
            return self.residual.clone();
        };
        let derived = selected.derive_value();
        let (Some(discriminator), Some(index)) = (&self.discriminator, self.selected_index) else {
            return derived;
        };
        let Some(Some(label)) = discriminator.labels.get(index) else {
            return derived;
        };
        // Re-insert the discriminator pair stripped at build time.
        let mut out = Map::new();
        out.insert(
            discriminator.property_name.clone(),
            Value::String(label.clone()),
        );
        if let Value::Object(rest) = derived {
            for (k, v) in rest {
                out.insert(k, v);
            }
        }
        Value::Object(out)
    }
}

fn rebuild_child(ctx: &BuildContext, old: &FormNode, value: &Value) -> FormNode {
    let collapsed = match &old.kind {
        NodeKind::Object { collapsed, .. }
        | NodeKind::Array { collapsed, .. }
        | NodeKind::Tuple { collapsed, .. } => Some(*collapsed),
        _ => None,
    };
    let mut fresh = build_node(
        ctx,
        &old.schema,
        old.key.clone(),
        old.path.clone(),
        old.required,
        old.removable,
        value,
    );
    if let Some(collapsed) = collapsed {
        fresh.set_collapsed(collapsed);
    }
    fresh
}

/// Rewrite the paths of positional children after a splice or swap so that
/// indices stay contiguous from 0.
fn renumber(parent_path: &str, children: &mut [FormNode]) {
    for (index, child) in children.iter_mut().enumerate() {
        child.rebase(&child_path(parent_path, &index.to_string()));
    }
}
