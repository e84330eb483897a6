//! Mapping validator errors onto the tree.
//!
//! Each [`ErrorRecord`] carries an instance path into the derived value,
//! which matches form node paths exactly. The mapper walks the tree depth
//! first, attaches each error's message to the owning node, and marks every
//! node on the way down so ancestors can show an error indicator. Errors
//! naming a missing or additional property attach to the child with that
//! key rather than to the owning object.
//!
//! The structural validator evaluates every `oneOf` branch, so a conditional
//! node receives errors for branches the user never selected. Those are
//! recognized by the branch index in the error's schema path and dropped.
//! Errors matching no node at all are handed back to the caller.

use crate::element::{FormNode, NodeKind};
use crate::validation::ErrorRecord;

/// Attach `errors` to the tree rooted at `root`. Returns the errors that
/// could not be attached to any node.
pub fn apply_errors(root: &mut FormNode, errors: &[ErrorRecord]) -> Vec<ErrorRecord> {
    let mut generic = Vec::new();
    for error in errors {
        if !attach(error, root) {
            generic.push(error.clone());
        }
    }
    generic
}

fn attach(error: &ErrorRecord, node: &mut FormNode) -> bool {
    if discards(error, node) {
        return true;
    }
    if error.instance_path.starts_with(&node.path) {
        node.has_errors = true;
    }
    if node.path == error.instance_path {
        set_error(error, node);
        return true;
    }
    for index in 0..node.children_mut().len() {
        let child = &mut node.children_mut()[index];
        if discards(error, child) {
            return true;
        }
        if child.path == error.instance_path {
            set_error(error, child);
            return true;
        }
        if attach(error, child) {
            return true;
        }
    }
    false
}

fn set_error(error: &ErrorRecord, node: &mut FormNode) {
    node.has_errors = true;
    if let Some(params) = &error.params {
        if let Some(key) = &params.missing_property {
            if set_error_to_child(error, key, node) {
                return;
            }
        }
        if let Some(key) = &params.additional_property {
            if set_error_to_child(error, key, node) {
                return;
            }
        }
    } else if let NodeKind::Conditional(state) = &mut node.kind {
        // An unparameterized error on a conditional describes the value the
        // selected branch produced.
        if let Some(selected) = &mut state.selected {
            selected.add_error(error.message.clone());
            return;
        }
    }
    node.add_error(error.message.clone());
}

fn set_error_to_child(error: &ErrorRecord, key: &str, parent: &mut FormNode) -> bool {
    for child in parent.children_mut() {
        if child.key.as_deref() == Some(key) {
            child.add_error(error.message.clone());
            return true;
        }
    }
    false
}

/// True when `error` addresses a `oneOf` branch other than the one selected
/// at this conditional node. Such errors come from the validator trying the
/// branches the user did not pick.
fn discards(error: &ErrorRecord, node: &FormNode) -> bool {
    let NodeKind::Conditional(state) = &node.kind else {
        return false;
    };
    if !error.instance_path.starts_with(&node.path) {
        return false;
    }
    let Some(index) = one_of_branch_index(&error.schema_path) else {
        return false;
    };
    state.selected_index != Some(index)
}

/// The branch index of the first `/oneOf/<i>` segment in a schema path.
fn one_of_branch_index(schema_path: &str) -> Option<usize> {
    let (_, rest) = schema_path.split_once("/oneOf/")?;
    rest.split('/').next()?.parse().ok()
}
