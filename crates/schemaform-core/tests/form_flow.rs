//! End-to-end form behavior: build, derive, mutate.

use proptest::prelude::*;
use schemaform_core::prelude::*;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;

fn noop() -> ChangeCallback {
    Box::new(|_, _| {})
}

fn manager(schema: Value, initial: Option<Value>) -> FormManager {
    FormManager::new(
        &schema,
        noop(),
        SchemaVersion::PydanticV2,
        &[],
        initial.as_ref(),
    )
    .expect("form construction failed")
}

fn discriminated_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "step": {
                "title": "Step",
                "discriminator": { "propertyName": "discr", "mapping": { "A": 0, "B": 1 } },
                "oneOf": [
                    {
                        "type": "object",
                        "title": "A",
                        "properties": {
                            "discr": { "const": "A", "type": "string" },
                            "a": { "type": "string" }
                        },
                        "required": ["discr", "a"]
                    },
                    {
                        "type": "object",
                        "title": "B",
                        "properties": {
                            "discr": { "const": "B", "type": "string" },
                            "b": { "type": "string" }
                        },
                        "required": ["discr", "b"]
                    }
                ]
            }
        },
        "required": ["step"]
    })
}

#[test]
fn round_trips_loaded_document() {
    let initial = json!({
        "name": "hello",
        "count": 3,
        "tags": ["a", "b"],
        "nested": { "flag": true }
    });
    let form = manager(
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "count": { "type": "integer" },
                "tags": { "type": "array", "items": { "type": "string" } },
                "nested": {
                    "type": "object",
                    "properties": { "flag": { "type": "boolean" } }
                }
            }
        }),
        Some(initial.clone()),
    );
    assert_eq!(form.form_data(), initial);
}

#[test]
fn tuple_pads_with_nulls() {
    let form = manager(
        json!({
            "type": "object",
            "properties": {
                "point": {
                    "type": "array",
                    "minItems": 3,
                    "maxItems": 3,
                    "prefixItems": [
                        { "type": "integer" },
                        { "type": "integer" },
                        { "type": "integer" }
                    ]
                }
            },
            "required": ["point"]
        }),
        None,
    );
    assert_eq!(form.form_data(), json!({ "point": [null, null, null] }));
}

#[test]
fn discriminator_round_trip() {
    let form = manager(
        discriminated_schema(),
        Some(json!({ "step": { "discr": "B", "b": "x" } })),
    );
    assert_eq!(form.form_data(), json!({ "step": { "discr": "B", "b": "x" } }));
    let NodeKind::Conditional(state) = &form.root().children()[0].kind else {
        panic!("expected a conditional node");
    };
    assert_eq!(state.selected_index, Some(1));
    assert!(form.is_valid());
}

#[test]
fn selecting_a_branch_loads_its_defaults() {
    let (calls, callback): (Rc<RefCell<Vec<Value>>>, ChangeCallback) = {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let inner = Rc::clone(&calls);
        (
            calls,
            Box::new(move |value: &Value, _| inner.borrow_mut().push(value.clone())),
        )
    };
    let mut form = FormManager::new(
        &discriminated_schema(),
        callback,
        SchemaVersion::PydanticV2,
        &[],
        Some(&json!({ "step": { "discr": "B", "b": "x" } })),
    )
    .unwrap();

    form.update(|root, ctx| root.children_mut()[0].select_branch(ctx, 0))
        .unwrap();
    assert_eq!(form.form_data(), json!({ "step": { "discr": "A", "a": null } }));
    assert_eq!(
        calls.borrow().last().unwrap(),
        &json!({ "step": { "discr": "A", "a": null } })
    );
}

#[test]
fn bad_input_yields_sentinel_and_invalidates() {
    let mut form = manager(
        json!({
            "type": "object",
            "properties": { "count": { "type": "integer" } },
            "required": ["count"]
        }),
        Some(json!({ "count": 5 })),
    );
    assert!(form.is_valid());

    form.update(|root, _| root.children_mut()[0].set_bad_input(true));
    assert_eq!(form.form_data(), json!({ "count": "invalid" }));
    assert!(!form.is_valid());

    form.update(|root, _| root.children_mut()[0].set_value(json!(7)));
    assert_eq!(form.form_data(), json!({ "count": 7 }));
    assert!(form.is_valid());
}

#[test]
fn add_property_failures_leave_tree_untouched() {
    let mut form = manager(
        json!({
            "type": "object",
            "properties": { "declared": { "type": "string" } },
            "additionalProperties": { "type": "string" }
        }),
        Some(json!({ "declared": "x", "extra": "y" })),
    );

    let err = form
        .update(|root, ctx| root.add_property(ctx, "extra"))
        .unwrap_err();
    assert!(err.to_string().contains("already has a property"));
    assert_eq!(form.root().children().len(), 2);

    let err = form.update(|root, ctx| root.add_property(ctx, "")).unwrap_err();
    assert!(err.to_string().contains("must not be empty"));

    form.update(|root, ctx| root.add_property(ctx, "fresh")).unwrap();
    assert_eq!(
        form.form_data(),
        json!({ "declared": "x", "extra": "y", "fresh": null })
    );
    let fresh = form.root().children().last().unwrap();
    assert!(fresh.removable);
    assert_eq!(fresh.title, "fresh");
}

#[test]
fn add_property_rejected_without_additional_properties() {
    let mut form = manager(
        json!({ "type": "object", "properties": { "a": { "type": "string" } } }),
        None,
    );
    let err = form.update(|root, ctx| root.add_property(ctx, "b")).unwrap_err();
    assert!(err.to_string().contains("does not accept additional properties"));
}

#[test]
fn reset_property_restores_default() {
    let mut form = manager(
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "default": "fallback" },
                "other": { "type": "string" }
            }
        }),
        Some(json!({ "name": "edited", "other": "kept" })),
    );

    assert!(form.update(|root, ctx| root.reset_property(ctx, 0)));
    assert_eq!(form.form_data(), json!({ "name": "fallback", "other": "kept" }));

    // No declared default: reset is a no-op.
    assert!(!form.update(|root, ctx| root.reset_property(ctx, 1)));
    assert_eq!(form.form_data(), json!({ "name": "fallback", "other": "kept" }));
}

#[test]
fn fix_invalid_property_rebuilds_from_schema() {
    let mut form = manager(
        json!({
            "type": "object",
            "properties": {
                "settings": {
                    "type": "object",
                    "properties": { "level": { "type": "integer", "default": 1 } }
                }
            }
        }),
        Some(json!({ "settings": "not-an-object" })),
    );
    assert!(matches!(
        form.root().children()[0].kind,
        NodeKind::Invalid { .. }
    ));
    assert_eq!(form.form_data(), json!({ "settings": "not-an-object" }));

    assert!(form.update(|root, ctx| root.fix_invalid_property(ctx, 0)));
    assert_eq!(form.form_data(), json!({ "settings": { "level": 1 } }));
}

#[test]
fn array_mutations_renumber_paths() {
    let mut form = manager(
        json!({
            "type": "object",
            "properties": {
                "items": { "type": "array", "items": { "type": "string" } }
            }
        }),
        Some(json!({ "items": ["a", "b", "c"] })),
    );

    form.update(|root, _| root.children_mut()[0].remove_item(1));
    assert_eq!(form.form_data(), json!({ "items": ["a", "c"] }));
    let array = &form.root().children()[0];
    assert_eq!(array.children()[0].path, "/items/0");
    assert_eq!(array.children()[1].path, "/items/1");

    form.update(|root, _| root.children_mut()[0].move_item_down(0));
    assert_eq!(form.form_data(), json!({ "items": ["c", "a"] }));

    // Boundary moves are no-ops.
    assert!(!form.update(|root, _| root.children_mut()[0].move_item_up(0)));
    assert!(!form.update(|root, _| root.children_mut()[0].move_item_down(1)));
}

#[test]
fn push_item_respects_max_items() {
    let mut form = manager(
        json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "maxItems": 2,
                    "items": { "type": "string", "default": "fresh" }
                }
            }
        }),
        Some(json!({ "items": ["a"] })),
    );

    assert!(form.update(|root, ctx| root.children_mut()[0].push_item(ctx)));
    assert_eq!(form.form_data(), json!({ "items": ["a", "fresh"] }));
    assert!(!form.update(|root, ctx| root.children_mut()[0].push_item(ctx)));
    assert_eq!(form.form_data(), json!({ "items": ["a", "fresh"] }));
}

#[test]
fn tuple_populate_and_clear() {
    let mut form = manager(
        json!({
            "type": "object",
            "properties": {
                "point": {
                    "type": "array",
                    "minItems": 2,
                    "maxItems": 2,
                    "default": [10, 20],
                    "prefixItems": [
                        { "type": "integer" },
                        { "type": "integer", "default": 99 }
                    ]
                }
            }
        }),
        Some(json!({ "other": 1 })),
    );
    assert_eq!(form.form_data()["point"], json!([]));

    // Position defaults win over the tuple's own default array.
    form.update(|root, ctx| root.children_mut()[0].populate_tuple(ctx));
    assert_eq!(form.form_data()["point"], json!([10, 99]));

    form.update(|root, _| root.children_mut()[0].clear_tuple());
    assert_eq!(form.form_data()["point"], json!([]));
}

#[test]
fn tuple_extra_position_can_be_removed() {
    let mut form = manager(
        json!({
            "type": "object",
            "properties": {
                "point": {
                    "type": "array",
                    "minItems": 2,
                    "maxItems": 2,
                    "prefixItems": [{ "type": "integer" }, { "type": "integer" }]
                }
            },
            "required": ["point"]
        }),
        Some(json!({ "point": [1, 2, "extra"] })),
    );
    assert_eq!(form.form_data()["point"], json!([1, 2, "extra"]));

    // The fixed positions are not removable through this operation.
    assert!(!form.update(|root, _| root.children_mut()[0].remove_extra_item(0)));
    assert!(form.update(|root, _| root.children_mut()[0].remove_extra_item(2)));
    assert_eq!(form.form_data()["point"], json!([1, 2]));
}

#[derive(Debug, Clone)]
enum ArrayOp {
    Push,
    Remove(usize),
    MoveUp(usize),
    MoveDown(usize),
}

fn array_op() -> impl Strategy<Value = ArrayOp> {
    prop_oneof![
        Just(ArrayOp::Push),
        (0usize..8).prop_map(ArrayOp::Remove),
        (0usize..8).prop_map(ArrayOp::MoveUp),
        (0usize..8).prop_map(ArrayOp::MoveDown),
    ]
}

proptest! {
    #[test]
    fn array_paths_stay_contiguous(ops in proptest::collection::vec(array_op(), 1..24)) {
        let mut form = manager(
            json!({
                "type": "object",
                "properties": {
                    "items": { "type": "array", "items": { "type": "string" } }
                }
            }),
            Some(json!({ "items": ["x", "y"] })),
        );
        for op in ops {
            form.update(|root, ctx| {
                let array = &mut root.children_mut()[0];
                match op {
                    ArrayOp::Push => {
                        array.push_item(ctx);
                    }
                    ArrayOp::Remove(i) => {
                        if i < array.children().len() {
                            array.remove_item(i);
                        }
                    }
                    ArrayOp::MoveUp(i) => {
                        array.move_item_up(i);
                    }
                    ArrayOp::MoveDown(i) => {
                        array.move_item_down(i);
                    }
                }
            });
            let array = &form.root().children()[0];
            for (index, child) in array.children().iter().enumerate() {
                prop_assert_eq!(child.path.clone(), format!("/items/{index}"));
            }
        }
    }
}
