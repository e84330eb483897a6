//! Form orchestration.
//!
//! [`FormManager`] ties the pieces together: it normalizes the schema, loads
//! the validator, resolves the initial document value, builds the tree, and
//! owns the change cycle. Every mutation goes through [`FormManager::update`],
//! which re-derives the value, re-validates, and invokes the change callback
//! exactly once. The callback must not mutate the same form re-entrantly.

use serde_json::Value;

use crate::adapter::{normalize_schema, strip_discriminator};
use crate::builder::{build_root, BuildContext};
use crate::element::FormNode;
use crate::errors::{SchemaFormError, SchemaFormResult};
use crate::form_errors::apply_errors;
use crate::initial_data::resolve_document_value;
use crate::sanitize::strip_null_and_empty;
use crate::validation::{ErrorRecord, JsonSchemaValidator, SchemaValidator};
use crate::version::SchemaVersion;

/// Invoked after construction and after every mutation with the freshly
/// derived value and its validity.
pub type ChangeCallback = Box<dyn FnMut(&Value, bool)>;

pub struct FormManager {
    schema: Value,
    ctx: BuildContext,
    validator: Box<dyn SchemaValidator>,
    root: FormNode,
    on_change: ChangeCallback,
    generic_errors: Vec<ErrorRecord>,
    valid: bool,
}

impl std::fmt::Debug for FormManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormManager")
            .field("schema", &self.schema)
            .field("generic_errors", &self.generic_errors)
            .field("valid", &self.valid)
            .finish_non_exhaustive()
    }
}

impl FormManager {
    /// Build a form over the production validator.
    pub fn new(
        schema: &Value,
        on_change: ChangeCallback,
        version: SchemaVersion,
        ignored: &[String],
        initial: Option<&Value>,
    ) -> SchemaFormResult<Self> {
        let validator = Box::new(JsonSchemaValidator::new(version));
        Self::with_validator(schema, on_change, version, ignored, initial, validator)
    }

    /// Build a form over a caller-supplied validator.
    pub fn with_validator(
        schema: &Value,
        on_change: ChangeCallback,
        version: SchemaVersion,
        ignored: &[String],
        initial: Option<&Value>,
        mut validator: Box<dyn SchemaValidator>,
    ) -> SchemaFormResult<Self> {
        let normalized = normalize_schema(schema, ignored)?;
        // The validator sees the schema without discriminators: branch
        // selection belongs to the tree, not to the validator.
        if !validator.load_schema(&strip_discriminator(&normalized)) {
            return Err(SchemaFormError::schema(
                "schema rejected by the structural validator",
            ));
        }

        let ctx = BuildContext { version };
        let value = resolve_document_value(&normalized, version, initial);
        let root = build_root(&ctx, &normalized, &value);

        let mut manager = Self {
            schema: normalized,
            ctx,
            validator,
            root,
            on_change,
            generic_errors: Vec::new(),
            valid: false,
        };
        manager.notify_change();
        Ok(manager)
    }

    /// The normalized schema this form was built from.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    pub fn root(&self) -> &FormNode {
        &self.root
    }

    /// Validity as of the last validation pass.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Errors from the last validation pass that matched no node.
    pub fn generic_errors(&self) -> &[ErrorRecord] {
        &self.generic_errors
    }

    /// Re-derive the plain JSON value currently held by the form.
    pub fn form_data(&self) -> Value {
        self.root.derive_value()
    }

    /// Run a mutation against the tree, then re-derive, re-validate and
    /// notify. This is the single entry point for editing.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut FormNode, &BuildContext) -> R) -> R {
        let ctx = self.ctx;
        let result = f(&mut self.root, &ctx);
        self.notify_change();
        result
    }

    /// Validate the current value, refreshing per-node error state.
    pub fn validate(&mut self) -> bool {
        self.root.clear_errors_deep();
        self.generic_errors.clear();
        let stripped = strip_null_and_empty(&self.form_data());
        self.valid = self.validator.is_valid(&stripped);
        if !self.valid {
            let errors = self.validator.errors().to_vec();
            self.generic_errors = apply_errors(&mut self.root, &errors);
        }
        self.valid
    }

    fn notify_change(&mut self) {
        let valid = self.validate();
        let data = self.form_data();
        (self.on_change)(&data, valid);
    }
}
