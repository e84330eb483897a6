//! Structural validation boundary.
//!
//! The engine treats the JSON-Schema validator as an opaque component: it
//! loads a schema, answers valid/invalid for a value, and hands back a list
//! of [`ErrorRecord`]s. The production implementation wraps the `jsonschema`
//! crate, selecting the draft from the schema version, and normalizes its
//! error kinds into the record shape the error mapper consumes: an instance
//! path into the value, a schema path for `oneOf` disambiguation, a
//! canonical message, and structured parameters for missing or extra
//! properties.

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, Validator};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::version::SchemaVersion;

/// One structural validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    /// JSON pointer into the validated value ("" for the root).
    pub instance_path: String,
    /// JSON pointer into the schema, used only to disambiguate which
    /// `oneOf` branch an error belongs to.
    pub schema_path: String,
    /// Human-readable message.
    pub message: String,
    /// Structured parameters, when the failure names a specific property.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<ErrorParams>,
}

/// Structured parameters carried by property-level failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_property: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_property: Option<String>,
}

/// The opaque validator the form manager drives.
pub trait SchemaValidator {
    /// Load a schema document. Returns false when the schema itself is
    /// rejected, which aborts form construction.
    fn load_schema(&mut self, schema: &Value) -> bool;

    /// Validate a value against the loaded schema, replacing the stored
    /// error list.
    fn is_valid(&mut self, value: &Value) -> bool;

    /// Errors recorded by the last [`SchemaValidator::is_valid`] call.
    fn errors(&self) -> &[ErrorRecord];
}

/// Production validator backed by the `jsonschema` crate.
pub struct JsonSchemaValidator {
    draft: Draft,
    validator: Option<Validator>,
    errors: Vec<ErrorRecord>,
}

impl JsonSchemaValidator {
    pub fn new(version: SchemaVersion) -> Self {
        let draft = match version {
            SchemaVersion::PydanticV1 => Draft::Draft7,
            SchemaVersion::PydanticV2 => Draft::Draft202012,
        };
        Self {
            draft,
            validator: None,
            errors: Vec::new(),
        }
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn load_schema(&mut self, schema: &Value) -> bool {
        match jsonschema::options().with_draft(self.draft).build(schema) {
            Ok(validator) => {
                self.validator = Some(validator);
                self.errors.clear();
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "schema rejected by validator");
                self.validator = None;
                false
            }
        }
    }

    fn is_valid(&mut self, value: &Value) -> bool {
        let Some(validator) = &self.validator else {
            self.errors.clear();
            return true;
        };
        self.errors = validator.iter_errors(value).flat_map(to_records).collect();
        self.errors.is_empty()
    }

    fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }
}

/// Normalize one `jsonschema` error into record form. An
/// additional-properties failure expands into one record per extra key so
/// each can attach to its own node.
fn to_records(err: jsonschema::ValidationError<'_>) -> Vec<ErrorRecord> {
    let instance_path = err.instance_path.to_string();
    let schema_path = err.schema_path.to_string();
    let record = |message: String, params: ErrorParams| ErrorRecord {
        instance_path: instance_path.clone(),
        schema_path: schema_path.clone(),
        message,
        params: Some(params),
    };

    match &err.kind {
        ValidationErrorKind::Required { property } => {
            let name = property.as_str().map(str::to_string).unwrap_or_else(|| property.to_string());
            vec![record(
                format!("must have required property '{name}'"),
                ErrorParams {
                    missing_property: Some(name.clone()),
                    ..ErrorParams::default()
                },
            )]
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => unexpected
            .iter()
            .map(|name| {
                record(
                    "must NOT have additional properties".to_string(),
                    ErrorParams {
                        additional_property: Some(name.clone()),
                        ..ErrorParams::default()
                    },
                )
            })
            .collect(),
        ValidationErrorKind::OneOfNotValid { .. } | ValidationErrorKind::OneOfMultipleValid { .. } => {
            vec![record(
                "must match exactly one schema in oneOf".to_string(),
                ErrorParams::default(),
            )]
        }
        ValidationErrorKind::MaxItems { limit } => vec![record(
            format!("must NOT have more than {limit} items"),
            ErrorParams::default(),
        )],
        ValidationErrorKind::MinItems { limit } => vec![record(
            format!("must NOT have fewer than {limit} items"),
            ErrorParams::default(),
        )],
        ValidationErrorKind::Type { kind } => {
            let expected = match kind {
                jsonschema::error::TypeKind::Single(t) => t.to_string(),
                jsonschema::error::TypeKind::Multiple(types) => (*types)
                    .into_iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            };
            vec![record(format!("must be {expected}"), ErrorParams::default())]
        }
        _ => vec![record(err.to_string(), ErrorParams::default())],
    }
}
