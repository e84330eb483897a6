//! Error types for schemaform-core.
//!
//! The engine distinguishes construction-fatal failures (unparseable schema,
//! unresolvable reference) from everything else. Structural mismatches in the
//! data never surface here: they become `Invalid` nodes in the form tree and
//! stay user-repairable. Semantic validation failures are reported per node
//! through the error mapper, not through this type.

use thiserror::Error;

/// Convenience alias used across the crate.
pub type SchemaFormResult<T> = Result<T, SchemaFormError>;

/// Errors produced by the schemaform engine.
#[derive(Debug, Error)]
pub enum SchemaFormError {
    /// A caller-supplied argument is unusable (empty key, duplicate key,
    /// out-of-range branch index, unknown version string, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A `$ref` could not be resolved against the schema document.
    #[error("unresolvable reference: {0}")]
    UnresolvableReference(String),

    /// The structural validator refused the normalized schema.
    /// This aborts form construction entirely.
    #[error("invalid schema: {0}")]
    Schema(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A mutation was requested on a node that does not support it.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl SchemaFormError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn unresolvable_reference(msg: impl Into<String>) -> Self {
        Self::UnresolvableReference(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }
}
