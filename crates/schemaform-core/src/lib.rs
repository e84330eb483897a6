//! schemaform-core
//!
//! Core engine for JSON-Schema-driven dynamic forms:
//! - Schema normalization ($ref resolution, allOf merge, discriminator rewrite)
//! - Initial value resolution (defaults, array padding, tuple filling)
//! - The mutable form node tree and its editing operations
//! - Form orchestration with a structural validation cycle
//! - Mapping of validator errors onto the owning tree nodes

pub mod adapter;
pub mod builder;
pub mod element;
pub mod errors;
pub mod form_errors;
pub mod initial_data;
pub mod manager;
pub mod property;
pub mod sanitize;
pub mod validation;
pub mod version;

pub use crate::errors::{SchemaFormError, SchemaFormResult};

/// Convenience re-exports.
pub mod prelude {
    pub use crate::adapter::{normalize_schema, strip_discriminator};
    pub use crate::builder::{build_node, build_root, BuildContext};
    pub use crate::element::{ConditionalState, Discriminator, FormNode, NodeKind};
    pub use crate::initial_data::{resolve_document_value, resolve_property_value};
    pub use crate::manager::{ChangeCallback, FormManager};
    pub use crate::sanitize::strip_null_and_empty;
    pub use crate::validation::{ErrorParams, ErrorRecord, JsonSchemaValidator, SchemaValidator};
    pub use crate::version::SchemaVersion;
    pub use crate::{SchemaFormError, SchemaFormResult};
}
