//! Schema version helpers.
//!
//! Pydantic emits two flavors of JSON Schema. They differ in how fixed-size
//! heterogeneous sequences (tuples) are spelled: v1 puts the per-position
//! schemas in an `items` array (Draft 7 style), v2 uses the `prefixItems`
//! keyword (Draft 2020-12). The flag also selects which draft the structural
//! validator runs.

use crate::errors::{SchemaFormError, SchemaFormResult};

/// The schema dialect a form is built against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// Pydantic v1 output: Draft 7, tuples via an `items` array.
    PydanticV1,
    /// Pydantic v2 output: Draft 2020-12, tuples via `prefixItems`.
    PydanticV2,
}

impl SchemaVersion {
    /// Parse a schema version string (e.g. "pydantic_v2").
    pub fn parse(s: &str) -> SchemaFormResult<Self> {
        match s {
            "pydantic_v1" => Ok(Self::PydanticV1),
            "pydantic_v2" => Ok(Self::PydanticV2),
            _ => Err(SchemaFormError::invalid_argument(format!(
                "unsupported schema version: {s}"
            ))),
        }
    }

    /// Return the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PydanticV1 => "pydantic_v1",
            Self::PydanticV2 => "pydantic_v2",
        }
    }
}
