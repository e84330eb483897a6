use anyhow::Result;
use schemaform_core::prelude::{normalize_schema, resolve_document_value, SchemaVersion};

use crate::cmd::read_json;

pub fn run(
    schema_path: &str,
    data_path: Option<&str>,
    ignore: &[String],
    version: SchemaVersion,
) -> Result<()> {
    let schema = read_json(schema_path)?;
    let normalized = normalize_schema(&schema, ignore)?;
    let initial = data_path.map(read_json).transpose()?;
    let value = resolve_document_value(&normalized, version, initial.as_ref());
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
