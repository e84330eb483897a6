use std::fs;

use anyhow::{Context, Result};
use schemaform_core::prelude::{normalize_schema, strip_discriminator};

use crate::cmd::read_json;

pub fn run(schema_path: &str, ignore: &[String], validator_view: bool, out: Option<&str>) -> Result<()> {
    let schema = read_json(schema_path)?;
    let mut normalized = normalize_schema(&schema, ignore)?;
    if validator_view {
        normalized = strip_discriminator(&normalized);
    }
    let rendered = serde_json::to_string_pretty(&normalized)?;
    match out {
        Some(path) => {
            fs::write(path, rendered).with_context(|| format!("failed to write {path}"))?;
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
