use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use schemaform_core::prelude::SchemaVersion;
use serde_json::Value;

use crate::args::{Cli, Command};

mod defaults;
mod normalize;
mod validate;

pub fn dispatch(cli: Cli) -> Result<()> {
    let version = SchemaVersion::parse(&cli.schema_version)?;
    match cli.command {
        Command::Normalize {
            schema,
            ignore,
            validator_view,
            out,
        } => normalize::run(&schema, &ignore, validator_view, out.as_deref()),
        Command::Defaults {
            schema,
            data,
            ignore,
        } => defaults::run(&schema, data.as_deref(), &ignore, version),
        Command::Validate {
            schema,
            data,
            ignore,
        } => validate::run(&schema, &data, &ignore, version),
    }
}

pub(crate) fn read_json(path: &str) -> Result<Value> {
    tracing::debug!(path, "reading JSON input");
    let raw = fs::read_to_string(Path::new(path))
        .with_context(|| format!("failed to read {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {path} as JSON"))
}
