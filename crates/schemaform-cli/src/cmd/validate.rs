use anyhow::{bail, Result};
use schemaform_core::prelude::{ChangeCallback, FormManager, FormNode, SchemaVersion};
use serde::Serialize;

use crate::cmd::read_json;
use crate::output;

#[derive(Debug, Serialize)]
struct ValidateOut {
    valid: bool,
    errors: Vec<NodeErrors>,
    generic_errors: Vec<String>,
}

#[derive(Debug, Serialize)]
struct NodeErrors {
    path: String,
    messages: Vec<String>,
}

pub fn run(schema_path: &str, data_path: &str, ignore: &[String], version: SchemaVersion) -> Result<()> {
    let schema = read_json(schema_path)?;
    let data = read_json(data_path)?;

    let callback: ChangeCallback = Box::new(|_, _| {});
    let form = FormManager::new(&schema, callback, version, ignore, Some(&data))?;

    let mut errors = Vec::new();
    collect_errors(form.root(), &mut errors);
    let report = ValidateOut {
        valid: form.is_valid(),
        errors,
        generic_errors: form
            .generic_errors()
            .iter()
            .map(|e| format!("{}: {}", e.instance_path, e.message))
            .collect(),
    };

    if output::is_json() {
        output::print(&report)?;
    } else if report.valid {
        output::print_ok(&format!("{data_path} conforms to {schema_path}"))?;
    } else {
        for node in &report.errors {
            let location = if node.path.is_empty() { "<root>" } else { node.path.as_str() };
            for message in &node.messages {
                output::print_error_line(location, message)?;
            }
        }
        for message in &report.generic_errors {
            output::print_error_line("<unattached>", message)?;
        }
    }

    if !report.valid {
        bail!("validation failed");
    }
    Ok(())
}

fn collect_errors(node: &FormNode, out: &mut Vec<NodeErrors>) {
    if !node.errors.is_empty() {
        out.push(NodeErrors {
            path: node.path.clone(),
            messages: node.errors.clone(),
        });
    }
    for child in node.children() {
        collect_errors(child, out);
    }
}
