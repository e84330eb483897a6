use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "schemaform", version, about = "JSON Schema form engine CLI")]
pub struct Cli {
    /// Emit JSON output on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Schema dialect: pydantic_v1 or pydantic_v2.
    #[arg(long, global = true, default_value = "pydantic_v2")]
    pub schema_version: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Normalize a schema: resolve $ref, merge allOf, rewrite discriminators.
    Normalize {
        /// Schema JSON file.
        schema: String,

        /// Top-level properties to drop (repeatable).
        #[arg(long = "ignore")]
        ignore: Vec<String>,

        /// Also strip discriminators next to oneOf (validator view).
        #[arg(long)]
        validator_view: bool,

        /// Output file (stdout if omitted).
        #[arg(long)]
        out: Option<String>,
    },

    /// Resolve the initial document value a form would load.
    Defaults {
        /// Schema JSON file.
        schema: String,

        /// Optional initial value JSON file; absent means load defaults.
        #[arg(long)]
        data: Option<String>,

        /// Top-level properties to drop (repeatable).
        #[arg(long = "ignore")]
        ignore: Vec<String>,
    },

    /// Build a form for a value and report validation errors per node.
    Validate {
        /// Schema JSON file.
        schema: String,

        /// Value JSON file.
        data: String,

        /// Top-level properties to drop (repeatable).
        #[arg(long = "ignore")]
        ignore: Vec<String>,
    },
}
