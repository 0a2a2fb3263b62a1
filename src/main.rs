use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jsonv::{validate_document, Schema};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(about, version, name = "jsonv")]
/// Validate JSON documents against marker-key schemas
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a JSON file against a schema
    Validate {
        /// Assume linewise JSON and test the schema on each line
        #[arg(short = 'l', long = "jsonl")]
        jsonl: bool,
        /// Path of the schema document
        schema: PathBuf,
        /// Path of the JSON file to validate
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    match Args::parse().command {
        Command::Validate {
            jsonl,
            schema,
            file,
        } => {
            let schema = load_schema(&schema)?;
            if jsonl {
                validate_lines(&schema, &file)
            } else {
                let raw = fs::read_to_string(&file)
                    .with_context(|| format!("reading {}", file.display()))?;
                validate_document(&schema, &raw)
                    .with_context(|| format!("{}", file.display()))
            }
        }
    }
}

fn load_schema(path: &Path) -> Result<Schema> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    Schema::from_value(&value).with_context(|| format!("compiling {}", path.display()))
}

fn validate_lines(schema: &Schema, path: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("reading {}", path.display()))?;

    // Each line is its own document; stop at the first failing one.
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        validate_document(schema, &line)
            .with_context(|| format!("{}:{}", path.display(), i + 1))?;
    }

    Ok(())
}
