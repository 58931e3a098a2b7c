use std::env;
use std::error::Error;
use std::fs;
use std::path::Path;

use bridge_runtime::{ActionResult, GameState, HealthReport, LegalActionSet};
use jsonschema::JSONSchema;
use schemars::schema_for;
use serde_json::Value as JsonValue;

const SCHEMA_DIR: &str = "schemas";

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("schemas") => write_schemas(),
        Some("validate") => {
            let Some(pattern) = args.next() else {
                print_usage();
                std::process::exit(1);
            };
            let kind = args.next().unwrap_or_else(|| "state".to_string());
            validate(&kind, &pattern)
        }
        Some("help") | None => {
            print_usage();
            Ok(())
        }
        Some(cmd) => {
            eprintln!("Unknown xtask '{cmd}'.");
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("Usage: cargo xtask schemas");
    eprintln!("       cargo xtask validate <glob> [state|legal|action_result|health]");
    eprintln!("       cargo xtask help");
}

fn schema(kind: &str) -> Option<JsonValue> {
    let schema = match kind {
        "state" => schema_for!(GameState),
        "legal" => schema_for!(LegalActionSet),
        "action_result" => schema_for!(ActionResult),
        "health" => schema_for!(HealthReport),
        _ => return None,
    };
    serde_json::to_value(schema).ok()
}

fn write_schemas() -> Result<(), Box<dyn Error>> {
    let dir = Path::new(SCHEMA_DIR);
    fs::create_dir_all(dir)?;
    for kind in ["state", "legal", "action_result", "health"] {
        let schema = schema(kind).ok_or_else(|| format!("no schema for {kind}"))?;
        let path = dir.join(format!("{kind}.schema.json"));
        fs::write(&path, serde_json::to_string_pretty(&schema)?)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

/// Check captured bridge documents against the generated schema.
fn validate(kind: &str, pattern: &str) -> Result<(), Box<dyn Error>> {
    let schema = schema(kind).ok_or_else(|| format!("unknown document kind '{kind}'"))?;
    let compiled = JSONSchema::compile(&schema).map_err(|err| format!("invalid schema: {err}"))?;

    let mut checked = 0usize;
    let mut failures = 0usize;
    for entry in glob::glob(pattern)? {
        let path = entry?;
        let document: JsonValue = serde_json::from_str(&fs::read_to_string(&path)?)?;
        checked += 1;
        if let Err(errors) = compiled.validate(&document) {
            failures += 1;
            for error in errors {
                eprintln!("{}: {} at {}", path.display(), error, error.instance_path);
            }
        };
    }

    println!("Validated {checked} document(s), {failures} failed");
    if failures > 0 {
        return Err(format!("{failures} document(s) failed {kind} validation").into());
    }
    Ok(())
}
