use crate::error::{CliError, Result};
use halgren::engine::config::NonbondedConfig;
use std::path::Path;
use toml::{Table, Value};
use tracing::debug;

/// Builds the engine configuration from an optional file, `--set` overrides
/// and the global thread count, in increasing order of precedence.
///
/// Overrides are merged into the TOML table before deserialization, so every
/// key the file accepts can also be set on the command line and unknown keys
/// are rejected the same way.
pub fn resolve(path: Option<&Path>, set_values: &[String], threads: Option<usize>) -> Result<NonbondedConfig> {
    let mut table = match path {
        Some(path) => {
            debug!("Loading configuration from file: {:?}", path);
            let content = std::fs::read_to_string(path)?;
            content.parse::<Table>().map_err(|e| CliError::FileParsing {
                path: path.to_path_buf(),
                source: e.into(),
            })?
        }
        None => Table::new(),
    };
    apply_set_values(&mut table, set_values)?;
    if let Some(threads) = threads {
        table.insert("threads".to_string(), Value::Integer(threads as i64));
    }

    let origin = path.map_or_else(|| "command line".to_string(), |p| p.display().to_string());
    let content = toml::to_string(&table).map_err(|e| CliError::Config(e.to_string()))?;
    NonbondedConfig::parse(&content, &origin).map_err(|e| CliError::Config(e.to_string()))
}

fn apply_set_values(table: &mut Table, set_values: &[String]) -> Result<()> {
    for kv_pair in set_values {
        let Some((key, value)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{kv_pair}'. Expected KEY=VALUE."
            )));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::Config(format!("Empty key in --set '{kv_pair}'.")));
        }
        debug!(key, value, "Applying configuration override.");
        table.insert(key.to_string(), parse_value(value.trim()));
    }
    Ok(())
}

/// Interprets `raw` as a TOML value, falling back to a plain string.
fn parse_value(raw: &str) -> Value {
    format!("v = {raw}")
        .parse::<Table>()
        .ok()
        .and_then(|mut t| t.remove("v"))
        .unwrap_or_else(|| Value::String(raw.to_string()))
}
