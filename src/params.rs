//! Render tool parameter maps into command-line flag strings
//!
//! The orchestrator sends parameters keyed by human-readable name with string
//! values. Each adapter owns a table mapping CLI flags to those names; flags
//! are emitted in sorted order so generated commands are deterministic.

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("Missing value for parameter: {0}")]
    Missing(String),
}

/// Format parameters through a (flag, parameter name) table.
///
/// Single-character flags get one dash, longer flags two. A `"True"` value
/// emits the bare flag, `"False"` and `"default"` (and empty) values are
/// skipped, anything else is emitted as `flag value`. Every name in the table
/// must be present in the parameter map.
pub fn format_params(
    parameters: &BTreeMap<String, String>,
    table: &[(&str, &str)],
) -> Result<String, ParamError> {
    let mut table: Vec<(&str, &str)> = table.to_vec();
    table.sort_unstable_by_key(|(flag, _)| *flag);

    let mut parts: Vec<String> = Vec::new();
    for (flag, name) in table {
        let value = parameters
            .get(name)
            .ok_or_else(|| ParamError::Missing(name.to_string()))?;
        let dash = if flag.len() == 1 { "-" } else { "--" };
        match value.as_str() {
            "True" => parts.push(format!("{dash}{flag}")),
            "False" | "default" | "" => {}
            v => parts.push(format!("{dash}{flag} {v}")),
        }
    }

    Ok(parts.join(" "))
}

/// Format parameters whose names already are the long CLI flags (KneadData).
pub fn format_flag_params(parameters: &BTreeMap<String, String>) -> String {
    let mut parts: Vec<String> = Vec::new();
    for (flag, value) in parameters {
        match value.as_str() {
            "True" => parts.push(format!("--{flag}")),
            "False" | "default" | "" => {}
            v => parts.push(format!("--{flag} {v}")),
        }
    }
    parts.join(" ")
}
