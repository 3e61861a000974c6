//! Argument helpers for the `name=value` command forms.

use crate::error::{CliError, Result};
use serde_json::Value;

/// Separator between name and value in set-style arguments.
pub const SPLIT_SYM: char = '=';

/// Split a `name=value` argument.
pub fn split_assignment(assignment: &str) -> Result<(&str, &str)> {
    match assignment.split_once(SPLIT_SYM) {
        Some((name, value)) if !name.is_empty() => Ok((name, value)),
        _ => Err(CliError::Assignment(assignment.to_string())),
    }
}

/// Infer the type of a raw preference value: `true`/`false` become booleans,
/// integer strings become integers, everything else stays a string.
pub fn infer_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => match raw.parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::from(raw),
        },
    }
}

/// Render a JSON value the way the shell printed it to the user: strings
/// without quotes, everything else as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
