//! Structured output of variables and configuration.
//!
//! Both are written as pretty JSON (two-space indent, trailing newline).
//! Payloads JSON cannot represent, such as maps with non-string keys, fall
//! back to YAML.

use std::io::Write;

use serde::Serialize;

use crate::error::{Error, Result};

/// Serializes `value` as pretty JSON, or YAML when JSON encoding fails.
pub fn save<T: Serialize, W: Write>(value: &T, mut writer: W) -> Result<()> {
    let text = match serde_json::to_string_pretty(value) {
        Ok(json) => json + "\n",
        Err(_) => serde_yaml::to_string(value)?,
    };
    writer
        .write_all(text.as_bytes())
        .map_err(|e| Error::io("<output>", e))
}
