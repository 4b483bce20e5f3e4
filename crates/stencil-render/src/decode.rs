//! Cascading decoding of untyped payloads into a value tree.
//!
//! Variable files and piped stdin carry no format marker. The decoder tries
//! each supported format in a fixed order and keeps the first one that yields
//! a top-level mapping:
//!
//! | Order | Format | Accepts |
//! |-------|--------|---------|
//! | 1 | JSON | an object |
//! | 2 | YAML | a mapping (an empty document counts as an empty mapping) |
//! | 3 | TOML | a table |
//!
//! The order matters for ambiguous payloads: `{"a": 1}` is valid YAML too,
//! but JSON wins. When every format fails, the TOML failure is reported.
//!
//! YAML allows arbitrary keys, so decoded YAML goes through a normalization
//! walk before it is handed out: integer keys become their decimal string,
//! string keys are kept and any other key is dropped. TOML datetimes become
//! strings. Non-finite floats (which JSON cannot carry) become `null`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, FormatError, Result};

/// String-keyed mapping at the root of every decoded payload.
pub type Map = serde_json::Map<String, Value>;

/// A supported payload format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Yaml,
    Toml,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Json => write!(f, "JSON"),
            Format::Yaml => write!(f, "YAML"),
            Format::Toml => write!(f, "TOML"),
        }
    }
}

type Parser = fn(&[u8]) -> std::result::Result<Map, FormatError>;

/// Formats in trial order.
const CASCADE: &[(Format, Parser)] = &[
    (Format::Json, parse_json),
    (Format::Yaml, parse_yaml),
    (Format::Toml, parse_toml),
];

/// Decodes a payload into a string-keyed mapping.
pub fn decode(bytes: &[u8]) -> Result<Map> {
    decode_from(bytes, "payload").map(|(_, map)| map)
}

/// Decodes a payload, reporting which format accepted it.
///
/// `origin` names the payload (a path, `stdin`) in the error message.
pub fn decode_from(bytes: &[u8], origin: &str) -> Result<(Format, Map)> {
    let mut last = None;
    for (format, parse) in CASCADE {
        match parse(bytes) {
            Ok(map) => return Ok((*format, map)),
            Err(err) => last = Some((*format, err)),
        }
    }
    let (format, source) = last.unwrap_or((Format::Toml, FormatError::NotAMapping));
    Err(Error::Decode {
        origin: origin.to_string(),
        format,
        source,
    })
}

fn parse_json(bytes: &[u8]) -> std::result::Result<Map, FormatError> {
    Ok(serde_json::from_slice(bytes)?)
}

fn parse_yaml(bytes: &[u8]) -> std::result::Result<Map, FormatError> {
    match serde_yaml::from_slice::<serde_yaml::Value>(bytes)? {
        serde_yaml::Value::Null => Ok(Map::new()),
        serde_yaml::Value::Mapping(mapping) => Ok(normalize_mapping(mapping)),
        serde_yaml::Value::Tagged(tagged) => match normalize_yaml(tagged.value) {
            Value::Object(map) => Ok(map),
            _ => Err(FormatError::NotAMapping),
        },
        _ => Err(FormatError::NotAMapping),
    }
}

fn parse_toml(bytes: &[u8]) -> std::result::Result<Map, FormatError> {
    let text = std::str::from_utf8(bytes)?;
    let table: toml::Table = toml::from_str(text)?;
    Ok(table
        .into_iter()
        .map(|(key, value)| (key, from_toml(value)))
        .collect())
}

/// Converts a YAML value into the canonical value tree.
pub fn normalize_yaml(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64().map(float).unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => {
            Value::Array(seq.into_iter().map(normalize_yaml).collect())
        }
        serde_yaml::Value::Mapping(mapping) => Value::Object(normalize_mapping(mapping)),
        serde_yaml::Value::Tagged(tagged) => normalize_yaml(tagged.value),
    }
}

fn normalize_mapping(mapping: serde_yaml::Mapping) -> Map {
    let mut map = Map::new();
    for (key, value) in mapping {
        let key = match key {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
            // Keys that have no string form are dropped.
            _ => continue,
        };
        map.insert(key, normalize_yaml(value));
    }
    map
}

pub(crate) fn from_toml(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => float(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(from_toml).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, from_toml(value)))
                .collect(),
        ),
    }
}

fn float(f: f64) -> Value {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
