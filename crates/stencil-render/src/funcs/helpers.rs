//! Engine helpers: payload conversion, map updates and file selection.
//!
//! The `from*` decoders produce the same value trees as variable files do,
//! so `fromYAML` drops keys without a string form just like a YAML vars
//! file would.

use std::collections::BTreeMap;

use minijinja::value::{from_args, Rest, Value, ValueKind};

use super::dict::Dict;
use super::{entries, invalid, items, native, text, NativeFn};
use crate::decode;
use crate::files;

type FnResult = Result<Value, minijinja::Error>;

pub(crate) fn functions() -> Vec<(&'static str, NativeFn)> {
    vec![
        ("toCSV", native(to_csv)),
        ("fromCSV", native(from_csv)),
        ("toJSON", native(to_json)),
        ("toYAML", native(to_yaml)),
        ("toTOML", native(to_toml)),
        ("fromJSON", native(from_json)),
        ("fromYAML", native(from_yaml)),
        ("fromTOML", native(from_toml)),
        ("set", native(set)),
        ("unset", native(unset)),
        ("glob", native(glob)),
    ]
}

fn single(args: &[Value]) -> Result<Value, minijinja::Error> {
    let (value,): (Value,) = from_args(args)?;
    Ok(value)
}

/// `toCSV(record)` or `toCSV(records)`.
fn to_csv(args: &[Value]) -> FnResult {
    let value = single(args)?;
    let rows = items(&value)?;
    let records: Vec<Vec<String>> = if rows.iter().all(|row| row.kind() == ValueKind::Seq) {
        rows.iter()
            .map(|row| -> Result<Vec<String>, minijinja::Error> {
                Ok(items(row)?.iter().map(text).collect())
            })
            .collect::<Result<_, _>>()?
    } else if rows.iter().all(|cell| cell.kind() == ValueKind::String) {
        vec![rows.iter().map(text).collect()]
    } else {
        return Err(invalid(
            "toCSV expects a list of strings or a list of lists of strings",
        ));
    };

    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in &records {
        wtr.write_record(record)
            .map_err(|e| invalid(format!("toCSV: {e}")))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| invalid(format!("toCSV: {e}")))?;
    Ok(Value::from(String::from_utf8_lossy(&bytes).into_owned()))
}

/// `fromCSV(text)`: all records as lists of strings. Every record must have
/// the same number of fields.
fn from_csv(args: &[Value]) -> FnResult {
    let source = text(&single(args)?);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(source.as_bytes());
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| invalid(format!("fromCSV: {e}")))?;
        records.push(Value::from(
            record.iter().map(Value::from).collect::<Vec<_>>(),
        ));
    }
    Ok(Value::from(records))
}

fn to_json(args: &[Value]) -> FnResult {
    serde_json::to_string(&single(args)?)
        .map(Value::from)
        .map_err(|e| invalid(format!("toJSON: {e}")))
}

fn to_yaml(args: &[Value]) -> FnResult {
    serde_yaml::to_string(&single(args)?)
        .map(Value::from)
        .map_err(|e| invalid(format!("toYAML: {e}")))
}

fn to_toml(args: &[Value]) -> FnResult {
    let value = single(args)?;
    if value.kind() != ValueKind::Map {
        return Err(invalid("toTOML expects a map"));
    }
    toml::to_string(&value)
        .map(Value::from)
        .map_err(|e| invalid(format!("toTOML: {e}")))
}

fn from_json(args: &[Value]) -> FnResult {
    let parsed: serde_json::Value = serde_json::from_str(&text(&single(args)?))
        .map_err(|e| invalid(format!("fromJSON: {e}")))?;
    Ok(Value::from_serialize(&parsed))
}

fn from_yaml(args: &[Value]) -> FnResult {
    let parsed: serde_yaml::Value = serde_yaml::from_str(&text(&single(args)?))
        .map_err(|e| invalid(format!("fromYAML: {e}")))?;
    Ok(Value::from_serialize(decode::normalize_yaml(parsed)))
}

fn from_toml(args: &[Value]) -> FnResult {
    let table: toml::Table = toml::from_str(&text(&single(args)?))
        .map_err(|e| invalid(format!("fromTOML: {e}")))?;
    Ok(Value::from_serialize(decode::from_toml(toml::Value::Table(
        table,
    ))))
}

/// The [`Dict`] behind `map`, or a new one holding its entries when `map`
/// is an immutable mapping.
fn mutable(map: Value) -> Result<Value, minijinja::Error> {
    if map.downcast_object_ref::<Dict>().is_some() {
        Ok(map)
    } else {
        Ok(Dict::value(entries(&map)?))
    }
}

/// `set(map, key, value, ...)`: applies the pairs to `map` and returns it.
fn set(args: &[Value]) -> FnResult {
    let (map, Rest(pairs)): (Value, Rest<Value>) = from_args(args)?;
    if pairs.len() % 2 != 0 {
        return Err(invalid("set expects key/value pairs"));
    }
    let map = mutable(map)?;
    if let Some(dict) = map.downcast_object_ref::<Dict>() {
        for pair in pairs.chunks(2) {
            dict.insert(text(&pair[0]), pair[1].clone());
        }
    }
    Ok(map)
}

/// `unset(map, key...)`: removes the keys from `map` and returns it.
fn unset(args: &[Value]) -> FnResult {
    let (map, Rest(keys)): (Value, Rest<Value>) = from_args(args)?;
    let map = mutable(map)?;
    if let Some(dict) = map.downcast_object_ref::<Dict>() {
        for key in &keys {
            dict.remove(&text(key));
        }
    }
    Ok(map)
}

/// `glob(files, pattern)`: the entries of a slurped files map whose path
/// matches `pattern`.
fn glob(args: &[Value]) -> FnResult {
    let (map, pattern): (Value, Value) = from_args(args)?;
    let pattern = files::compile_pattern(&text(&pattern)).map_err(|e| invalid(e.to_string()))?;
    let selected: BTreeMap<String, Value> = entries(&map)?
        .into_iter()
        .filter(|(name, _)| files::matches(&pattern, name))
        .collect();
    Ok(Value::from(selected))
}
