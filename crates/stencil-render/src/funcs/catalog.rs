//! The general-purpose utility catalog.
//!
//! Argument order follows the sprig convention: the value being operated on
//! comes last, so functions compose with `map` and `filter`
//! (`map("trimPrefix", "v", tags)`).
//!
//! Numeric functions work on 64-bit integers unless their name says
//! otherwise (`floor`, `ceil`, `round`, `float64`). Conversions are lenient:
//! a value that cannot be read as a number counts as zero.

use std::collections::BTreeMap;
use std::fmt::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, FixedOffset, Local, Utc};
use minijinja::value::{from_args, Rest, Value, ValueKind};
use sha2::{Digest, Sha256};

use super::builtins::{as_float, plain};
use super::dict::Dict;
use super::{entries, invalid, items, native, text, NativeFn};

type FnResult = Result<Value, minijinja::Error>;

pub(crate) fn functions() -> Vec<(&'static str, NativeFn)> {
    vec![
        // strings
        ("upper", native(|args| map_str(args, |s| s.to_uppercase()))),
        ("lower", native(|args| map_str(args, |s| s.to_lowercase()))),
        ("title", native(|args| map_str(args, title))),
        ("trim", native(|args| map_str(args, |s| s.trim().to_string()))),
        ("trimAll", native(trim_all)),
        ("trimPrefix", native(trim_prefix)),
        ("trimSuffix", native(trim_suffix)),
        ("contains", native(|args| test_str(args, |needle, s| s.contains(needle)))),
        ("hasPrefix", native(|args| test_str(args, |p, s| s.starts_with(p)))),
        ("hasSuffix", native(|args| test_str(args, |p, s| s.ends_with(p)))),
        ("replace", native(replace)),
        ("repeat", native(repeat)),
        ("substr", native(substr)),
        ("trunc", native(trunc)),
        ("quote", native(|args| Ok(quote_all(args, '"')))),
        ("squote", native(|args| Ok(quote_all(args, '\'')))),
        ("cat", native(cat)),
        ("indent", native(|args| indent(args, false))),
        ("nindent", native(|args| indent(args, true))),
        ("splitList", native(split_list)),
        ("join", native(join)),
        ("toString", native(|args| map_value(args, |v| Ok(Value::from(plain_text(v)))))),
        // lists
        ("list", native(|args| Ok(Value::from(args.to_vec())))),
        ("first", native(|args| map_list(args, first))),
        ("last", native(|args| map_list(args, last))),
        ("rest", native(|args| map_list(args, rest))),
        ("initial", native(|args| map_list(args, initial))),
        ("append", native(append)),
        ("prepend", native(prepend)),
        ("concat", native(concat)),
        ("reverse", native(|args| map_list(args, |mut l| { l.reverse(); Ok(Value::from(l)) }))),
        ("uniq", native(|args| map_list(args, |l| Ok(Value::from(uniq(l)))))),
        ("compact", native(|args| map_list(args, compact))),
        ("has", native(has)),
        ("sortAlpha", native(sort_alpha)),
        // dicts
        ("dict", native(dict)),
        ("get", native(get)),
        ("hasKey", native(has_key)),
        ("keys", native(keys)),
        ("values", native(values)),
        ("pick", native(|args| select(args, true))),
        ("omit", native(|args| select(args, false))),
        ("merge", native(merge)),
        // math
        ("add", native(|args| Ok(Value::from(ints(args).sum::<i64>())))),
        ("add1", native(|args| map_value(args, |v| Ok(Value::from(to_int(v).wrapping_add(1)))))),
        ("sub", native(|args| int_pair(args, |a, b| Ok(a.wrapping_sub(b))))),
        ("mul", native(|args| Ok(Value::from(ints(args).fold(1i64, i64::wrapping_mul))))),
        ("div", native(|args| int_pair(args, |a, b| nonzero(a.checked_div(b))))),
        ("mod", native(|args| int_pair(args, |a, b| nonzero(a.checked_rem(b))))),
        ("max", native(|args| extreme(args, i64::max))),
        ("min", native(|args| extreme(args, i64::min))),
        ("floor", native(|args| map_value(args, |v| Ok(Value::from(to_float(v).floor()))))),
        ("ceil", native(|args| map_value(args, |v| Ok(Value::from(to_float(v).ceil()))))),
        ("round", native(round)),
        ("atoi", native(|args| map_value(args, atoi))),
        ("int", native(|args| map_value(args, |v| Ok(Value::from(to_int(v)))))),
        ("float64", native(|args| map_value(args, |v| Ok(Value::from(to_float(v)))))),
        // logic and defaults
        ("default", native(default)),
        ("empty", native(|args| map_value(args, |v| Ok(Value::from(!v.is_true()))))),
        ("coalesce", native(coalesce)),
        ("ternary", native(ternary)),
        // encoding
        ("b64enc", native(|args| map_str(args, |s| STANDARD.encode(s)))),
        ("b64dec", native(b64dec)),
        ("sha256sum", native(|args| map_str(args, sha256sum))),
        // dates and ids
        ("now", native(now)),
        ("date", native(date)),
        ("unixEpoch", native(|args| map_value(args, unix_epoch))),
        ("uuidv4", native(uuidv4)),
        // environment
        ("env", native(|args| map_str(args, |name| std::env::var(name).unwrap_or_default()))),
        ("expandenv", native(|args| map_str(args, expand_process_env))),
        // serialization
        ("toJson", native(|args| map_value(args, |v| to_json(v, false)))),
        ("toPrettyJson", native(|args| map_value(args, |v| to_json(v, true)))),
    ]
}

// === Argument adapters ===

fn map_value(args: &[Value], f: impl Fn(&Value) -> FnResult) -> FnResult {
    let (value,): (Value,) = from_args(args)?;
    f(&value)
}

fn map_str(args: &[Value], f: impl Fn(&str) -> String) -> FnResult {
    map_value(args, |v| Ok(Value::from(f(&text(v)))))
}

fn map_list(args: &[Value], f: impl Fn(Vec<Value>) -> FnResult) -> FnResult {
    map_value(args, |v| f(items(v)?))
}

fn test_str(args: &[Value], f: impl Fn(&str, &str) -> bool) -> FnResult {
    let (arg, value): (Value, Value) = from_args(args)?;
    Ok(Value::from(f(&text(&arg), &text(&value))))
}

/// String form used by `toString`, `cat` and `join`: strings as-is,
/// everything else printed.
fn plain_text(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => plain(value),
    }
}

// === Strings ===

fn title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start && c.is_alphanumeric() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !c.is_alphanumeric();
    }
    out
}

fn trim_all(args: &[Value]) -> FnResult {
    let (cutset, value): (Value, Value) = from_args(args)?;
    let cutset = text(&cutset);
    Ok(Value::from(
        text(&value).trim_matches(|c: char| cutset.contains(c)).to_string(),
    ))
}

fn trim_prefix(args: &[Value]) -> FnResult {
    let (prefix, value): (Value, Value) = from_args(args)?;
    let (prefix, value) = (text(&prefix), text(&value));
    Ok(Value::from(
        value.strip_prefix(prefix.as_str()).unwrap_or(&value).to_string(),
    ))
}

fn trim_suffix(args: &[Value]) -> FnResult {
    let (suffix, value): (Value, Value) = from_args(args)?;
    let (suffix, value) = (text(&suffix), text(&value));
    Ok(Value::from(
        value.strip_suffix(suffix.as_str()).unwrap_or(&value).to_string(),
    ))
}

fn replace(args: &[Value]) -> FnResult {
    let (old, new, value): (Value, Value, Value) = from_args(args)?;
    Ok(Value::from(text(&value).replace(&text(&old), &text(&new))))
}

fn repeat(args: &[Value]) -> FnResult {
    let (count, value): (Value, Value) = from_args(args)?;
    let count = usize::try_from(to_int(&count)).unwrap_or(0);
    Ok(Value::from(text(&value).repeat(count)))
}

/// `substr(start, end, s)`: a negative start means 0, a negative or
/// too-large end means the end of the string.
fn substr(args: &[Value]) -> FnResult {
    let (start, end, value): (Value, Value, Value) = from_args(args)?;
    let chars: Vec<char> = text(&value).chars().collect();
    let len = chars.len() as i64;
    let start = to_int(&start).clamp(0, len) as usize;
    let end = match to_int(&end) {
        e if e < 0 || e > len => len as usize,
        e => e as usize,
    };
    if start >= end {
        return Ok(Value::from(""));
    }
    Ok(Value::from(chars[start..end].iter().collect::<String>()))
}

/// `trunc(n, s)`: the first `n` characters, or the last `-n` for negative `n`.
fn trunc(args: &[Value]) -> FnResult {
    let (n, value): (Value, Value) = from_args(args)?;
    let chars: Vec<char> = text(&value).chars().collect();
    let n = to_int(&n);
    let out: String = if n >= 0 {
        chars.iter().take(n as usize).collect()
    } else {
        let keep = (n.unsigned_abs() as usize).min(chars.len());
        chars[chars.len() - keep..].iter().collect()
    };
    Ok(Value::from(out))
}

fn quote_all(args: &[Value], mark: char) -> Value {
    let quoted: Vec<String> = args
        .iter()
        .filter(|v| !v.is_none() && !v.is_undefined())
        .map(|v| {
            let s = plain_text(v);
            if mark == '"' {
                format!("{s:?}")
            } else {
                format!("'{s}'")
            }
        })
        .collect();
    Value::from(quoted.join(" "))
}

fn cat(args: &[Value]) -> FnResult {
    let parts: Vec<String> = args
        .iter()
        .filter(|v| !v.is_none() && !v.is_undefined())
        .map(plain_text)
        .collect();
    Ok(Value::from(parts.join(" ")))
}

fn indent(args: &[Value], leading_newline: bool) -> FnResult {
    let (width, value): (Value, Value) = from_args(args)?;
    let pad = " ".repeat(usize::try_from(to_int(&width)).unwrap_or(0));
    let body = pad.clone() + &text(&value).replace('\n', &format!("\n{pad}"));
    Ok(Value::from(if leading_newline {
        format!("\n{body}")
    } else {
        body
    }))
}

fn split_list(args: &[Value]) -> FnResult {
    let (sep, value): (Value, Value) = from_args(args)?;
    let (sep, value) = (text(&sep), text(&value));
    let parts: Vec<Value> = if sep.is_empty() {
        value.chars().map(|c| Value::from(c.to_string())).collect()
    } else {
        value.split(sep.as_str()).map(Value::from).collect()
    };
    Ok(Value::from(parts))
}

fn join(args: &[Value]) -> FnResult {
    let (sep, list): (Value, Value) = from_args(args)?;
    let parts: Vec<String> = match list.kind() {
        ValueKind::String => vec![text(&list)],
        _ => items(&list)?.iter().map(plain_text).collect(),
    };
    Ok(Value::from(parts.join(&text(&sep))))
}

// === Lists ===

fn append(args: &[Value]) -> FnResult {
    let (list, value): (Value, Value) = from_args(args)?;
    let mut list = items(&list)?;
    list.push(value);
    Ok(Value::from(list))
}

fn prepend(args: &[Value]) -> FnResult {
    let (list, value): (Value, Value) = from_args(args)?;
    let mut list = items(&list)?;
    list.insert(0, value);
    Ok(Value::from(list))
}

fn concat(args: &[Value]) -> FnResult {
    let mut out = Vec::new();
    for list in args {
        out.extend(items(list)?);
    }
    Ok(Value::from(out))
}

fn first(list: Vec<Value>) -> FnResult {
    Ok(list.into_iter().next().unwrap_or(Value::from(())))
}

fn last(list: Vec<Value>) -> FnResult {
    Ok(list.into_iter().last().unwrap_or(Value::from(())))
}

fn rest(list: Vec<Value>) -> FnResult {
    Ok(Value::from(list.into_iter().skip(1).collect::<Vec<_>>()))
}

fn initial(mut list: Vec<Value>) -> FnResult {
    list.pop();
    Ok(Value::from(list))
}

/// Drops falsy items (empty strings, zero, none).
fn compact(list: Vec<Value>) -> FnResult {
    Ok(Value::from(
        list.into_iter().filter(Value::is_true).collect::<Vec<_>>(),
    ))
}

fn uniq(list: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(list.len());
    for item in list {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn has(args: &[Value]) -> FnResult {
    let (needle, list): (Value, Value) = from_args(args)?;
    Ok(Value::from(items(&list)?.contains(&needle)))
}

fn sort_alpha(args: &[Value]) -> FnResult {
    let (list,): (Value,) = from_args(args)?;
    let mut strings: Vec<String> = items(&list)?.iter().map(plain_text).collect();
    strings.sort();
    Ok(Value::from(strings))
}

// === Dicts ===

/// `dict(key, value, ...)`: a new mutable map; a trailing key maps to "".
fn dict(args: &[Value]) -> FnResult {
    let mut map = BTreeMap::new();
    for pair in args.chunks(2) {
        let value = pair.get(1).cloned().unwrap_or(Value::from(""));
        map.insert(text(&pair[0]), value);
    }
    Ok(Dict::value(map))
}

fn get(args: &[Value]) -> FnResult {
    let (map, key): (Value, Value) = from_args(args)?;
    Ok(entries(&map)?
        .remove(&text(&key))
        .unwrap_or(Value::from("")))
}

fn has_key(args: &[Value]) -> FnResult {
    let (map, key): (Value, Value) = from_args(args)?;
    Ok(Value::from(entries(&map)?.contains_key(&text(&key))))
}

fn keys(args: &[Value]) -> FnResult {
    let mut out = Vec::new();
    for map in args {
        out.extend(entries(map)?.into_keys().map(Value::from));
    }
    Ok(Value::from(out))
}

fn values(args: &[Value]) -> FnResult {
    let (map,): (Value,) = from_args(args)?;
    Ok(Value::from(entries(&map)?.into_values().collect::<Vec<_>>()))
}

fn select(args: &[Value], keep: bool) -> FnResult {
    let (map, Rest(names)): (Value, Rest<Value>) = from_args(args)?;
    let names: Vec<String> = names.iter().map(text).collect();
    let selected: BTreeMap<String, Value> = entries(&map)?
        .into_iter()
        .filter(|(k, _)| names.contains(k) == keep)
        .collect();
    Ok(Value::from(selected))
}

/// `merge(dst, src...)`: a new map where keys already present win.
/// Nested maps are merged the same way.
fn merge(args: &[Value]) -> FnResult {
    let (dst, Rest(sources)): (Value, Rest<Value>) = from_args(args)?;
    let mut merged = entries(&dst)?;
    for source in &sources {
        merge_into(&mut merged, entries(source)?)?;
    }
    Ok(Value::from(merged))
}

fn merge_into(
    dst: &mut BTreeMap<String, Value>,
    src: BTreeMap<String, Value>,
) -> Result<(), minijinja::Error> {
    for (key, value) in src {
        match dst.get_mut(&key) {
            None => {
                dst.insert(key, value);
            }
            Some(existing)
                if existing.kind() == ValueKind::Map && value.kind() == ValueKind::Map =>
            {
                let mut nested = entries(existing)?;
                merge_into(&mut nested, entries(&value)?)?;
                *existing = Value::from(nested);
            }
            Some(_) => {}
        }
    }
    Ok(())
}

// === Math ===

pub(crate) fn to_int(value: &Value) -> i64 {
    match value.kind() {
        ValueKind::Number => value
            .as_i64()
            .or_else(|| as_float(value).map(|f| f as i64))
            .unwrap_or(0),
        ValueKind::Bool => i64::from(value.is_true()),
        ValueKind::String => {
            let s = text(value);
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn to_float(value: &Value) -> f64 {
    match value.kind() {
        ValueKind::Number => as_float(value).unwrap_or(0.0),
        ValueKind::Bool => f64::from(u8::from(value.is_true())),
        ValueKind::String => text(value).trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn ints(args: &[Value]) -> impl Iterator<Item = i64> + '_ {
    args.iter().map(to_int)
}

fn int_pair(
    args: &[Value],
    f: impl Fn(i64, i64) -> Result<i64, minijinja::Error>,
) -> FnResult {
    let (a, b): (Value, Value) = from_args(args)?;
    Ok(Value::from(f(to_int(&a), to_int(&b))?))
}

fn extreme(args: &[Value], pick: fn(i64, i64) -> i64) -> FnResult {
    let (first, Rest(rest)): (Value, Rest<Value>) = from_args(args)?;
    Ok(Value::from(ints(&rest).fold(to_int(&first), pick)))
}

fn nonzero(result: Option<i64>) -> Result<i64, minijinja::Error> {
    result.ok_or_else(|| invalid("integer divide by zero"))
}

fn atoi(value: &Value) -> FnResult {
    Ok(Value::from(text(value).trim().parse::<i64>().unwrap_or(0)))
}

/// `round(x, places)`; half away from zero.
fn round(args: &[Value]) -> FnResult {
    let (value, places): (Value, Option<Value>) = from_args(args)?;
    let places = places.as_ref().map(to_int).unwrap_or(0).clamp(0, 15) as i32;
    let scale = 10f64.powi(places);
    Ok(Value::from((to_float(&value) * scale).round() / scale))
}

// === Logic ===

/// `default(fallback, value)`: `value` unless it is missing or empty.
fn default(args: &[Value]) -> FnResult {
    let (fallback, value): (Value, Option<Value>) = from_args(args)?;
    Ok(match value {
        Some(value) if value.is_true() => value,
        _ => fallback,
    })
}

fn coalesce(args: &[Value]) -> FnResult {
    Ok(args
        .iter()
        .find(|v| v.is_true())
        .cloned()
        .unwrap_or(Value::from(())))
}

fn ternary(args: &[Value]) -> FnResult {
    let (yes, no, condition): (Value, Value, Value) = from_args(args)?;
    Ok(if condition.is_true() { yes } else { no })
}

// === Encoding ===

fn b64dec(args: &[Value]) -> FnResult {
    let (value,): (Value,) = from_args(args)?;
    let bytes = STANDARD
        .decode(text(&value).trim())
        .map_err(|e| invalid(format!("b64dec: {e}")))?;
    Ok(Value::from(String::from_utf8_lossy(&bytes).into_owned()))
}

fn sha256sum(s: &str) -> String {
    Sha256::digest(s.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

// === Dates ===

fn now(args: &[Value]) -> FnResult {
    from_args::<()>(args)?;
    Ok(Value::from(Local::now().to_rfc3339()))
}

/// `date(format, time)`: formats an RFC 3339 string or a unix timestamp
/// with a strftime-style format.
fn date(args: &[Value]) -> FnResult {
    let (format, time): (Value, Value) = from_args(args)?;
    let time = parse_time(&time)?;
    let mut out = String::new();
    write!(out, "{}", time.format(&text(&format)))
        .map_err(|_| invalid(format!("invalid date format '{}'", text(&format))))?;
    Ok(Value::from(out))
}

fn unix_epoch(value: &Value) -> FnResult {
    Ok(Value::from(parse_time(value)?.timestamp()))
}

fn uuidv4(args: &[Value]) -> FnResult {
    from_args::<()>(args)?;
    Ok(Value::from(uuid::Uuid::new_v4().to_string()))
}

fn parse_time(value: &Value) -> Result<DateTime<FixedOffset>, minijinja::Error> {
    if value.kind() == ValueKind::Number {
        let secs = to_int(value);
        return DateTime::<Utc>::from_timestamp(secs, 0)
            .map(|t| t.fixed_offset())
            .ok_or_else(|| invalid(format!("timestamp {secs} out of range")));
    }
    let s = text(value);
    DateTime::parse_from_rfc3339(s.trim())
        .map_err(|e| invalid(format!("cannot parse time '{s}': {e}")))
}

// === Environment ===

fn expand_process_env(s: &str) -> String {
    expand_env(s, |name| std::env::var(name).ok())
}

/// Replaces `$NAME` and `${NAME}` with the looked-up value (empty if unset).
fn expand_env(s: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let mut name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
        } else {
            while let Some(&c) = chars.peek() {
                if !(c.is_ascii_alphanumeric() || c == '_') {
                    break;
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                out.push('$');
                continue;
            }
        }
        out.push_str(&lookup(&name).unwrap_or_default());
    }
    out
}

fn to_json(value: &Value, pretty: bool) -> FnResult {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.map(Value::from)
        .map_err(|e| invalid(format!("cannot encode JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> FnResult {
        let (_, func) = functions()
            .into_iter()
            .find(|(n, _)| *n == name)
            .expect("catalog function exists");
        func(args)
    }

    fn v<T: Into<Value>>(value: T) -> Value {
        value.into()
    }

    fn list<T: Into<Value>>(values: Vec<T>) -> Value {
        Value::from(values.into_iter().map(Into::into).collect::<Vec<Value>>())
    }

    #[test]
    fn test_strings() {
        assert_eq!(call("upper", &[v("abc")]).unwrap(), v("ABC"));
        assert_eq!(call("title", &[v("hello big-world")]).unwrap(), v("Hello Big-World"));
        assert_eq!(call("trimAll", &[v("$"), v("$5.00$")]).unwrap(), v("5.00"));
        assert_eq!(call("trimPrefix", &[v("v"), v("v1.2")]).unwrap(), v("1.2"));
        assert_eq!(call("trimSuffix", &[v(".go"), v("main.go")]).unwrap(), v("main"));
        assert_eq!(call("replace", &[v(" "), v("-"), v("a b c")]).unwrap(), v("a-b-c"));
        assert_eq!(call("repeat", &[v(3), v("ab")]).unwrap(), v("ababab"));
        assert_eq!(call("hasPrefix", &[v("web"), v("web-1")]).unwrap(), v(true));
        assert_eq!(call("contains", &[v("x"), v("abc")]).unwrap(), v(false));
    }

    #[test]
    fn test_substr_and_trunc() {
        assert_eq!(call("substr", &[v(1), v(3), v("hello")]).unwrap(), v("el"));
        assert_eq!(call("substr", &[v(2), v(-1), v("hello")]).unwrap(), v("llo"));
        assert_eq!(call("trunc", &[v(3), v("hello")]).unwrap(), v("hel"));
        assert_eq!(call("trunc", &[v(-2), v("hello")]).unwrap(), v("lo"));
    }

    #[test]
    fn test_quote_cat_indent() {
        assert_eq!(call("quote", &[v("a"), v(1)]).unwrap(), v("\"a\" \"1\""));
        assert_eq!(call("squote", &[v("a")]).unwrap(), v("'a'"));
        assert_eq!(call("cat", &[v("a"), v(()), v(2)]).unwrap(), v("a 2"));
        assert_eq!(call("indent", &[v(2), v("a\nb")]).unwrap(), v("  a\n  b"));
        assert_eq!(call("nindent", &[v(1), v("a")]).unwrap(), v("\n a"));
    }

    #[test]
    fn test_split_and_join() {
        assert_eq!(
            call("splitList", &[v(","), v("a,b")]).unwrap(),
            list(vec!["a", "b"])
        );
        assert_eq!(call("join", &[v("-"), list(vec![1, 2, 3])]).unwrap(), v("1-2-3"));
    }

    #[test]
    fn test_lists() {
        let l = list(vec![3, 1, 3, 2]);
        assert_eq!(call("first", &[l.clone()]).unwrap(), v(3));
        assert_eq!(call("last", &[l.clone()]).unwrap(), v(2));
        assert_eq!(call("rest", &[l.clone()]).unwrap(), list(vec![1, 3, 2]));
        assert_eq!(call("initial", &[l.clone()]).unwrap(), list(vec![3, 1, 3]));
        assert_eq!(call("uniq", &[l.clone()]).unwrap(), list(vec![3, 1, 2]));
        assert_eq!(call("reverse", &[l.clone()]).unwrap(), list(vec![2, 3, 1, 3]));
        assert_eq!(call("has", &[v(2), l.clone()]).unwrap(), v(true));
        assert_eq!(call("append", &[l.clone(), v(9)]).unwrap(), list(vec![3, 1, 3, 2, 9]));
        assert_eq!(call("prepend", &[list(vec![1]), v(0)]).unwrap(), list(vec![0, 1]));
        assert_eq!(
            call("concat", &[list(vec![1]), list(vec![2, 3])]).unwrap(),
            list(vec![1, 2, 3])
        );
        assert_eq!(
            call("compact", &[list(vec![v("a"), v(""), v(0), v("b")])]).unwrap(),
            list(vec!["a", "b"])
        );
        assert_eq!(
            call("sortAlpha", &[list(vec!["b", "c", "a"])]).unwrap(),
            list(vec!["a", "b", "c"])
        );
        assert!(call("first", &[list(Vec::<Value>::new())]).unwrap().is_none());
    }

    #[test]
    fn test_dicts() {
        let d = call("dict", &[v("a"), v(1), v("b"), v(2)]).unwrap();
        assert_eq!(call("get", &[d.clone(), v("a")]).unwrap(), v(1));
        assert_eq!(call("get", &[d.clone(), v("z")]).unwrap(), v(""));
        assert_eq!(call("hasKey", &[d.clone(), v("b")]).unwrap(), v(true));
        assert_eq!(call("keys", &[d.clone()]).unwrap(), list(vec!["a", "b"]));
        assert_eq!(call("values", &[d.clone()]).unwrap(), list(vec![1, 2]));

        let picked = call("pick", &[d.clone(), v("a")]).unwrap();
        assert_eq!(call("keys", &[picked]).unwrap(), list(vec!["a"]));
        let omitted = call("omit", &[d.clone(), v("a")]).unwrap();
        assert_eq!(call("keys", &[omitted]).unwrap(), list(vec!["b"]));
    }

    #[test]
    fn test_merge_keeps_existing_keys() {
        let dst = Value::from_serialize(serde_json::json!({"a": 1, "n": {"x": 1}}));
        let src = Value::from_serialize(serde_json::json!({"a": 2, "b": 2, "n": {"y": 2}}));
        let merged = call("merge", &[dst, src]).unwrap();
        assert_eq!(
            serde_json::to_value(&merged).unwrap(),
            serde_json::json!({"a": 1, "b": 2, "n": {"x": 1, "y": 2}})
        );
    }

    #[test]
    fn test_math() {
        assert_eq!(call("add", &[v(1), v(2), v("3")]).unwrap(), v(6));
        assert_eq!(call("add1", &[v(1)]).unwrap(), v(2));
        assert_eq!(call("sub", &[v(5), v(7)]).unwrap(), v(-2));
        assert_eq!(call("mul", &[v(2), v(3), v(4)]).unwrap(), v(24));
        assert_eq!(call("div", &[v(7), v(2)]).unwrap(), v(3));
        assert_eq!(call("mod", &[v(7), v(2)]).unwrap(), v(1));
        assert_eq!(call("max", &[v(1), v(9), v(3)]).unwrap(), v(9));
        assert_eq!(call("min", &[v(4), v(2)]).unwrap(), v(2));
        assert_eq!(call("floor", &[v(1.7)]).unwrap(), v(1.0));
        assert_eq!(call("round", &[v(1.255), v(1)]).unwrap(), v(1.3));
        assert_eq!(call("atoi", &[v("42")]).unwrap(), v(42));
        assert_eq!(call("int", &[v("nope")]).unwrap(), v(0));
        assert_eq!(call("float64", &[v("1.5")]).unwrap(), v(1.5));
    }

    #[test]
    fn test_division_by_zero_fails() {
        assert!(call("div", &[v(1), v(0)]).is_err());
        assert!(call("mod", &[v(1), v(0)]).is_err());
    }

    #[test]
    fn test_logic() {
        assert_eq!(call("default", &[v("x"), v("")]).unwrap(), v("x"));
        assert_eq!(call("default", &[v("x"), v("y")]).unwrap(), v("y"));
        assert_eq!(call("default", &[v("x")]).unwrap(), v("x"));
        assert_eq!(call("empty", &[list(Vec::<Value>::new())]).unwrap(), v(true));
        assert_eq!(call("coalesce", &[v(0), v(""), v("z")]).unwrap(), v("z"));
        assert_eq!(call("ternary", &[v("y"), v("n"), v(false)]).unwrap(), v("n"));
    }

    #[test]
    fn test_encoding() {
        assert_eq!(call("b64enc", &[v("hello")]).unwrap(), v("aGVsbG8="));
        assert_eq!(call("b64dec", &[v("aGVsbG8=")]).unwrap(), v("hello"));
        assert!(call("b64dec", &[v("***")]).is_err());
        assert_eq!(
            call("sha256sum", &[v("abc")]).unwrap(),
            v("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn test_dates() {
        assert_eq!(
            call("date", &[v("%Y-%m-%d"), v("2024-03-05T10:00:00Z")]).unwrap(),
            v("2024-03-05")
        );
        assert_eq!(call("unixEpoch", &[v("1970-01-01T00:01:00Z")]).unwrap(), v(60));
        assert_eq!(call("date", &[v("%Y"), v(0)]).unwrap(), v("1970"));
        assert!(call("date", &[v("%Y"), v("yesterday")]).is_err());
    }

    #[test]
    fn test_uuid_shape() {
        let id = call("uuidv4", &[]).unwrap();
        let id = id.as_str().unwrap();
        assert_eq!(id.len(), 36);
        assert_eq!(&id[14..15], "4");
    }

    #[test]
    fn test_expand_env() {
        let lookup = |name: &str| (name == "HOME").then(|| "/home/me".to_string());
        assert_eq!(expand_env("$HOME/x ${HOME} $NOPE $", lookup), "/home/me/x /home/me  $");
    }

    #[test]
    fn test_to_json() {
        let value = Value::from_serialize(serde_json::json!({"a": [1, 2]}));
        assert_eq!(call("toJson", &[value]).unwrap(), v(r#"{"a":[1,2]}"#));
    }

    #[test]
    fn test_arity_errors() {
        assert!(call("upper", &[]).is_err());
        assert!(call("trimPrefix", &[v("a")]).is_err());
        assert!(call("upper", &[v("a"), v("b")]).is_err());
    }
}
