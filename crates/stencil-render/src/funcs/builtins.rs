//! Engine primitives: logic, comparison, indexing, escaping and printing.
//!
//! These follow the classic text-template behavior rather than Jinja's:
//! `and` returns its first falsy argument (or the last one), `eq` compares
//! its first argument against each of the others, and the `print` family
//! formats values the way a Go program would print them.
//!
//! `and`, `or` and `not` are template keywords, so in template text they are
//! written as operators; the functions exist for dispatch by name
//! (`filter("not", flags)`).

use std::cmp::Ordering;
use std::fmt::Write;

use minijinja::value::{Value, ValueKind};

use super::{entries, invalid, items, native, text, NativeFn};

pub(crate) fn functions() -> Vec<(&'static str, NativeFn)> {
    vec![
        ("and", native(and)),
        ("or", native(or)),
        ("not", native(not)),
        ("len", native(len)),
        ("eq", native(eq)),
        ("ne", native(|args| compare(args, "ne", |o| o != Ordering::Equal))),
        ("lt", native(|args| compare(args, "lt", |o| o == Ordering::Less))),
        ("le", native(|args| compare(args, "le", |o| o != Ordering::Greater))),
        ("gt", native(|args| compare(args, "gt", |o| o == Ordering::Greater))),
        ("ge", native(|args| compare(args, "ge", |o| o != Ordering::Less))),
        ("index", native(index)),
        ("html", native(html)),
        ("js", native(js)),
        ("urlquery", native(urlquery)),
        ("print", native(|args| Ok(Value::from(sprint(args))))),
        ("printf", native(printf)),
        ("println", native(|args| Ok(Value::from(sprintln(args))))),
    ]
}

fn and(args: &[Value]) -> Result<Value, minijinja::Error> {
    let last = args.last().ok_or_else(|| invalid("and expects at least one argument"))?;
    Ok(args.iter().find(|v| !v.is_true()).unwrap_or(last).clone())
}

fn or(args: &[Value]) -> Result<Value, minijinja::Error> {
    let last = args.last().ok_or_else(|| invalid("or expects at least one argument"))?;
    Ok(args.iter().find(|v| v.is_true()).unwrap_or(last).clone())
}

fn not(args: &[Value]) -> Result<Value, minijinja::Error> {
    match args {
        [value] => Ok(Value::from(!value.is_true())),
        _ => Err(invalid("not expects one argument")),
    }
}

fn len(args: &[Value]) -> Result<Value, minijinja::Error> {
    let [value] = args else {
        return Err(invalid("len expects one argument"));
    };
    value
        .len()
        .map(Value::from)
        .ok_or_else(|| invalid(format!("len of {} value", value.kind())))
}

fn eq(args: &[Value]) -> Result<Value, minijinja::Error> {
    let (first, rest) = args
        .split_first()
        .filter(|(_, rest)| !rest.is_empty())
        .ok_or_else(|| invalid("eq expects at least two arguments"))?;
    Ok(Value::from(rest.iter().any(|other| other == first)))
}

fn compare(
    args: &[Value],
    name: &str,
    accept: fn(Ordering) -> bool,
) -> Result<Value, minijinja::Error> {
    let [a, b] = args else {
        return Err(invalid(format!("{name} expects two arguments")));
    };
    let comparable = a.kind() == b.kind()
        && matches!(
            a.kind(),
            ValueKind::Number | ValueKind::String | ValueKind::Bool
        );
    if !comparable {
        return Err(invalid(format!(
            "{name}: cannot compare {} with {}",
            a.kind(),
            b.kind()
        )));
    }
    let ordering = a
        .partial_cmp(b)
        .ok_or_else(|| invalid(format!("{name}: values are not comparable")))?;
    Ok(Value::from(accept(ordering)))
}

/// `index(collection, key...)` walks nested maps and lists.
fn index(args: &[Value]) -> Result<Value, minijinja::Error> {
    let (first, keys) = args
        .split_first()
        .ok_or_else(|| invalid("index expects at least one argument"))?;
    let mut current = first.clone();
    for key in keys {
        current = match current.kind() {
            ValueKind::Seq => {
                let len = current.len().unwrap_or(0);
                let position = key
                    .as_i64()
                    .ok_or_else(|| invalid(format!("cannot index list with {}", key.kind())))?;
                if position < 0 || position as usize >= len {
                    return Err(invalid(format!("index {position} out of range")));
                }
                current.get_item(key)?
            }
            ValueKind::Map => current.get_item(key)?,
            ValueKind::Undefined | ValueKind::None => {
                return Err(invalid("index of untyped nil"));
            }
            other => return Err(invalid(format!("cannot index into {other}"))),
        };
    }
    Ok(current)
}

fn html(args: &[Value]) -> Result<Value, minijinja::Error> {
    let joined = sprint(args);
    Ok(Value::from(
        html_escape::encode_quoted_attribute(&joined).into_owned(),
    ))
}

fn js(args: &[Value]) -> Result<Value, minijinja::Error> {
    let joined = sprint(args);
    let mut out = String::with_capacity(joined.len());
    for c in joined.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '<' | '>' | '&' | '=' => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    Ok(Value::from(out))
}

/// Query-string escaping: unreserved bytes stay, space becomes `+`.
fn urlquery(args: &[Value]) -> Result<Value, minijinja::Error> {
    let joined = sprint(args);
    let mut out = String::with_capacity(joined.len());
    for byte in joined.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            other => {
                let _ = write!(out, "%{other:02X}");
            }
        }
    }
    Ok(Value::from(out))
}

// === Printing ===

/// Go-style rendering of a value, as used by `%v` and `print`.
pub(crate) fn plain(value: &Value) -> String {
    match value.kind() {
        ValueKind::Undefined | ValueKind::None => "<nil>".to_string(),
        ValueKind::Seq | ValueKind::Iterable => match items(value) {
            Ok(list) => {
                let parts: Vec<String> = list.iter().map(plain).collect();
                format!("[{}]", parts.join(" "))
            }
            Err(_) => value.to_string(),
        },
        ValueKind::Map => match entries(value) {
            Ok(map) => {
                let parts: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{k}:{}", plain(v)))
                    .collect();
                format!("map[{}]", parts.join(" "))
            }
            Err(_) => value.to_string(),
        },
        _ => text(value),
    }
}

fn sprint(args: &[Value]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        // operands are separated only when neither side is a string
        if i > 0 && arg.kind() != ValueKind::String && args[i - 1].kind() != ValueKind::String {
            out.push(' ');
        }
        out.push_str(&plain(arg));
    }
    out
}

fn sprintln(args: &[Value]) -> String {
    let parts: Vec<String> = args.iter().map(plain).collect();
    parts.join(" ") + "\n"
}

#[derive(Default)]
struct Directive {
    left: bool,
    zero: bool,
    plus: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

impl Directive {
    fn pad(&self, body: String, numeric: bool) -> String {
        let Some(width) = self.width else {
            return body;
        };
        let len = body.chars().count();
        if len >= width {
            return body;
        }
        let fill = width - len;
        if self.left {
            body + &" ".repeat(fill)
        } else if self.zero && numeric {
            match body.strip_prefix('-') {
                Some(digits) => format!("-{}{digits}", "0".repeat(fill)),
                None => "0".repeat(fill) + &body,
            }
        } else {
            " ".repeat(fill) + &body
        }
    }
}

fn printf(args: &[Value]) -> Result<Value, minijinja::Error> {
    let (format, args) = args
        .split_first()
        .ok_or_else(|| invalid("printf expects a format string"))?;
    let format = format
        .as_str()
        .ok_or_else(|| invalid("printf format must be a string"))?;
    Ok(Value::from(sprintf(format, args)))
}

pub(crate) fn sprintf(format: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();
    let mut next_arg = args.iter();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut directive = Directive::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => directive.left = true,
                '0' => directive.zero = true,
                '+' => directive.plus = true,
                _ => break,
            }
            chars.next();
        }
        directive.width = digits(&mut chars);
        if chars.peek() == Some(&'.') {
            chars.next();
            directive.precision = Some(digits(&mut chars).unwrap_or(0));
        }

        let Some(verb) = chars.next() else {
            out.push_str("%!(NOVERB)");
            break;
        };
        if verb == '%' {
            out.push('%');
            continue;
        }
        match next_arg.next() {
            Some(arg) => out.push_str(&format_arg(verb, &directive, arg)),
            None => {
                let _ = write!(out, "%!{verb}(MISSING)");
            }
        }
    }
    out
}

fn digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut value: Option<usize> = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        value = Some(value.unwrap_or(0) * 10 + d as usize);
        chars.next();
    }
    value
}

fn format_arg(verb: char, directive: &Directive, arg: &Value) -> String {
    let bad = || format!("%!{verb}({}={})", arg.kind(), plain(arg));
    match verb {
        's' | 'v' => {
            let mut body = plain(arg);
            if let Some(precision) = directive.precision.filter(|_| verb == 's') {
                body = body.chars().take(precision).collect();
            }
            directive.pad(body, false)
        }
        'd' => match arg.as_i64() {
            Some(n) if arg.kind() == ValueKind::Number && is_integer(arg) => {
                let body = if directive.plus && n >= 0 {
                    format!("+{n}")
                } else {
                    n.to_string()
                };
                directive.pad(body, true)
            }
            _ => bad(),
        },
        'f' | 'F' => match as_float(arg) {
            Some(f) => {
                let precision = directive.precision.unwrap_or(6);
                let body = if directive.plus && f >= 0.0 {
                    format!("+{f:.precision$}")
                } else {
                    format!("{f:.precision$}")
                };
                directive.pad(body, true)
            }
            None => bad(),
        },
        't' => match arg.kind() {
            ValueKind::Bool => directive.pad(arg.is_true().to_string(), false),
            _ => bad(),
        },
        'q' => match arg.as_str() {
            Some(s) => directive.pad(format!("{s:?}"), false),
            None => bad(),
        },
        'x' | 'X' => {
            let body = if let (Some(n), true) = (arg.as_i64(), is_integer(arg)) {
                if n < 0 {
                    format!("-{:x}", n.unsigned_abs())
                } else {
                    format!("{n:x}")
                }
            } else if let Some(s) = arg.as_str() {
                s.bytes().map(|b| format!("{b:02x}")).collect()
            } else {
                return bad();
            };
            let body = if verb == 'X' {
                body.to_uppercase()
            } else {
                body
            };
            directive.pad(body, true)
        }
        _ => format!("%!{verb}({})", plain(arg)),
    }
}

fn is_integer(value: &Value) -> bool {
    value.kind() == ValueKind::Number
        && value.as_i64().is_some()
        && !value.to_string().contains('.')
}

pub(crate) fn as_float(value: &Value) -> Option<f64> {
    if value.kind() != ValueKind::Number {
        return None;
    }
    f64::try_from(value.clone()).ok()
}
