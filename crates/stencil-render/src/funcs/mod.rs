//! The function registry templates call into.
//!
//! Every function a template can call lives in one name-keyed
//! [`FunctionRegistry`]. The standard registry is assembled once from four
//! groups:
//!
//! | Origin | Module | Examples |
//! |--------|--------|----------|
//! | [`Origin::Catalog`] | `catalog` | `upper`, `join`, `add`, `dict`, `b64enc` |
//! | [`Origin::Helper`] | `helpers` | `toJSON`, `fromYAML`, `toCSV`, `set`, `glob` |
//! | [`Origin::Builtin`] | `builtins` | `and`, `eq`, `index`, `printf`, `html` |
//! | [`Origin::HigherOrder`] | `higher_order` | `map`, `filter`, `mapFlip`, `filterFlip` |
//!
//! Catalog functions that read the process environment or duplicate a
//! helper are left out (see [`BLOCKLIST`]).
//!
//! Functions take a dynamically typed argument list and return a value or an
//! error, so the higher-order functions can dispatch to any of them by name:
//!
//! ```jinja
//! {{ map("upper", names) }}
//! {{ filter("hasPrefix", "web-", hosts) }}
//! {{ map("printf", "%03d", ids) }}
//! ```
//!
//! Once shared with a template registry (behind an `Arc`) the registry is
//! never modified again.

mod builtins;
mod catalog;
mod dict;
mod helpers;
mod higher_order;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use minijinja::value::{Object, ObjectRepr, Value, ValueKind};
use minijinja::{Environment, ErrorKind, State};

use crate::error::FuncError;

pub(crate) use dict::from_map as context_map;
pub use higher_order::HigherOrder;

/// A natively implemented function.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value, minijinja::Error> + Send + Sync>;

/// Catalog functions excluded from the standard registry.
///
/// `env` and `expandenv` would leak the process environment into templates;
/// `toJson` and `toPrettyJson` are replaced by the `toJSON` helper.
pub const BLOCKLIST: &[&str] = &["env", "expandenv", "toJson", "toPrettyJson"];

/// Which group a registered function comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Origin {
    Catalog,
    Helper,
    Builtin,
    HigherOrder,
    /// Added by the embedding application via [`FunctionRegistry::with_function`].
    Host,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Origin::Catalog => "catalog",
            Origin::Helper => "helper",
            Origin::Builtin => "builtin",
            Origin::HigherOrder => "higher-order",
            Origin::Host => "host",
        };
        f.write_str(label)
    }
}

/// How a registered function is executed.
#[derive(Clone)]
pub enum Callable {
    Native(NativeFn),
    HigherOrder(HigherOrder),
}

/// A registry entry.
#[derive(Clone)]
pub struct Function {
    origin: Origin,
    callable: Callable,
}

impl Function {
    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn callable(&self) -> &Callable {
        &self.callable
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Name-keyed registry of template functions.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, Function>,
}

impl FunctionRegistry {
    /// Creates a registry with no functions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard registry: catalog minus [`BLOCKLIST`], helpers,
    /// builtins and higher-order functions.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for (name, func) in catalog::functions() {
            if !BLOCKLIST.contains(&name) {
                registry.insert(name, Origin::Catalog, Callable::Native(func));
            }
        }
        for (name, func) in helpers::functions() {
            registry.insert(name, Origin::Helper, Callable::Native(func));
        }
        for (name, func) in builtins::functions() {
            registry.insert(name, Origin::Builtin, Callable::Native(func));
        }
        for op in HigherOrder::ALL {
            registry.insert(op.name(), Origin::HigherOrder, Callable::HigherOrder(op));
        }
        registry
    }

    /// Adds (or replaces) a host-provided function.
    pub fn with_function<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, minijinja::Error> + Send + Sync + 'static,
    {
        self.insert(name, Origin::Host, Callable::Native(Arc::new(func)));
        self
    }

    fn insert(&mut self, name: impl Into<String>, origin: Origin, callable: Callable) {
        self.functions
            .insert(name.into(), Function { origin, callable });
    }

    /// Looks up a function by name.
    pub fn lookup(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Registered functions in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Function)> {
        self.functions.iter().map(|(name, f)| (name.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Calls a function by name.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, FuncError> {
        let function = self.lookup(name).ok_or_else(|| FuncError::NotFound {
            name: name.to_string(),
        })?;
        self.invoke(name, function, args)
    }

    fn invoke(&self, name: &str, function: &Function, args: &[Value]) -> Result<Value, FuncError> {
        match &function.callable {
            Callable::Native(func) => func(args).map_err(|e| FuncError::invocation(name, e)),
            Callable::HigherOrder(op) => self.apply(*op, args),
        }
    }

    /// Registers every function as a global on a MiniJinja environment.
    ///
    /// Globals are what a template sees for names missing from its context,
    /// so each function is wrapped in a [`TemplateFunction`] that renders as
    /// empty text and is falsy until it is called.
    pub(crate) fn install(registry: &Arc<Self>, env: &mut Environment<'static>) {
        for (name, function) in &registry.functions {
            let global = TemplateFunction {
                name: name.clone(),
                callable: function.callable.clone(),
                registry: Arc::clone(registry),
            };
            env.add_global(name.clone(), Value::from_object(global));
        }
    }
}

/// A registry function as seen from inside a template.
///
/// Direct calls return the function's own error, which the renderer reports
/// as a render failure. Only `map`/`filter` dispatch raises [`FuncError`].
struct TemplateFunction {
    name: String,
    callable: Callable,
    registry: Arc<FunctionRegistry>,
}

impl fmt::Debug for TemplateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TemplateFunction").field(&self.name).finish()
    }
}

impl Object for TemplateFunction {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn is_true(self: &Arc<Self>) -> bool {
        false
    }

    fn render(self: &Arc<Self>, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Ok(())
    }

    fn call(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        args: &[Value],
    ) -> Result<Value, minijinja::Error> {
        match &self.callable {
            Callable::Native(func) => func(args),
            Callable::HigherOrder(op) => self
                .registry
                .apply(*op, args)
                .map_err(minijinja::Error::from),
        }
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("len", &self.functions.len())
            .finish()
    }
}

// === Argument helpers shared by the function groups ===

pub(crate) fn native<F>(func: F) -> NativeFn
where
    F: Fn(&[Value]) -> Result<Value, minijinja::Error> + Send + Sync + 'static,
{
    Arc::new(func)
}

pub(crate) fn invalid(message: impl Into<String>) -> minijinja::Error {
    minijinja::Error::new(ErrorKind::InvalidOperation, message.into())
}

/// String form of a value; undefined and none render empty.
pub(crate) fn text(value: &Value) -> String {
    if let Some(s) = value.as_str() {
        s.to_string()
    } else if value.is_undefined() || value.is_none() {
        String::new()
    } else {
        value.to_string()
    }
}

/// Elements of a sequence; undefined and none are empty.
pub(crate) fn items(value: &Value) -> Result<Vec<Value>, minijinja::Error> {
    match value.kind() {
        ValueKind::Undefined | ValueKind::None => Ok(Vec::new()),
        ValueKind::Seq | ValueKind::Iterable => Ok(value.try_iter()?.collect()),
        other => Err(invalid(format!("expected a list, got {other}"))),
    }
}

/// Entries of a mapping with stringified keys; undefined and none are empty.
pub(crate) fn entries(value: &Value) -> Result<BTreeMap<String, Value>, minijinja::Error> {
    match value.kind() {
        ValueKind::Undefined | ValueKind::None => Ok(BTreeMap::new()),
        ValueKind::Map => {
            let mut map = BTreeMap::new();
            for key in value.try_iter()? {
                let item = value.get_item(&key)?;
                map.insert(text(&key), item);
            }
            Ok(map)
        }
        other => Err(invalid(format!("expected a map, got {other}"))),
    }
}
