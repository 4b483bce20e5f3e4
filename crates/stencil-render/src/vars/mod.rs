//! The variable store and the sources that populate it.
//!
//! [`Vars`] is the single mapping templates are executed against. It is
//! filled by loading [`VarsSource`]s in order:
//!
//! ```text
//! sources:  file(a.json) ─┐
//!           literal(x=1) ─┼─► batch ─► merge(namespace) ─► Vars
//!           env(APP_)    ─┘
//! ```
//!
//! Every source produces one batch of entries, which is merged shallowly
//! into the store: a later source replaces the value of an identical
//! top-level key, nested mappings are not merged.
//!
//! With a namespace key the batch goes one level down instead. The mapping
//! at that key is reused when it exists; any other value there is replaced
//! by a fresh mapping.

mod source;

use std::io::Write;

use serde::Serialize;
use serde_json::Value;

pub use source::{VarsSource, VarsSourceKind};

use crate::decode::Map;
use crate::error::{Error, Result};
use crate::host::Host;

/// The resolved variable namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Vars {
    map: Map,
}

impl Vars {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store by loading `sources` in order.
    ///
    /// Errors are wrapped with the index of the failing source.
    pub fn from_sources(sources: &[VarsSource], host: &Host) -> Result<Self> {
        let mut vars = Self::new();
        for (index, source) in sources.iter().enumerate() {
            source.load(&mut vars, host).map_err(|e| Error::VarsSource {
                index,
                source: Box::new(e),
            })?;
        }
        Ok(vars)
    }

    /// Looks up a top-level variable.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    /// Sets a top-level variable, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.map.insert(key.into(), value.into());
    }

    /// Merges a batch of entries into the store.
    ///
    /// With `namespace` set (and non-empty) the entries land in the mapping
    /// at that key, which is created or, if it holds a non-mapping value,
    /// replaced.
    pub fn merge(&mut self, namespace: Option<&str>, batch: Map) {
        match namespace.filter(|key| !key.is_empty()) {
            None => self.map.extend(batch),
            Some(key) => {
                let mut nested = match self.map.remove(key) {
                    Some(Value::Object(existing)) => existing,
                    _ => Map::new(),
                };
                nested.extend(batch);
                self.map.insert(key.to_string(), Value::Object(nested));
            }
        }
    }

    pub fn as_map(&self) -> &Map {
        &self.map
    }

    pub fn into_map(self) -> Map {
        self.map
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Writes the store as pretty JSON (YAML if JSON encoding fails).
    pub fn save<W: Write>(&self, writer: W) -> Result<()> {
        crate::output::save(self, writer)
    }
}

impl From<Map> for Vars {
    fn from(map: Map) -> Self {
        Self { map }
    }
}
