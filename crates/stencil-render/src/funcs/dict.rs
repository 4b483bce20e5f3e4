//! Mutable maps shared between template code and `set`/`unset`.
//!
//! Variable mappings and `dict` results are [`Dict`] objects. A map handed
//! to `set` is updated where it lives, so every name bound to it sees the
//! change.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use minijinja::value::{Enumerator, Object, ObjectRepr, Value};

use super::text;

#[derive(Debug, Default)]
pub(crate) struct Dict {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl Dict {
    /// Wraps `entries` in a fresh mutable map value.
    pub(crate) fn value(entries: BTreeMap<String, Value>) -> Value {
        Value::from_object(Dict {
            entries: Mutex::new(entries),
        })
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn insert(&self, key: String, value: Value) {
        self.lock().insert(key, value);
    }

    pub(crate) fn remove(&self, key: &str) {
        self.lock().remove(key);
    }
}

impl Object for Dict {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Map
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        self.lock().get(&text(key)).cloned()
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        let keys: Vec<Value> = self.lock().keys().map(|k| Value::from(k.as_str())).collect();
        Enumerator::Values(keys)
    }
}

/// Converts decoded data into template values, with every mapping at any
/// depth (including inside lists) turned into a [`Dict`].
pub(crate) fn from_json(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Object(map) => from_map(map),
        serde_json::Value::Array(list) => {
            Value::from(list.iter().map(from_json).collect::<Vec<_>>())
        }
        leaf => Value::from_serialize(leaf),
    }
}

pub(crate) fn from_map(map: &serde_json::Map<String, serde_json::Value>) -> Value {
    Dict::value(
        map.iter()
            .map(|(key, value)| (key.clone(), from_json(value)))
            .collect(),
    )
}
