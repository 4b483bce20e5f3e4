//! Higher-order functions: `map`, `filter`, `mapFlip`, `filterFlip`.
//!
//! All four take a function name, any number of fixed arguments and a list
//! as the last argument:
//!
//! ```text
//! map(name, fixed..., list)         calls name(fixed..., item) for each item
//! mapFlip(name, fixed..., list)     calls name(item, fixed...) for each item
//! filter(name, fixed..., list)      keeps items where name(fixed..., item) is true
//! filterFlip(name, fixed..., list)  keeps items where name(item, fixed...) is true
//! ```
//!
//! The function is looked up before any element is processed, so an unknown
//! name fails even for an empty list. The first failing call aborts the
//! whole operation. `filter` requires each call to return a boolean.

use minijinja::value::{Value, ValueKind};

use super::{items, FunctionRegistry};
use crate::error::FuncError;

/// The higher-order operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HigherOrder {
    Map,
    Filter,
    MapFlip,
    FilterFlip,
}

impl HigherOrder {
    pub const ALL: [HigherOrder; 4] = [
        HigherOrder::Map,
        HigherOrder::Filter,
        HigherOrder::MapFlip,
        HigherOrder::FilterFlip,
    ];

    /// Name the operation is registered under.
    pub fn name(self) -> &'static str {
        match self {
            HigherOrder::Map => "map",
            HigherOrder::Filter => "filter",
            HigherOrder::MapFlip => "mapFlip",
            HigherOrder::FilterFlip => "filterFlip",
        }
    }

    /// Whether the element goes before the fixed arguments.
    fn element_first(self) -> bool {
        matches!(self, HigherOrder::MapFlip | HigherOrder::FilterFlip)
    }

    fn keeps(self) -> bool {
        matches!(self, HigherOrder::Filter | HigherOrder::FilterFlip)
    }
}

impl FunctionRegistry {
    /// Applies `func` to every item, with the item after `fixed`.
    pub fn map(
        &self,
        func: &str,
        fixed: &[Value],
        list: &[Value],
    ) -> Result<Vec<Value>, FuncError> {
        self.run(HigherOrder::Map, func, fixed, list)
    }

    /// Applies `func` to every item, with the item before `fixed`.
    pub fn map_flip(
        &self,
        func: &str,
        fixed: &[Value],
        list: &[Value],
    ) -> Result<Vec<Value>, FuncError> {
        self.run(HigherOrder::MapFlip, func, fixed, list)
    }

    /// Keeps the items for which `func(fixed..., item)` is true.
    pub fn filter(
        &self,
        func: &str,
        fixed: &[Value],
        list: &[Value],
    ) -> Result<Vec<Value>, FuncError> {
        self.run(HigherOrder::Filter, func, fixed, list)
    }

    /// Keeps the items for which `func(item, fixed...)` is true.
    pub fn filter_flip(
        &self,
        func: &str,
        fixed: &[Value],
        list: &[Value],
    ) -> Result<Vec<Value>, FuncError> {
        self.run(HigherOrder::FilterFlip, func, fixed, list)
    }

    /// Entry point for template calls: unpacks `(name, fixed..., list)`.
    pub(crate) fn apply(&self, op: HigherOrder, args: &[Value]) -> Result<Value, FuncError> {
        let (func, rest) = match args.split_first() {
            Some((func, rest)) if func.kind() == ValueKind::String => (func, rest),
            _ => {
                return Err(FuncError::invocation(
                    op.name(),
                    "first argument must be a function name",
                ))
            }
        };
        let (list, fixed) = rest.split_last().ok_or_else(|| {
            FuncError::invocation(op.name(), "expects a list as its last argument")
        })?;
        let list = items(list).map_err(|e| FuncError::invocation(op.name(), e))?;
        let func = func.as_str().unwrap_or_default();
        Ok(Value::from(self.run(op, func, fixed, &list)?))
    }

    fn run(
        &self,
        op: HigherOrder,
        func: &str,
        fixed: &[Value],
        list: &[Value],
    ) -> Result<Vec<Value>, FuncError> {
        let function = self.lookup(func).ok_or_else(|| FuncError::NotFound {
            name: func.to_string(),
        })?;

        let mut output = Vec::with_capacity(list.len());
        let mut call_args = Vec::with_capacity(fixed.len() + 1);
        for item in list {
            call_args.clear();
            if op.element_first() {
                call_args.push(item.clone());
                call_args.extend_from_slice(fixed);
            } else {
                call_args.extend_from_slice(fixed);
                call_args.push(item.clone());
            }

            let result = self.invoke(func, function, &call_args)?;
            if !op.keeps() {
                output.push(result);
                continue;
            }
            match result.kind() {
                ValueKind::Bool => {
                    if result.is_true() {
                        output.push(item.clone());
                    }
                }
                other => {
                    return Err(FuncError::invocation(
                        func,
                        format!("{} expects a boolean result, got {other}", op.name()),
                    ))
                }
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn values<T: Into<Value> + Clone>(items: &[T]) -> Vec<Value> {
        items.iter().cloned().map(Into::into).collect()
    }

    #[test]
    fn test_map() {
        let registry = FunctionRegistry::standard();
        let out = registry.map("upper", &[], &values(&["a", "b"])).unwrap();
        assert_eq!(out, values(&["A", "B"]));
    }

    #[test]
    fn test_map_places_item_after_fixed_args() {
        let registry = FunctionRegistry::standard();
        let out = registry
            .map("printf", &values(&["<%s>"]), &values(&["x", "y"]))
            .unwrap();
        assert_eq!(out, values(&["<x>", "<y>"]));
    }

    #[test]
    fn test_map_flip_places_item_first() {
        let registry = FunctionRegistry::standard();
        let out = registry
            .map_flip("sub", &values(&[1]), &values(&[10, 20]))
            .unwrap();
        assert_eq!(out, values(&[9, 19]));

        let out = registry.map("sub", &values(&[1]), &values(&[10, 20])).unwrap();
        assert_eq!(out, values(&[-9, -19]));
    }

    #[test]
    fn test_filter_keeps_order() {
        let registry = FunctionRegistry::standard();
        let list = values(&["web-1", "db-1", "web-2"]);
        let out = registry.filter("hasPrefix", &values(&["web-"]), &list).unwrap();
        assert_eq!(out, values(&["web-1", "web-2"]));
    }

    #[test]
    fn test_filter_flip() {
        let registry = FunctionRegistry::standard();
        let out = registry
            .filter_flip("gt", &values(&[2]), &values(&[1, 3, 2, 5]))
            .unwrap();
        assert_eq!(out, values(&[3, 5]));
    }

    #[test]
    fn test_unknown_function_fails_before_any_element() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let registry = FunctionRegistry::standard().with_function("count", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::from(true))
        });

        let err = registry.map("nope", &[], &values(&[1, 2, 3])).unwrap_err();
        assert!(matches!(err, FuncError::NotFound { ref name } if name == "nope"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let err = registry.filter("nope", &[], &[]).unwrap_err();
        assert!(matches!(err, FuncError::NotFound { .. }));
    }

    #[test]
    fn test_first_failure_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let registry = FunctionRegistry::standard().with_function("failOnTwo", move |args| {
            counter.fetch_add(1, Ordering::SeqCst);
            if args[0] == Value::from(2) {
                Err(super::super::invalid("two"))
            } else {
                Ok(args[0].clone())
            }
        });

        let err = registry
            .map("failOnTwo", &[], &values(&[1, 2, 3]))
            .unwrap_err();
        assert!(matches!(err, FuncError::Invocation { ref name, .. } if name == "failOnTwo"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_filter_rejects_non_boolean() {
        let registry = FunctionRegistry::standard();
        let err = registry.filter("upper", &[], &values(&["a"])).unwrap_err();
        assert!(matches!(err, FuncError::Invocation { .. }));
    }

    #[test]
    fn test_empty_list() {
        let registry = FunctionRegistry::standard();
        assert!(registry.map("upper", &[], &[]).unwrap().is_empty());
        assert!(registry.filter("not", &[], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_apply_unpacks_template_arguments() {
        let registry = FunctionRegistry::standard();
        let args = [
            Value::from("add"),
            Value::from(10),
            Value::from(vec![Value::from(1), Value::from(2)]),
        ];
        let out = registry.apply(HigherOrder::Map, &args).unwrap();
        assert_eq!(out, Value::from(values(&[11, 12])));
    }

    #[test]
    fn test_apply_requires_list() {
        let registry = FunctionRegistry::standard();
        let err = registry
            .apply(HigherOrder::Map, &[Value::from("upper")])
            .unwrap_err();
        assert!(matches!(err, FuncError::Invocation { ref name, .. } if name == "map"));

        let err = registry
            .apply(HigherOrder::Map, &[Value::from("upper"), Value::from(3)])
            .unwrap_err();
        assert!(matches!(err, FuncError::Invocation { .. }));
    }

    #[test]
    fn test_nested_dispatch_by_name() {
        let registry = FunctionRegistry::standard();
        let inner = Value::from(vec![Value::from("a"), Value::from("b")]);
        let out = registry
            .map("map", &values(&["upper"]), &[inner])
            .unwrap();
        assert_eq!(out, vec![Value::from(values(&["A", "B"]))]);
    }
}
