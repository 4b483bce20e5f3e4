use proptest::prelude::*;
use serde_json::{json, Value as Json};
use stencil_render::{decode, FunctionRegistry, Host, MockEnv, MockStdin, Value, Vars, VarsSource};

// JSON values without floats, which may not survive a text round trip.
fn json_strategy() -> impl Strategy<Value = Json> {
    let leaf = prop_oneof![
        Just(Json::Null),
        any::<bool>().prop_map(Json::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 _-]*".prop_map(Json::String),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Json::Array),
            prop::collection::btree_map("[a-z0-9_]{1,8}", inner, 0..8)
                .prop_map(|m| Json::Object(m.into_iter().collect())),
        ]
    })
}

fn object_strategy() -> impl Strategy<Value = serde_json::Map<String, Json>> {
    prop::collection::btree_map("[a-z0-9_]{1,8}", json_strategy(), 0..8)
        .prop_map(|m| m.into_iter().collect())
}

fn host() -> Host {
    Host::with_readers(MockEnv::new(), MockStdin::empty())
}

proptest! {
    #[test]
    fn test_json_payloads_decode_unchanged(object in object_strategy()) {
        let bytes = serde_json::to_vec(&object).unwrap();
        prop_assert_eq!(decode(&bytes).unwrap(), object);
    }

    #[test]
    fn test_last_source_wins(values in prop::collection::vec("[a-z]{0,6}", 1..8)) {
        let sources: Vec<VarsSource> = values
            .iter()
            .map(|v| VarsSource::literal("key", v.as_str()))
            .collect();
        let vars = Vars::from_sources(&sources, &host()).unwrap();
        prop_assert_eq!(vars.get("key").unwrap(), &json!(values.last().unwrap()));
    }

    #[test]
    fn test_filter_is_idempotent(
        prefix in "[ab]{0,2}",
        items in prop::collection::vec("[abc]{0,4}", 0..12),
    ) {
        let registry = FunctionRegistry::standard();
        let fixed = [Value::from(prefix)];
        let list: Vec<Value> = items.into_iter().map(Value::from).collect();

        let once = registry.filter("hasPrefix", &fixed, &list).unwrap();
        let twice = registry.filter("hasPrefix", &fixed, &once).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_list_is_identity(index in any::<prop::sample::Index>()) {
        let registry = FunctionRegistry::standard();
        let names: Vec<&str> = registry.names().collect();
        let name = names[index.index(names.len())];

        prop_assert!(registry.map(name, &[], &[]).unwrap().is_empty());
        prop_assert!(registry.map_flip(name, &[], &[]).unwrap().is_empty());
        prop_assert!(registry.filter(name, &[], &[]).unwrap().is_empty());
        prop_assert!(registry.filter_flip(name, &[], &[]).unwrap().is_empty());
    }
}
