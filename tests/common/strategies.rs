// proptest strategies for arbitrary JSON documents

use proptest::prelude::*;
use serde_json::{json, Value};

/// Arbitrary JSON without floats, nested up to three levels
pub fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ,.:]{0,12}".prop_map(Value::String),
    ];

    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..4)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

/// Option sets as models send them: lists, keyed objects, or junk
pub fn raw_options() -> impl Strategy<Value = Value> {
    prop_oneof![
        prop::collection::vec(prop::option::of("[A-Za-z0-9 ]{0,8}"), 0..6)
            .prop_map(|items| json!(items)),
        prop::collection::vec(("[a-d]", "[A-Za-z0-9 ]{0,8}"), 0..5)
            .prop_map(|entries| Value::Object(entries.into_iter().map(|(k, v)| (k, json!(v))).collect())),
        json_value(),
    ]
}

/// Correct answers as models send them
pub fn raw_answer() -> impl Strategy<Value = Value> {
    prop_oneof![
        (-3i64..8).prop_map(|n| json!(n)),
        "[a-fA-F]".prop_map(Value::String),
        "[A-Za-z0-9 ]{0,10}".prop_map(Value::String),
        Just(Value::Null),
        json_value(),
    ]
}
