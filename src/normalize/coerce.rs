use serde_json::{Map, Value};

/// Elements of `value` if it is an array, otherwise an empty list.
///
/// `None` stands for an absent field; `Some(Value::Null)` for an explicit
/// null. Both, like objects and scalars, yield an empty list.
pub fn ensure_array(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// Text of a scalar value.
///
/// Strings are returned as-is, numbers and booleans in their JSON spelling.
/// Null yields `None`; arrays and objects are rendered as compact JSON.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// String field of an object, `""` when absent or not a scalar
pub fn string_field(map: &Map<String, Value>, key: &str) -> String {
    string_field_or(map, key, "")
}

/// String field of an object with an explicit default.
///
/// Empty strings fall back to the default as well.
pub fn string_field_or(map: &Map<String, Value>, key: &str, default: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => default.to_string(),
    }
}

/// List of strings from an array field.
///
/// Numbers and booleans are stringified; nulls, arrays and objects dropped.
pub fn string_list(map: &Map<String, Value>, key: &str) -> Vec<String> {
    ensure_array(map.get(key))
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .collect()
}

/// Objects of an array field, mapped through `convert`. Non-objects are dropped.
pub fn object_list<T>(
    map: &Map<String, Value>,
    key: &str,
    convert: impl Fn(&Map<String, Value>) -> T,
) -> Vec<T> {
    ensure_array(map.get(key))
        .iter()
        .filter_map(Value::as_object)
        .map(convert)
        .collect()
}

/// Object view of a value; anything else is treated as an empty object
pub fn as_object_or_empty(value: &Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    }
}
