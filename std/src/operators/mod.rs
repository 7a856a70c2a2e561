pub mod array;
pub mod data;
pub mod debug;
pub mod logic;
pub mod object;
pub mod string;

use serde_json::Value;
use tessera_core::RemapError;

/// Walk `path` into `value`. Segments are separated by `.`; numeric segments
/// also index arrays. A missing segment yields `null`.
pub fn lookup_path(value: &Value, path: &str) -> Value {
    if path.is_empty() {
        return value.clone();
    }
    let mut current = value;
    for segment in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(next) => current = next,
            None => return Value::Null,
        }
    }
    current.clone()
}

/// Text form used when a value is spliced into a string: strings stay bare,
/// `null` becomes empty, everything else is its JSON encoding.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn expect_str<'a>(operator: &str, args: &'a Value) -> Result<&'a str, RemapError> {
    args.as_str()
        .ok_or_else(|| RemapError::operator(operator, format!("expected a string, got {args}")))
}

pub(crate) fn expect_array<'a>(operator: &str, args: &'a Value) -> Result<&'a Vec<Value>, RemapError> {
    args.as_array()
        .ok_or_else(|| RemapError::operator(operator, format!("expected an array, got {args}")))
}

#[cfg(test)]
pub(crate) mod testing {
    use serde_json::Value;
    use tessera_core::{RemapError, RemapperContext};

    pub fn eval(remapper: Value, data: Value) -> Result<Value, RemapError> {
        eval_in(remapper, data, &RemapperContext::new("test-app"))
    }

    pub fn eval_in(remapper: Value, data: Value, context: &RemapperContext) -> Result<Value, RemapError> {
        crate::standard_evaluator().evaluate_value(&remapper, &data, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn paths_walk_objects_and_arrays() {
        let data = json!({ "people": [{ "name": "Ada" }, { "name": "Grace" }] });
        assert_eq!(lookup_path(&data, "people.1.name"), json!("Grace"));
        assert_eq!(lookup_path(&data, "people.7.name"), Value::Null);
        assert_eq!(lookup_path(&data, ""), data);
    }

    #[test]
    fn text_form() {
        assert_eq!(to_text(&json!("x")), "x");
        assert_eq!(to_text(&json!(null)), "");
        assert_eq!(to_text(&json!(3)), "3");
        assert_eq!(to_text(&json!({ "a": 1 })), r#"{"a":1}"#);
    }
}
