use super::{expect_str, lookup_path, to_text};
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tessera_core::{OperatorTable, RemapError, Scope};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_.]*)\}").expect("placeholder pattern is a valid regex")
});

pub fn register(table: &mut OperatorTable) {
    table
        .register("string.case", case)
        .register("string.format", format)
        .register("string.replace", replace);
}

fn input_str<'a>(operator: &str, data: &'a Value) -> Result<&'a str, RemapError> {
    data.as_str()
        .ok_or_else(|| RemapError::operator(operator, format!("input must be a string, got {data}")))
}

/// `{ "string.case": "upper" }` or `"lower"`.
pub fn case(args: &Value, data: &Value, _scope: &Scope<'_>) -> Result<Value, RemapError> {
    let input = input_str("string.case", data)?;
    match expect_str("string.case", args)? {
        "upper" => Ok(Value::from(input.to_uppercase())),
        "lower" => Ok(Value::from(input.to_lowercase())),
        other => Err(RemapError::operator("string.case", format!("unknown case `{other}`"))),
    }
}

/// `{ "string.format": { "template": "Hi {name}", "values": { "name": r } } }`.
///
/// Placeholders without a value are left untouched.
pub fn format(args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    let fields = args
        .as_object()
        .ok_or_else(|| RemapError::operator("string.format", "expected { template, values }"))?;
    let template = fields
        .get("template")
        .and_then(Value::as_str)
        .ok_or_else(|| RemapError::operator("string.format", "`template` must be a string"))?;

    let mut values = Map::new();
    if let Some(remappers) = fields.get("values").and_then(Value::as_object) {
        for (name, remapper) in remappers {
            values.insert(name.clone(), scope.evaluate_value(remapper, data)?);
        }
    }
    let values = Value::Object(values);

    let formatted = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        match lookup_path(&values, &caps[1]) {
            Value::Null => caps[0].to_string(),
            value => to_text(&value),
        }
    });
    Ok(Value::from(formatted.into_owned()))
}

/// `{ "string.replace": { "<regex>": "<replacement>" } }`, applied in key order.
pub fn replace(args: &Value, data: &Value, _scope: &Scope<'_>) -> Result<Value, RemapError> {
    let rules = args
        .as_object()
        .ok_or_else(|| RemapError::operator("string.replace", "expected { pattern: replacement }"))?;
    let mut output = input_str("string.replace", data)?.to_string();
    for (pattern, replacement) in rules {
        let regex = Regex::new(pattern)
            .map_err(|err| RemapError::operator("string.replace", err.to_string()))?;
        let replacement = replacement
            .as_str()
            .ok_or_else(|| RemapError::operator("string.replace", "replacements must be strings"))?;
        output = regex.replace_all(&output, replacement).into_owned();
    }
    Ok(Value::from(output))
}

#[cfg(test)]
mod tests {
    use crate::operators::testing::eval;
    use serde_json::json;

    #[test]
    fn changes_case() {
        assert_eq!(eval(json!({ "string.case": "upper" }), json!("abc")).unwrap(), json!("ABC"));
        assert!(eval(json!({ "string.case": "title" }), json!("abc")).is_err());
        assert!(eval(json!({ "string.case": "upper" }), json!(1)).is_err());
    }

    #[test]
    fn formats_templates() {
        let out = eval(
            json!({ "string.format": {
                "template": "{greeting}, {who.name}! You have {count} new {unknown}",
                "values": {
                    "greeting": "Hello",
                    "who": { "root": null },
                    "count": { "len": [] }
                }
            }}),
            json!({ "name": "Ada" }),
        )
        .unwrap();
        assert_eq!(out, json!("Hello, Ada! You have 1 new {unknown}"));
    }

    #[test]
    fn placeholders_are_found_on_every_call() {
        for (name, expected) in [("Ada", "Hi Ada"), ("Grace", "Hi Grace")] {
            let out = eval(
                json!({ "string.format": { "template": "Hi {name}", "values": { "name": { "prop": "name" } } } }),
                json!({ "name": name }),
            )
            .unwrap();
            assert_eq!(out, json!(expected));
        }
        let untouched = eval(json!({ "string.format": { "template": "{ spaced } {1st}" } }), json!({})).unwrap();
        assert_eq!(untouched, json!("{ spaced } {1st}"));
    }

    #[test]
    fn replaces_with_regex() {
        assert_eq!(
            eval(json!({ "string.replace": { "\\s+": "-" } }), json!("a  b c")).unwrap(),
            json!("a-b-c")
        );
        assert!(eval(json!({ "string.replace": { "(": "" } }), json!("x")).is_err());
    }
}
