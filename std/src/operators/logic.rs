use super::expect_array;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use tessera_core::{OperatorTable, RemapError, Scope, truthy};

pub fn register(table: &mut OperatorTable) {
    table
        .register("if", if_else)
        .register("match", match_cases)
        .register("equals", equals)
        .register("gt", gt)
        .register("lt", lt)
        .register("not", not)
        .register("and", and)
        .register("or", or);
}

fn fields<'a>(operator: &str, args: &'a Value) -> Result<&'a Map<String, Value>, RemapError> {
    args.as_object()
        .ok_or_else(|| RemapError::operator(operator, format!("expected an object, got {args}")))
}

/// `{ "if": { "condition": r, "then": r, "else": r } }`. Only the chosen branch is evaluated.
pub fn if_else(args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    let fields = fields("if", args)?;
    let condition = fields
        .get("condition")
        .ok_or_else(|| RemapError::operator("if", "missing `condition`"))?;
    let branch = if truthy(&scope.evaluate_value(condition, data)?) {
        fields.get("then")
    } else {
        fields.get("else")
    };
    match branch {
        Some(branch) => scope.evaluate_value(branch, data),
        None => Ok(Value::Null),
    }
}

/// `{ "match": [{ "case": r, "value": r }] }`. First truthy case wins; none gives `null`.
pub fn match_cases(args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    for case in expect_array("match", args)? {
        let case = fields("match", case)?;
        let condition = case
            .get("case")
            .ok_or_else(|| RemapError::operator("match", "missing `case`"))?;
        if truthy(&scope.evaluate_value(condition, data)?) {
            return match case.get("value") {
                Some(value) => scope.evaluate_value(value, data),
                None => Ok(Value::Null),
            };
        }
    }
    Ok(Value::Null)
}

fn evaluate_all(operator: &str, args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Vec<Value>, RemapError> {
    expect_array(operator, args)?
        .iter()
        .map(|remapper| scope.evaluate_value(remapper, data))
        .collect()
}

/// True when every evaluated operand is equal. Fewer than two operands is `true`.
pub fn equals(args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    let values = evaluate_all("equals", args, data, scope)?;
    Ok(Value::Bool(values.windows(2).all(|pair| pair[0] == pair[1])))
}

fn compare(operator: &str, args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Option<Ordering>, RemapError> {
    let values = evaluate_all(operator, args, data, scope)?;
    let [left, right] = values.as_slice() else {
        return Err(RemapError::operator(operator, "expected exactly two operands"));
    };
    Ok(match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64().zip(b.as_f64()).and_then(|(a, b)| a.partial_cmp(&b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    })
}

/// Numbers and strings compare; mixed operands are never greater.
pub fn gt(args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    Ok(Value::Bool(compare("gt", args, data, scope)? == Some(Ordering::Greater)))
}

pub fn lt(args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    Ok(Value::Bool(compare("lt", args, data, scope)? == Some(Ordering::Less)))
}

/// Negated truthiness of the evaluated argument. `{ "not": [] }` negates the input.
pub fn not(args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    Ok(Value::Bool(!truthy(&scope.evaluate_value(args, data)?)))
}

/// Short-circuits on the first falsy operand.
pub fn and(args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    for remapper in expect_array("and", args)? {
        if !truthy(&scope.evaluate_value(remapper, data)?) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

pub fn or(args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    for remapper in expect_array("or", args)? {
        if truthy(&scope.evaluate_value(remapper, data)?) {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

#[cfg(test)]
mod tests {
    use crate::operators::testing::eval;
    use serde_json::json;

    #[test]
    fn if_evaluates_only_the_chosen_branch() {
        let remapper = json!({ "if": {
            "condition": { "prop": "admin" },
            "then": "welcome back",
            "else": { "unknown.operator": null }
        }});
        assert_eq!(eval(remapper.clone(), json!({ "admin": true })).unwrap(), json!("welcome back"));
        assert!(eval(remapper, json!({ "admin": false })).is_err());
    }

    #[test]
    fn match_picks_first_truthy_case() {
        let remapper = json!({ "match": [
            { "case": { "equals": [{ "prop": "n" }, 1] }, "value": "one" },
            { "case": true, "value": "many" },
            { "case": true, "value": "unreachable" }
        ]});
        assert_eq!(eval(remapper.clone(), json!({ "n": 1 })).unwrap(), json!("one"));
        assert_eq!(eval(remapper, json!({ "n": 5 })).unwrap(), json!("many"));
        assert_eq!(eval(json!({ "match": [] }), json!(null)).unwrap(), json!(null));
    }

    #[test]
    fn comparisons() {
        let data = json!({ "age": 30, "name": "b" });
        assert_eq!(eval(json!({ "gt": [{ "prop": "age" }, 18] }), data.clone()).unwrap(), json!(true));
        assert_eq!(eval(json!({ "lt": [{ "prop": "age" }, 18] }), data.clone()).unwrap(), json!(false));
        assert_eq!(eval(json!({ "lt": ["a", { "prop": "name" }] }), data.clone()).unwrap(), json!(true));
        assert_eq!(eval(json!({ "gt": ["a", 1] }), data.clone()).unwrap(), json!(false));
        assert!(eval(json!({ "gt": [1] }), data).is_err());
    }

    #[test]
    fn boolean_logic() {
        assert_eq!(eval(json!({ "not": [] }), json!("")).unwrap(), json!(true));
        assert_eq!(eval(json!({ "and": [true, 1, "x"] }), json!(null)).unwrap(), json!(true));
        assert_eq!(eval(json!({ "and": [true, 0] }), json!(null)).unwrap(), json!(false));
        assert_eq!(eval(json!({ "or": [null, { "prop": "x" }] }), json!({ "x": 2 })).unwrap(), json!(true));
        assert_eq!(eval(json!({ "or": [] }), json!(null)).unwrap(), json!(false));
        assert_eq!(eval(json!({ "equals": [1, 1, 1] }), json!(null)).unwrap(), json!(true));
    }
}
