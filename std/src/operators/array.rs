use super::{expect_array, expect_str};
use serde_json::Value;
use tessera_core::{OperatorTable, RemapError, Scope, truthy};

pub fn register(table: &mut OperatorTable) {
    table
        .register("array", position)
        .register("array.map", map)
        .register("array.filter", filter)
        .register("array.from", from)
        .register("array.append", append)
        .register("array.unique", unique)
        .register("len", len);
}

/// `{ "array": "index" }` or `{ "array": "length" }` inside `array.map` / `array.filter`.
pub fn position(args: &Value, _data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    let frame = scope
        .array()
        .ok_or_else(|| RemapError::operator("array", "used outside of an array operator"))?;
    match expect_str("array", args)? {
        "index" => Ok(Value::from(frame.index)),
        "length" => Ok(Value::from(frame.length)),
        other => Err(RemapError::operator("array", format!("unknown property `{other}`"))),
    }
}

/// Apply a remapper to each item. Non-array input maps to `[]`.
pub fn map(args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    let Some(items) = data.as_array() else {
        return Ok(Value::Array(Vec::new()));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| scope.with_array(i, items.len()).evaluate_value(args, item))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

/// Keep the items for which the remapper is truthy.
pub fn filter(args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    let Some(items) = data.as_array() else {
        return Ok(Value::Array(Vec::new()));
    };
    let mut kept = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        if truthy(&scope.with_array(i, items.len()).evaluate_value(args, item)?) {
            kept.push(item.clone());
        }
    }
    Ok(Value::Array(kept))
}

/// A new array, one item per remapper.
pub fn from(args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    expect_array("array.from", args)?
        .iter()
        .map(|remapper| scope.evaluate_value(remapper, data))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

/// The input array extended with the evaluated remappers.
pub fn append(args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    let mut items = data.as_array().cloned().unwrap_or_default();
    for remapper in expect_array("array.append", args)? {
        items.push(scope.evaluate_value(remapper, data)?);
    }
    Ok(Value::Array(items))
}

/// Deduplicate, keeping first occurrences. With a remapper, items are compared by its result.
pub fn unique(args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    let Some(items) = data.as_array() else {
        return Ok(data.clone());
    };
    let mut seen: Vec<Value> = Vec::new();
    let mut kept = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let key = if args.is_null() {
            item.clone()
        } else {
            scope.with_array(i, items.len()).evaluate_value(args, item)?
        };
        if !seen.contains(&key) {
            seen.push(key);
            kept.push(item.clone());
        }
    }
    Ok(Value::Array(kept))
}

/// Length of an array, object, or string (in characters). Anything else is 0.
pub fn len(_args: &Value, data: &Value, _scope: &Scope<'_>) -> Result<Value, RemapError> {
    let length = match data {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        Value::String(s) => s.chars().count(),
        _ => 0,
    };
    Ok(Value::from(length))
}
