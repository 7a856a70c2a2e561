use super::expect_array;
use serde_json::{Map, Value};
use tessera_core::{OperatorTable, RemapError, Scope};

pub fn register(table: &mut OperatorTable) {
    table
        .register("object.from", from)
        .register("object.assign", assign)
        .register("object.omit", omit)
        .register("null.strip", null_strip);
}

fn evaluate_fields(
    operator: &str,
    args: &Value,
    data: &Value,
    scope: &Scope<'_>,
) -> Result<Map<String, Value>, RemapError> {
    let fields = args
        .as_object()
        .ok_or_else(|| RemapError::operator(operator, format!("expected an object, got {args}")))?;
    fields
        .iter()
        .map(|(key, remapper)| Ok::<_, RemapError>((key.clone(), scope.evaluate_value(remapper, data)?)))
        .collect()
}

/// Build a new object; each value is a remapper over the input.
pub fn from(args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    evaluate_fields("object.from", args, data, scope).map(Value::Object)
}

/// Like `object.from`, but merged over the input object.
pub fn assign(args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    let mut base = data.as_object().cloned().unwrap_or_default();
    base.extend(evaluate_fields("object.assign", args, data, scope)?);
    Ok(Value::Object(base))
}

/// Remove keys from the input. A key may be a path given as an array of segments.
pub fn omit(args: &Value, data: &Value, _scope: &Scope<'_>) -> Result<Value, RemapError> {
    let mut result = data.clone();
    for key in expect_array("object.omit", args)? {
        match key {
            Value::String(key) => {
                if let Some(map) = result.as_object_mut() {
                    map.remove(key);
                }
            }
            Value::Array(path) => remove_path(&mut result, path),
            other => {
                return Err(RemapError::operator(
                    "object.omit",
                    format!("invalid key {other}"),
                ));
            }
        }
    }
    Ok(result)
}

fn remove_path(value: &mut Value, path: &[Value]) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = value;
    for segment in parents {
        let Some(next) = segment.as_str().and_then(|key| current.get_mut(key)) else {
            return;
        };
        current = next;
    }
    if let (Some(map), Some(key)) = (current.as_object_mut(), last.as_str()) {
        map.remove(key);
    }
}

/// Drop `null` entries from objects and arrays. `{ "depth": n }` limits recursion.
pub fn null_strip(args: &Value, data: &Value, _scope: &Scope<'_>) -> Result<Value, RemapError> {
    let depth = match args {
        Value::Null => usize::MAX,
        Value::Object(options) => options
            .get("depth")
            .and_then(Value::as_u64)
            .map(|d| d as usize)
            .ok_or_else(|| RemapError::operator("null.strip", "`depth` must be a positive integer"))?,
        other => {
            return Err(RemapError::operator(
                "null.strip",
                format!("expected null or {{ depth }}, got {other}"),
            ));
        }
    };
    Ok(strip(data, depth))
}

fn strip(value: &Value, depth: usize) -> Value {
    if depth == 0 {
        return value.clone();
    }
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip(v, depth - 1)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .filter(|v| !v.is_null())
                .map(|v| strip(v, depth - 1))
                .collect(),
        ),
        other => other.clone(),
    }
}
