//! Operators that read: the input, the root, and the remapper context.

use super::{expect_str, lookup_path};
use serde_json::Value;
use tessera_core::{OperatorTable, RemapError, Scope};

pub fn register(table: &mut OperatorTable) {
    table
        .register("prop", prop)
        .register("static", static_value)
        .register("root", root)
        .register("context", context)
        .register("user", user)
        .register("app", app)
        .register("page", page)
        .register("variable", variable)
        .register("date.now", date_now);
}

/// `{ "prop": "a.b" }`, `{ "prop": 0 }` or `{ "prop": ["a", 0] }`.
pub fn prop(args: &Value, data: &Value, _scope: &Scope<'_>) -> Result<Value, RemapError> {
    match args {
        Value::String(path) => Ok(lookup_path(data, path)),
        Value::Number(n) => {
            let index = n
                .as_u64()
                .ok_or_else(|| RemapError::operator("prop", "index must be a non-negative integer"))?;
            Ok(data
                .as_array()
                .and_then(|items| items.get(index as usize))
                .cloned()
                .unwrap_or(Value::Null))
        }
        Value::Array(segments) => {
            let mut current = data.clone();
            for segment in segments {
                current = match segment {
                    Value::String(key) => current.get(key.as_str()).cloned(),
                    Value::Number(n) => n
                        .as_u64()
                        .and_then(|i| current.get(i as usize))
                        .cloned(),
                    other => {
                        return Err(RemapError::operator(
                            "prop",
                            format!("invalid path segment {other}"),
                        ));
                    }
                }
                .unwrap_or(Value::Null);
            }
            Ok(current)
        }
        other => Err(RemapError::operator("prop", format!("invalid path {other}"))),
    }
}

pub fn static_value(args: &Value, _data: &Value, _scope: &Scope<'_>) -> Result<Value, RemapError> {
    Ok(args.clone())
}

/// The input the outermost remapper was evaluated against. Splitting a pipeline
/// into two evaluations gives the second one a new root, so pipelines that use
/// `root` are not associative.
pub fn root(_args: &Value, _data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    Ok(scope.root().clone())
}

/// Host-supplied context values.
pub fn context(args: &Value, _data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    let path = expect_str("context", args)?;
    Ok(lookup_path(&Value::Object(scope.context().values.clone()), path))
}

/// The signed-in user, or `null`. `{ "user": null }` returns the whole user.
pub fn user(args: &Value, _data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    let Some(user) = &scope.context().user else {
        return Ok(Value::Null);
    };
    match args {
        Value::Null => Ok(user.clone()),
        other => Ok(lookup_path(user, expect_str("user", other)?)),
    }
}

pub fn app(args: &Value, _data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    let ctx = scope.context();
    match expect_str("app", args)? {
        "id" => Ok(Value::from(ctx.app_id.as_str())),
        "locale" => Ok(Value::from(ctx.locale.as_str())),
        other => Err(RemapError::operator("app", format!("unknown property `{other}`"))),
    }
}

/// `{ "page": "name" }` or `{ "page": "params" }`.
pub fn page(args: &Value, _data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    let ctx = scope.context();
    match expect_str("page", args)? {
        "name" => Ok(ctx.page.clone().map(Value::from).unwrap_or(Value::Null)),
        "params" => Ok(Value::Object(ctx.page_params.clone())),
        other => Err(RemapError::operator("page", format!("unknown property `{other}`"))),
    }
}

pub fn variable(args: &Value, _data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    let name = expect_str("variable", args)?;
    Ok(scope
        .context()
        .variables
        .get(name)
        .cloned()
        .unwrap_or(Value::Null))
}

/// The context clock as RFC 3339. Evaluation never reads the system clock.
pub fn date_now(_args: &Value, _data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    Ok(Value::from(scope.context().now.to_rfc3339()))
}

#[cfg(test)]
mod tests {
    use crate::operators::testing::{eval, eval_in};
    use chrono::{TimeZone, Utc};
    use serde_json::{Map, json};
    use tessera_core::RemapperContext;

    #[test]
    fn root_does_not_survive_a_split_pipeline() {
        let data = json!({ "a": { "b": 1 } });
        let whole = eval(json!([{ "prop": "a" }, { "root": null }]), data.clone()).unwrap();
        let first = eval(json!({ "prop": "a" }), data.clone()).unwrap();
        let split = eval(json!({ "root": null }), first).unwrap();
        assert_eq!(whole, data);
        assert_eq!(split, json!({ "b": 1 }));
    }

    #[test]
    fn prop_accepts_paths_indexes_and_segments() {
        let data = json!({ "a": { "b": [10, 20] } });
        assert_eq!(eval(json!({ "prop": "a.b.1" }), data.clone()).unwrap(), json!(20));
        assert_eq!(eval(json!({ "prop": ["a", "b", 0] }), data.clone()).unwrap(), json!(10));
        assert_eq!(eval(json!({ "prop": 1 }), json!(["x", "y"])).unwrap(), json!("y"));
        assert_eq!(eval(json!({ "prop": "missing" }), data).unwrap(), json!(null));
        assert!(eval(json!({ "prop": true }), json!({})).is_err());
    }

    #[test]
    fn static_ignores_input() {
        assert_eq!(
            eval(json!({ "static": { "prop": "not evaluated" } }), json!(1)).unwrap(),
            json!({ "prop": "not evaluated" })
        );
    }

    #[test]
    fn context_readers() {
        let mut params = Map::new();
        params.insert("id".into(), json!(7));
        let ctx = RemapperContext::new("shop")
            .with_user(json!({ "name": "Ada", "email": "ada@example.com" }))
            .with_page("orders", params)
            .with_variable("currency", json!("EUR"))
            .with_value("tenant", json!({ "id": "t1" }))
            .with_now(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());

        assert_eq!(eval_in(json!({ "user": "name" }), json!(null), &ctx).unwrap(), json!("Ada"));
        assert_eq!(eval_in(json!({ "app": "id" }), json!(null), &ctx).unwrap(), json!("shop"));
        assert_eq!(eval_in(json!({ "page": "name" }), json!(null), &ctx).unwrap(), json!("orders"));
        assert_eq!(
            eval_in(json!({ "page": "params" }), json!(null), &ctx).unwrap(),
            json!({ "id": 7 })
        );
        assert_eq!(
            eval_in(json!({ "variable": "currency" }), json!(null), &ctx).unwrap(),
            json!("EUR")
        );
        assert_eq!(
            eval_in(json!({ "context": "tenant.id" }), json!(null), &ctx).unwrap(),
            json!("t1")
        );
        assert_eq!(
            eval_in(json!({ "date.now": null }), json!(null), &ctx).unwrap(),
            json!("2024-05-01T12:00:00+00:00")
        );
    }

    #[test]
    fn anonymous_user_is_null() {
        assert_eq!(eval(json!({ "user": "name" }), json!(null)).unwrap(), json!(null));
    }
}
