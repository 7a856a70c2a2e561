use serde_json::Value;
use tessera_core::{OperatorTable, RemapError, Scope};

pub fn register(table: &mut OperatorTable) {
    table.register("log", log);
}

/// Emit the input as a tracing event and pass it through. `{ "log": "warn" }`.
pub fn log(args: &Value, data: &Value, scope: &Scope<'_>) -> Result<Value, RemapError> {
    let app = scope.context().app_id.as_str();
    match args.as_str().unwrap_or("info") {
        "error" => tracing::error!(app, %data, "remapper log"),
        "warn" => tracing::warn!(app, %data, "remapper log"),
        "debug" => tracing::debug!(app, %data, "remapper log"),
        _ => tracing::info!(app, %data, "remapper log"),
    }
    Ok(data.clone())
}

#[cfg(test)]
mod tests {
    use crate::operators::testing::eval;
    use serde_json::json;

    #[test]
    fn log_passes_input_through() {
        let data = json!({ "k": [1, 2] });
        assert_eq!(eval(json!({ "log": "debug" }), data.clone()).unwrap(), data);
        assert_eq!(eval(json!({ "log": null }), data.clone()).unwrap(), data);
    }
}
