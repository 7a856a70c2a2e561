use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Read-only environment a remapper may observe.
///
/// Operators never read ambient globals. The clock is captured here when the
/// context is created so that evaluation stays repeatable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemapperContext {
    pub app_id: String,
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub page_params: Map<String, Value>,
    #[serde(default)]
    pub variables: Map<String, Value>,
    #[serde(default = "default_locale")]
    pub locale: String,
    pub now: DateTime<Utc>,
    /// Free-form values supplied by the host environment, read by `{ context: path }`.
    #[serde(default)]
    pub values: Map<String, Value>,
}

fn default_locale() -> String {
    "en".to_string()
}

impl RemapperContext {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            user: None,
            page: None,
            page_params: Map::new(),
            variables: Map::new(),
            locale: default_locale(),
            now: Utc::now(),
            values: Map::new(),
        }
    }

    pub fn with_user(mut self, user: Value) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_page(mut self, page: impl Into<String>, params: Map<String, Value>) -> Self {
        self.page = Some(page.into());
        self.page_params = params;
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}
