//! App definitions: pages, blocks, flows, and webhooks.
//!
//! Definitions are assumed schema-valid; parsing only checks what the engine
//! itself relies on.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tessera_core::{ActionDefinition, ActionError, EventsDefinition};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDefinition {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub actions: BTreeMap<String, ActionDefinition>,
    #[serde(default)]
    pub events: EventsDefinition,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubPageDefinition {
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<BlockDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FlowKind {
    /// Named subpages, visited in order.
    Flow { steps: Vec<SubPageDefinition> },
    /// One copy of `foreach` per item of the data the page is mounted with.
    Loop { foreach: SubPageDefinition },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDefinition {
    #[serde(flatten)]
    pub kind: FlowKind,
    #[serde(default)]
    pub on_flow_finish: Option<ActionDefinition>,
    #[serde(default)]
    pub on_flow_cancel: Option<ActionDefinition>,
    #[serde(default)]
    pub retain_flow_data: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageDefinition {
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<BlockDefinition>,
    #[serde(default)]
    pub flow: Option<FlowDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookDefinition {
    pub action: ActionDefinition,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub variables: Map<String, Value>,
    #[serde(default)]
    pub pages: Vec<PageDefinition>,
    #[serde(default)]
    pub webhooks: BTreeMap<String, WebhookDefinition>,
    /// The definition as loaded, for path lookups.
    #[serde(skip)]
    raw: Value,
}

impl AppDefinition {
    pub fn from_value(raw: Value) -> Result<Self, ActionError> {
        let mut app: AppDefinition = serde_json::from_value(raw.clone())
            .map_err(|err| ActionError::Validation(format!("invalid app definition: {err}")))?;
        app.raw = raw;
        Ok(app)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn page(&self, name: &str) -> Option<&PageDefinition> {
        self.pages.iter().find(|page| page.name == name)
    }

    pub fn webhook(&self, name: &str) -> Option<&ActionDefinition> {
        self.webhooks.get(name).map(|webhook| &webhook.action)
    }

    /// Resolve an action by its path in the definition, e.g.
    /// `pages.checkout.blocks.0.actions.onSubmit`. Segments are separated by `.`
    /// or `/`; a non-numeric segment into a list matches an item's `name`.
    pub fn action_at(&self, path: &str) -> Result<ActionDefinition, ActionError> {
        let mut current = &self.raw;
        for segment in path.split(['.', '/']).filter(|s| !s.is_empty()) {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => match segment.parse::<usize>() {
                    Ok(index) => items.get(index),
                    Err(_) => items
                        .iter()
                        .find(|item| item.get("name").and_then(Value::as_str) == Some(segment)),
                },
                _ => None,
            };
            current = next.ok_or_else(|| {
                ActionError::Validation(format!("no action at `{path}`"))
            })?;
        }
        ActionDefinition::from_value(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tessera_core::ActionKind;

    fn app() -> AppDefinition {
        AppDefinition::from_value(json!({
            "pages": [
                {
                    "name": "people",
                    "blocks": [{
                        "type": "list",
                        "actions": { "onClick": { "type": "link", "to": "person" } },
                        "events": { "listen": { "data": "people.refreshed" } }
                    }]
                },
                {
                    "name": "signup",
                    "flow": {
                        "type": "flow",
                        "steps": [{ "name": "account" }, { "name": "profile" }],
                        "onFlowFinish": { "type": "resource.create", "resource": "person" },
                        "retainFlowData": true
                    }
                }
            ],
            "webhooks": { "ping": { "action": { "type": "noop" } } }
        }))
        .unwrap()
    }

    #[test]
    fn parses_pages_and_flows() {
        let app = app();
        let signup = app.page("signup").unwrap();
        let flow = signup.flow.as_ref().unwrap();
        assert!(flow.retain_flow_data);
        assert!(matches!(&flow.kind, FlowKind::Flow { steps } if steps.len() == 2));
        assert_eq!(
            app.page("people").unwrap().blocks[0].events.listen_channel("data"),
            Some("people.refreshed")
        );
        assert_eq!(app.webhook("ping").unwrap().kind, ActionKind::Noop);
    }

    #[test]
    fn resolves_actions_by_path() {
        let app = app();
        let by_name = app.action_at("pages/people/blocks/0/actions/onClick").unwrap();
        let by_index = app.action_at("pages.0.blocks.0.actions.onClick").unwrap();
        assert_eq!(by_name, by_index);
        assert_eq!(by_name.kind_name(), "link");
        assert!(app.action_at("pages.people.blocks.3").is_err());
    }
}
