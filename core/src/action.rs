//! Action definitions.
//!
//! An [`ActionDefinition`] is parsed once from the app definition and never
//! mutated. The `type` string is resolved here, at load time; a type the resolver
//! does not know still loads as [`ActionKind::Unresolved`] and only fails when it
//! is dispatched.

use crate::error::ActionError;
use crate::host::Capability;
use crate::remap::Remapper;
use crate::resolver::{self, ActionType, FlowOp};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const RESERVED_KEYS: [&str; 5] = ["type", "remapBefore", "remapAfter", "onSuccess", "onError"];

#[derive(Debug, Clone, PartialEq)]
pub struct ActionDefinition {
    pub kind: ActionKind,
    pub remap_before: Option<Remapper>,
    pub remap_after: Option<Remapper>,
    pub on_success: Option<Box<ActionDefinition>>,
    pub on_error: Option<Box<ActionDefinition>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCase {
    pub case: Remapper,
    pub action: ActionDefinition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowAction {
    Next,
    Back,
    To(String),
    Finish,
    Cancel,
}

/// A delegate action: a capability plus its still-unevaluated arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct HostAction {
    pub capability: Capability,
    pub params: BTreeMap<String, Remapper>,
}

impl HostAction {
    pub fn param(&self, name: &str) -> Option<&Remapper> {
        self.params.get(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    Noop,
    Throw,
    Log {
        level: LogLevel,
    },
    Static {
        value: Value,
    },
    Condition {
        condition: Remapper,
        then: Box<ActionDefinition>,
        otherwise: Option<Box<ActionDefinition>>,
    },
    Match {
        cases: Vec<MatchCase>,
    },
    Each {
        body: Box<ActionDefinition>,
        serial: bool,
    },
    Event {
        event: String,
        wait_for: Option<String>,
    },
    Flow(FlowAction),
    Host(HostAction),
    /// A `type` the resolver does not know.
    Unresolved(String),
}

impl ActionKind {
    pub fn name(&self) -> &str {
        match self {
            ActionKind::Noop => "noop",
            ActionKind::Throw => "throw",
            ActionKind::Log { .. } => "log",
            ActionKind::Static { .. } => "static",
            ActionKind::Condition { .. } => "condition",
            ActionKind::Match { .. } => "match",
            ActionKind::Each { .. } => "each",
            ActionKind::Event { .. } => "event",
            ActionKind::Flow(flow) => match flow {
                FlowAction::Next => "flow.next",
                FlowAction::Back => "flow.back",
                FlowAction::To(_) => "flow.to",
                FlowAction::Finish => "flow.finish",
                FlowAction::Cancel => "flow.cancel",
            },
            ActionKind::Host(host) => host.capability.as_str(),
            ActionKind::Unresolved(name) => name,
        }
    }
}

impl ActionDefinition {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            remap_before: None,
            remap_after: None,
            on_success: None,
            on_error: None,
        }
    }

    pub fn noop() -> Self {
        Self::new(ActionKind::Noop)
    }

    pub fn on_success(mut self, action: ActionDefinition) -> Self {
        self.on_success = Some(Box::new(action));
        self
    }

    pub fn on_error(mut self, action: ActionDefinition) -> Self {
        self.on_error = Some(Box::new(action));
        self
    }

    pub fn kind_name(&self) -> &str {
        self.kind.name()
    }

    pub fn from_value(value: &Value) -> Result<Self, ActionError> {
        let map = value
            .as_object()
            .ok_or_else(|| invalid("an action must be an object"))?;
        let type_name = map
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("an action requires a string `type`"))?;

        let kind = match resolver::resolve(type_name) {
            Ok(action_type) => parse_kind(action_type, map)?,
            Err(_) => ActionKind::Unresolved(type_name.to_string()),
        };

        Ok(Self {
            kind,
            remap_before: optional_remapper(map, "remapBefore")?,
            remap_after: optional_remapper(map, "remapAfter")?,
            on_success: optional_action(map, "onSuccess")?,
            on_error: optional_action(map, "onError")?,
        })
    }
}

impl<'de> Deserialize<'de> for ActionDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ActionDefinition::from_value(&value).map_err(serde::de::Error::custom)
    }
}

fn parse_kind(action_type: ActionType, map: &Map<String, Value>) -> Result<ActionKind, ActionError> {
    let kind = match action_type {
        ActionType::Noop => ActionKind::Noop,
        ActionType::Throw => ActionKind::Throw,
        ActionType::Log => ActionKind::Log {
            level: match map.get("level").and_then(Value::as_str) {
                None | Some("info") => LogLevel::Info,
                Some("debug") => LogLevel::Debug,
                Some("warn") => LogLevel::Warn,
                Some("error") => LogLevel::Error,
                Some(other) => return Err(invalid(format!("unknown log level `{other}`"))),
            },
        },
        ActionType::Static => ActionKind::Static {
            value: map.get("value").cloned().unwrap_or(Value::Null),
        },
        ActionType::Condition => ActionKind::Condition {
            condition: required_remapper(map, "if")?,
            then: Box::new(required_action(map, "then")?),
            otherwise: optional_action(map, "else")?,
        },
        ActionType::Match => {
            let cases = map
                .get("match")
                .and_then(Value::as_array)
                .ok_or_else(|| invalid("`match` requires an array of cases"))?;
            ActionKind::Match {
                cases: cases
                    .iter()
                    .map(parse_case)
                    .collect::<Result<Vec<_>, _>>()?,
            }
        }
        ActionType::Each => ActionKind::Each {
            body: Box::new(required_action(map, "do")?),
            serial: map.get("serial").and_then(Value::as_bool).unwrap_or(false),
        },
        ActionType::Event => ActionKind::Event {
            event: required_str(map, "event")?,
            wait_for: map.get("waitFor").and_then(Value::as_str).map(str::to_string),
        },
        ActionType::Flow(op) => ActionKind::Flow(match op {
            FlowOp::Next => FlowAction::Next,
            FlowOp::Back => FlowAction::Back,
            FlowOp::To => FlowAction::To(required_str(map, "to")?),
            FlowOp::Finish => FlowAction::Finish,
            FlowOp::Cancel => FlowAction::Cancel,
        }),
        ActionType::Host(capability) => {
            let params = map
                .iter()
                .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
                .map(|(key, value)| Ok::<_, ActionError>((key.clone(), Remapper::parse(value)?)))
                .collect::<Result<BTreeMap<_, _>, ActionError>>()?;
            ActionKind::Host(HostAction { capability, params })
        }
    };
    Ok(kind)
}

fn parse_case(value: &Value) -> Result<MatchCase, ActionError> {
    let map = value
        .as_object()
        .ok_or_else(|| invalid("a match case must be an object"))?;
    Ok(MatchCase {
        case: required_remapper(map, "case")?,
        action: required_action(map, "action")?,
    })
}

fn invalid(message: impl Into<String>) -> ActionError {
    ActionError::Validation(message.into())
}

fn required_str(map: &Map<String, Value>, key: &str) -> Result<String, ActionError> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| invalid(format!("`{key}` must be a string")))
}

fn required_remapper(map: &Map<String, Value>, key: &str) -> Result<Remapper, ActionError> {
    let value = map
        .get(key)
        .ok_or_else(|| invalid(format!("missing `{key}`")))?;
    Ok(Remapper::parse(value)?)
}

fn optional_remapper(map: &Map<String, Value>, key: &str) -> Result<Option<Remapper>, ActionError> {
    map.get(key)
        .map(|value| Remapper::parse(value).map_err(ActionError::from))
        .transpose()
}

fn required_action(map: &Map<String, Value>, key: &str) -> Result<ActionDefinition, ActionError> {
    let value = map
        .get(key)
        .ok_or_else(|| invalid(format!("missing `{key}` action")))?;
    ActionDefinition::from_value(value)
}

fn optional_action(
    map: &Map<String, Value>,
    key: &str,
) -> Result<Option<Box<ActionDefinition>>, ActionError> {
    map.get(key)
        .map(|value| ActionDefinition::from_value(value).map(Box::new))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::StorageOp;
    use serde_json::json;

    #[test]
    fn parses_nested_control_flow() {
        let action = ActionDefinition::from_value(&json!({
            "type": "condition",
            "if": { "prop": "ok" },
            "then": { "type": "each", "serial": true, "do": { "type": "noop" } },
            "onError": { "type": "log", "level": "warn" }
        }))
        .unwrap();

        let ActionKind::Condition { then, otherwise, .. } = &action.kind else {
            panic!("expected condition, got {:?}", action.kind);
        };
        assert!(otherwise.is_none());
        assert!(matches!(then.kind, ActionKind::Each { serial: true, .. }));
        assert_eq!(action.on_error.unwrap().kind_name(), "log");
    }

    #[test]
    fn host_params_exclude_reserved_keys() {
        let action = ActionDefinition::from_value(&json!({
            "type": "storage.write",
            "key": "k",
            "value": { "prop": "v" },
            "remapAfter": { "root": null }
        }))
        .unwrap();
        let ActionKind::Host(host) = &action.kind else {
            panic!("expected a host action");
        };
        assert_eq!(host.capability, Capability::Storage(StorageOp::Write));
        assert_eq!(host.params.keys().collect::<Vec<_>>(), ["key", "value"]);
        assert!(action.remap_after.is_some());
    }

    #[test]
    fn unknown_types_still_load() {
        let action = ActionDefinition::from_value(&json!({ "type": "dialog.open" })).unwrap();
        assert_eq!(action.kind, ActionKind::Unresolved("dialog.open".into()));
    }

    #[test]
    fn missing_required_fields_are_validation_errors() {
        let err = ActionDefinition::from_value(&json!({ "type": "flow.to" })).unwrap_err();
        assert!(matches!(err, ActionError::Validation(_)));
        assert!(ActionDefinition::from_value(&json!({ "type": "each" })).is_err());
        assert!(ActionDefinition::from_value(&json!("noop")).is_err());
    }

    #[test]
    fn deserializes_through_serde() {
        let action: ActionDefinition = serde_json::from_value(json!({
            "type": "match",
            "match": [
                { "case": false, "action": { "type": "static", "value": "a" } },
                { "case": true, "action": { "type": "static", "value": "b" } }
            ]
        }))
        .unwrap();
        let ActionKind::Match { cases } = action.kind else {
            panic!("expected match");
        };
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[1].action.kind, ActionKind::Static { value: json!("b") });
    }
}
