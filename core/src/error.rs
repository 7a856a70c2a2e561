//! Error taxonomy shared by every layer of the engine.
//!
//! Every failure that leaves the dispatcher is an [`ActionError`]. Blocks and HTTP
//! handlers never inspect the Rust variant directly; they receive
//! [`ActionError::to_payload`], a discriminated JSON object with a stable `kind`.

use crate::host::HostError;
use crate::remap::RemapError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Stable discriminant of an [`ActionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Configuration,
    Host,
    Cancelled,
    Navigation,
    Rejected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Host => "host",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Navigation => "navigation",
            ErrorKind::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single action dispatch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    /// Malformed remapper or action reference.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown action type, or an action kind used outside of its context.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A Host Adapter capability call failed.
    #[error(transparent)]
    Host(#[from] HostError),

    /// The owning scope was torn down, or a wait timed out.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// A `flow.to` target does not exist.
    #[error("navigation error: {0}")]
    Navigation(String),

    /// Raised by the `throw` action, or by an event emitted with its error flag set.
    #[error("action rejected")]
    Rejected(Value),
}

impl ActionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::Validation(_) => ErrorKind::Validation,
            ActionError::Configuration(_) => ErrorKind::Configuration,
            ActionError::Host(_) => ErrorKind::Host,
            ActionError::Cancelled(_) => ErrorKind::Cancelled,
            ActionError::Navigation(_) => ErrorKind::Navigation,
            ActionError::Rejected(_) => ErrorKind::Rejected,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, ActionError::Cancelled(_))
    }

    /// The payload handed to `onError` handlers and to block boundaries.
    ///
    /// Shape: `{ "kind": "...", "message": "...", "status"?: u16, "data"?: any }`.
    pub fn to_payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("kind".into(), Value::from(self.kind().as_str()));
        payload.insert("message".into(), Value::from(self.to_string()));
        match self {
            ActionError::Host(err) => {
                payload.insert("status".into(), Value::from(err.status()));
                if let Some(data) = err.data() {
                    payload.insert("data".into(), data.clone());
                }
            }
            ActionError::Rejected(data) => {
                payload.insert("data".into(), data.clone());
            }
            _ => {}
        }
        Value::Object(payload)
    }
}

impl From<RemapError> for ActionError {
    fn from(err: RemapError) -> Self {
        ActionError::Validation(err.to_string())
    }
}
