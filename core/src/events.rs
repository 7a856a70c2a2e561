use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maps a block's local event names to app-level channels.
///
/// Fixed once the block is loaded: a block can only emit on the channels under
/// `emit` and only receive from the channels under `listen`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsDefinition {
    #[serde(default)]
    pub listen: BTreeMap<String, String>,
    #[serde(default)]
    pub emit: BTreeMap<String, String>,
}

impl EventsDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(mut self, local: impl Into<String>, channel: impl Into<String>) -> Self {
        self.listen.insert(local.into(), channel.into());
        self
    }

    pub fn emit(mut self, local: impl Into<String>, channel: impl Into<String>) -> Self {
        self.emit.insert(local.into(), channel.into());
        self
    }

    pub fn listen_channel(&self, local: &str) -> Option<&str> {
        self.listen.get(local).map(String::as_str)
    }

    pub fn emit_channel(&self, local: &str) -> Option<&str> {
        self.emit.get(local).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_declared_names_only() {
        let events: EventsDefinition = serde_json::from_value(json!({
            "emit": { "selected": "person.selected" }
        }))
        .unwrap();
        assert_eq!(events.emit_channel("selected"), Some("person.selected"));
        assert_eq!(events.emit_channel("deleted"), None);
        assert!(events.listen.is_empty());
    }
}
