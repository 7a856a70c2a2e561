//! Action Resolver
//!
//! The only place where action type strings exist. Everything past this boundary
//! matches on [`ActionType`].

use crate::error::ActionError;
use crate::host::{Capability, GroupOp};
use ahash::AHashMap;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowOp {
    Next,
    Back,
    To,
    Finish,
    Cancel,
}

/// Resolved action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    Noop,
    Throw,
    Log,
    Static,
    Condition,
    Match,
    Each,
    Event,
    Flow(FlowOp),
    Host(Capability),
}

/// Legacy names kept for definitions written before groups were renamed.
const ALIASES: [(&str, Capability); 4] = [
    ("team.join", Capability::Group(GroupOp::Join)),
    ("team.list", Capability::Group(GroupOp::List)),
    ("team.invite", Capability::Group(GroupOp::Invite)),
    ("team.members", Capability::Group(GroupOp::Members)),
];

static TABLE: LazyLock<AHashMap<&'static str, ActionType>> = LazyLock::new(|| {
    let mut table = AHashMap::new();
    table.insert("noop", ActionType::Noop);
    table.insert("throw", ActionType::Throw);
    table.insert("log", ActionType::Log);
    table.insert("static", ActionType::Static);
    table.insert("condition", ActionType::Condition);
    table.insert("match", ActionType::Match);
    table.insert("each", ActionType::Each);
    table.insert("event", ActionType::Event);
    table.insert("flow.next", ActionType::Flow(FlowOp::Next));
    table.insert("flow.back", ActionType::Flow(FlowOp::Back));
    table.insert("flow.to", ActionType::Flow(FlowOp::To));
    table.insert("flow.finish", ActionType::Flow(FlowOp::Finish));
    table.insert("flow.cancel", ActionType::Flow(FlowOp::Cancel));
    for capability in Capability::ALL {
        table.insert(capability.as_str(), ActionType::Host(capability));
    }
    for (name, capability) in ALIASES {
        table.insert(name, ActionType::Host(capability));
    }
    table
});

pub fn resolve(action_type: &str) -> Result<ActionType, ActionError> {
    TABLE
        .get(action_type)
        .copied()
        .ok_or_else(|| ActionError::Configuration(format!("unknown action type `{action_type}`")))
}

/// Every accepted type name, sorted.
pub fn known_types() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = TABLE.keys().copied().collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::host::{LinkOp, MemberOp, ResourceOp};

    #[test]
    fn resolves_native_and_delegate_kinds() {
        assert_eq!(resolve("each").unwrap(), ActionType::Each);
        assert_eq!(resolve("flow.to").unwrap(), ActionType::Flow(FlowOp::To));
        assert_eq!(
            resolve("resource.count").unwrap(),
            ActionType::Host(Capability::Resource(ResourceOp::Count))
        );
        assert_eq!(
            resolve("app.member.role.update").unwrap(),
            ActionType::Host(Capability::Member(MemberOp::RoleUpdate))
        );
        assert_eq!(
            resolve("link.back").unwrap(),
            ActionType::Host(Capability::Link(LinkOp::Back))
        );
    }

    #[test]
    fn team_is_an_alias_of_group() {
        assert_eq!(resolve("team.join").unwrap(), resolve("group.join").unwrap());
    }

    #[test]
    fn unknown_types_are_configuration_errors() {
        let err = resolve("teleport").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn known_types_cover_every_capability() {
        let names = known_types();
        for capability in Capability::ALL {
            assert!(names.contains(&capability.as_str()));
        }
        assert!(names.contains(&"team.members"));
    }
}
