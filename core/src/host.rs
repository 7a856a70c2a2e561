//! Host Adapter: The Capability Layer
//!
//! A Host Adapter is the engine's only door to the outside world. Delegate actions
//! (`resource.*`, `storage.*`, `link`, ...) remap their arguments and call one
//! method of [`HostAdapter`]; control-flow actions never touch it.
//!
//! Client and server environments implement the same trait. Every method has a
//! default that fails with [`HostError::Unsupported`], so an adapter only writes
//! the capabilities its environment can actually serve.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub type HostResult = Result<Value, HostError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("`{0}` is not available in this environment")]
    Unsupported(Capability),

    #[error("{0} not found")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("upstream responded with {status}: {message}")]
    Upstream {
        status: u16,
        message: String,
        data: Value,
    },

    #[error("transport failure: {0}")]
    Transport(String),
}

impl HostError {
    /// HTTP-flavoured status, used by error payloads and the server ingress.
    pub fn status(&self) -> u16 {
        match self {
            HostError::Unsupported(_) => 501,
            HostError::NotFound(_) => 404,
            HostError::BadRequest(_) => 400,
            HostError::Upstream { status, .. } => *status,
            HostError::Transport(_) => 502,
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            HostError::Upstream { data, .. } if !data.is_null() => Some(data),
            _ => None,
        }
    }
}

/// Which side of the platform an adapter runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Client,
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceOp {
    Query,
    Get,
    Create,
    Update,
    Delete,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOp {
    Read,
    Write,
    Append,
    Subtract,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkOp {
    To,
    Back,
    Next,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserOp {
    Login,
    Register,
    Logout,
    Query,
    Create,
    Update,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupOp {
    Join,
    List,
    Invite,
    Members,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberOp {
    Query,
    RoleUpdate,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationOp {
    Subscribe,
    Unsubscribe,
    Send,
}

/// One callable Host Adapter capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Resource(ResourceOp),
    Storage(StorageOp),
    Link(LinkOp),
    User(UserOp),
    Group(GroupOp),
    Member(MemberOp),
    Email,
    Notification(NotificationOp),
    Request,
}

impl Capability {
    pub const ALL: [Capability; 33] = [
        Capability::Resource(ResourceOp::Query),
        Capability::Resource(ResourceOp::Get),
        Capability::Resource(ResourceOp::Create),
        Capability::Resource(ResourceOp::Update),
        Capability::Resource(ResourceOp::Delete),
        Capability::Resource(ResourceOp::Count),
        Capability::Storage(StorageOp::Read),
        Capability::Storage(StorageOp::Write),
        Capability::Storage(StorageOp::Append),
        Capability::Storage(StorageOp::Subtract),
        Capability::Storage(StorageOp::Delete),
        Capability::Link(LinkOp::To),
        Capability::Link(LinkOp::Back),
        Capability::Link(LinkOp::Next),
        Capability::User(UserOp::Login),
        Capability::User(UserOp::Register),
        Capability::User(UserOp::Logout),
        Capability::User(UserOp::Query),
        Capability::User(UserOp::Create),
        Capability::User(UserOp::Update),
        Capability::User(UserOp::Remove),
        Capability::Group(GroupOp::Join),
        Capability::Group(GroupOp::List),
        Capability::Group(GroupOp::Invite),
        Capability::Group(GroupOp::Members),
        Capability::Member(MemberOp::Query),
        Capability::Member(MemberOp::RoleUpdate),
        Capability::Member(MemberOp::Delete),
        Capability::Email,
        Capability::Notification(NotificationOp::Subscribe),
        Capability::Notification(NotificationOp::Unsubscribe),
        Capability::Notification(NotificationOp::Send),
        Capability::Request,
    ];

    /// Canonical action type name, e.g. `resource.get`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Resource(op) => match op {
                ResourceOp::Query => "resource.query",
                ResourceOp::Get => "resource.get",
                ResourceOp::Create => "resource.create",
                ResourceOp::Update => "resource.update",
                ResourceOp::Delete => "resource.delete",
                ResourceOp::Count => "resource.count",
            },
            Capability::Storage(op) => match op {
                StorageOp::Read => "storage.read",
                StorageOp::Write => "storage.write",
                StorageOp::Append => "storage.append",
                StorageOp::Subtract => "storage.subtract",
                StorageOp::Delete => "storage.delete",
            },
            Capability::Link(op) => match op {
                LinkOp::To => "link",
                LinkOp::Back => "link.back",
                LinkOp::Next => "link.next",
            },
            Capability::User(op) => match op {
                UserOp::Login => "user.login",
                UserOp::Register => "user.register",
                UserOp::Logout => "user.logout",
                UserOp::Query => "user.query",
                UserOp::Create => "user.create",
                UserOp::Update => "user.update",
                UserOp::Remove => "user.remove",
            },
            Capability::Group(op) => match op {
                GroupOp::Join => "group.join",
                GroupOp::List => "group.list",
                GroupOp::Invite => "group.invite",
                GroupOp::Members => "group.members",
            },
            Capability::Member(op) => match op {
                MemberOp::Query => "app.member.query",
                MemberOp::RoleUpdate => "app.member.role.update",
                MemberOp::Delete => "app.member.delete",
            },
            Capability::Email => "email",
            Capability::Notification(op) => match op {
                NotificationOp::Subscribe => "notification.subscribe",
                NotificationOp::Unsubscribe => "notification.unsubscribe",
                NotificationOp::Send => "notification.send",
            },
            Capability::Request => "request",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments of a `resource.*` call, already remapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub resource: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub body: Value,
    #[serde(default)]
    pub query: Option<Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageBackend {
    #[serde(rename = "localStorage")]
    Local,
    #[serde(rename = "sessionStorage")]
    Session,
    #[default]
    #[serde(rename = "appStorage", alias = "indexedDB")]
    App,
}

impl StorageBackend {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "localStorage" => Some(StorageBackend::Local),
            "sessionStorage" => Some(StorageBackend::Session),
            "appStorage" | "indexedDB" => Some(StorageBackend::App),
            _ => None,
        }
    }
}

/// Arguments of a `storage.*` call. `value` is `null` for reads and deletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageRequest {
    #[serde(default)]
    pub backend: StorageBackend,
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRequest {
    #[serde(skip, default = "default_link_op")]
    pub op: LinkOp,
    pub to: Option<String>,
    #[serde(default)]
    pub data: Value,
}

fn default_link_op() -> LinkOp {
    LinkOp::To
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailRequest {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub query: Option<Value>,
}

/// Remapped arguments for capabilities without a dedicated request type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityArgs {
    pub params: Map<String, Value>,
    pub data: Value,
}

/// The environment-specific implementation of every delegated action.
#[async_trait]
pub trait HostAdapter: Send + Sync {
    fn environment(&self) -> Environment;

    async fn resource(&self, op: ResourceOp, _request: ResourceRequest) -> HostResult {
        Err(HostError::Unsupported(Capability::Resource(op)))
    }

    async fn storage(&self, op: StorageOp, _request: StorageRequest) -> HostResult {
        Err(HostError::Unsupported(Capability::Storage(op)))
    }

    async fn link(&self, request: LinkRequest) -> HostResult {
        Err(HostError::Unsupported(Capability::Link(request.op)))
    }

    async fn user(&self, op: UserOp, _args: CapabilityArgs) -> HostResult {
        Err(HostError::Unsupported(Capability::User(op)))
    }

    async fn group(&self, op: GroupOp, _args: CapabilityArgs) -> HostResult {
        Err(HostError::Unsupported(Capability::Group(op)))
    }

    async fn member(&self, op: MemberOp, _args: CapabilityArgs) -> HostResult {
        Err(HostError::Unsupported(Capability::Member(op)))
    }

    async fn email(&self, _request: EmailRequest) -> HostResult {
        Err(HostError::Unsupported(Capability::Email))
    }

    async fn notification(&self, op: NotificationOp, _args: CapabilityArgs) -> HostResult {
        Err(HostError::Unsupported(Capability::Notification(op)))
    }

    async fn request(&self, _request: HttpRequest) -> HostResult {
        Err(HostError::Unsupported(Capability::Request))
    }
}

#[async_trait]
impl<H: HostAdapter + ?Sized> HostAdapter for Arc<H> {
    fn environment(&self) -> Environment {
        (**self).environment()
    }

    async fn resource(&self, op: ResourceOp, request: ResourceRequest) -> HostResult {
        (**self).resource(op, request).await
    }

    async fn storage(&self, op: StorageOp, request: StorageRequest) -> HostResult {
        (**self).storage(op, request).await
    }

    async fn link(&self, request: LinkRequest) -> HostResult {
        (**self).link(request).await
    }

    async fn user(&self, op: UserOp, args: CapabilityArgs) -> HostResult {
        (**self).user(op, args).await
    }

    async fn group(&self, op: GroupOp, args: CapabilityArgs) -> HostResult {
        (**self).group(op, args).await
    }

    async fn member(&self, op: MemberOp, args: CapabilityArgs) -> HostResult {
        (**self).member(op, args).await
    }

    async fn email(&self, request: EmailRequest) -> HostResult {
        (**self).email(request).await
    }

    async fn notification(&self, op: NotificationOp, args: CapabilityArgs) -> HostResult {
        (**self).notification(op, args).await
    }

    async fn request(&self, request: HttpRequest) -> HostResult {
        (**self).request(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;

    #[async_trait]
    impl HostAdapter for Bare {
        fn environment(&self) -> Environment {
            Environment::Server
        }
    }

    #[tokio::test]
    async fn unimplemented_capabilities_are_unsupported() {
        let host = Bare;
        let err = host
            .storage(
                StorageOp::Read,
                StorageRequest {
                    backend: StorageBackend::App,
                    key: "k".into(),
                    value: Value::Null,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, HostError::Unsupported(Capability::Storage(StorageOp::Read)));
        assert_eq!(err.status(), 501);
    }

    #[test]
    fn backend_names_parse() {
        assert_eq!(StorageBackend::parse("indexedDB"), Some(StorageBackend::App));
        assert_eq!(StorageBackend::parse("localStorage"), Some(StorageBackend::Local));
        assert_eq!(StorageBackend::parse("cookies"), None);
    }
}
