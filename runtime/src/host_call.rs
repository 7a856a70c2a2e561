//! Turns a delegate action into a Host Adapter call.
//!
//! Every parameter is remapped against the action input first. Parameters a
//! capability needs but the action leaves out fall back to the input itself
//! (`body`, `value`) or fail with a validation error (`resource`, `key`, `url`).

use crate::context::ExecutionContext;
use serde_json::{Map, Value};
use tessera_core::host::{
    CapabilityArgs, EmailRequest, HttpRequest, LinkRequest, ResourceOp, ResourceRequest,
    StorageBackend, StorageOp, StorageRequest,
};
use tessera_core::{ActionError, Capability, Evaluator, HostAction};

pub(crate) async fn call(
    evaluator: &Evaluator,
    action: &HostAction,
    data: Value,
    ctx: &ExecutionContext,
) -> Result<Value, ActionError> {
    let mut params = Map::new();
    for (name, remapper) in &action.params {
        params.insert(name.clone(), evaluator.evaluate(remapper, &data, &ctx.remap)?);
    }

    let host = &ctx.host;
    let result = match action.capability {
        Capability::Resource(op) => host.resource(op, resource_request(op, params, data)?).await,
        Capability::Storage(op) => host.storage(op, storage_request(op, params, data)?).await,
        Capability::Link(op) => {
            let to = optional_str(&params, "to");
            host.link(LinkRequest { op, to, data }).await
        }
        Capability::User(op) => host.user(op, CapabilityArgs { params, data }).await,
        Capability::Group(op) => host.group(op, CapabilityArgs { params, data }).await,
        Capability::Member(op) => host.member(op, CapabilityArgs { params, data }).await,
        Capability::Notification(op) => {
            host.notification(op, CapabilityArgs { params, data }).await
        }
        Capability::Email => host.email(email_request(&params)?).await,
        Capability::Request => host.request(http_request(params, data)?).await,
    };
    Ok(result?)
}

fn required_str(params: &Map<String, Value>, capability: &str, name: &str) -> Result<String, ActionError> {
    optional_str(params, name)
        .ok_or_else(|| ActionError::Validation(format!("`{capability}` requires a string `{name}`")))
}

fn optional_str(params: &Map<String, Value>, name: &str) -> Option<String> {
    params.get(name).and_then(Value::as_str).map(str::to_string)
}

fn resource_request(
    op: ResourceOp,
    mut params: Map<String, Value>,
    data: Value,
) -> Result<ResourceRequest, ActionError> {
    let capability = Capability::Resource(op).as_str();
    let resource = required_str(&params, capability, "resource")?;
    let id = match params.remove("id") {
        Some(id) => Some(id),
        None if matches!(op, ResourceOp::Get | ResourceOp::Update | ResourceOp::Delete) => {
            data.get("id").cloned()
        }
        None => None,
    };
    Ok(ResourceRequest {
        resource,
        id,
        body: params.remove("body").unwrap_or(data),
        query: params.remove("query"),
    })
}

fn storage_request(
    op: StorageOp,
    mut params: Map<String, Value>,
    data: Value,
) -> Result<StorageRequest, ActionError> {
    let capability = Capability::Storage(op).as_str();
    let key = required_str(&params, capability, "key")?;
    let backend = match optional_str(&params, "storage") {
        None => StorageBackend::default(),
        Some(name) => StorageBackend::parse(&name)
            .ok_or_else(|| ActionError::Validation(format!("unknown storage `{name}`")))?,
    };
    let value = match op {
        StorageOp::Write | StorageOp::Append => params.remove("value").unwrap_or(data),
        StorageOp::Read | StorageOp::Subtract | StorageOp::Delete => Value::Null,
    };
    Ok(StorageRequest {
        backend,
        key,
        value,
    })
}

fn email_request(params: &Map<String, Value>) -> Result<EmailRequest, ActionError> {
    Ok(EmailRequest {
        to: required_str(params, "email", "to")?,
        subject: required_str(params, "email", "subject")?,
        body: optional_str(params, "body").unwrap_or_default(),
    })
}

fn http_request(mut params: Map<String, Value>, data: Value) -> Result<HttpRequest, ActionError> {
    let url = required_str(&params, "request", "url")?;
    let method = optional_str(&params, "method")
        .unwrap_or_else(|| "GET".to_string())
        .to_ascii_uppercase();
    let body = match params.remove("body") {
        Some(body) => Some(body),
        None if method != "GET" && method != "DELETE" => Some(data),
        None => None,
    };
    Ok(HttpRequest {
        method,
        url,
        body,
        query: params.remove("query"),
    })
}
