//! reqwest plumbing shared by the `request` capability and [`RemoteBackend`].

use crate::backend::ResourceBackend;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use tessera_core::HostResult;
use tessera_core::host::{HostError, HttpRequest, ResourceOp, ResourceRequest};

/// Send `builder` and decode the response as JSON. Non-2xx responses become
/// [`HostError::Upstream`] carrying the decoded body.
pub(crate) async fn send(builder: RequestBuilder) -> HostResult {
    let response = builder
        .send()
        .await
        .map_err(|err| HostError::Transport(err.to_string()))?;
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|err| HostError::Transport(err.to_string()))?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    if status.is_success() {
        Ok(body)
    } else {
        Err(HostError::Upstream {
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
            data: body,
        })
    }
}

/// Flatten a JSON object into query pairs. Strings are sent bare, everything
/// else as JSON text.
pub(crate) fn query_pairs(query: Option<&Value>) -> Result<Vec<(String, String)>, HostError> {
    match query {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(fields)) => Ok(fields
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect()),
        Some(other) => Err(HostError::BadRequest(format!(
            "query must be an object, got {other}"
        ))),
    }
}

pub(crate) fn build_request(client: &Client, request: &HttpRequest) -> Result<RequestBuilder, HostError> {
    let method = Method::from_bytes(request.method.as_bytes())
        .map_err(|_| HostError::BadRequest(format!("invalid method `{}`", request.method)))?;
    let mut builder = client
        .request(method, &request.url)
        .query(&query_pairs(request.query.as_ref())?);
    if let Some(body) = &request.body {
        builder = builder.json(body);
    }
    Ok(builder)
}

/// Resources served by a REST API:
///
/// | op       | request                         |
/// |----------|---------------------------------|
/// | `query`  | `GET {base}/{resource}?{query}` |
/// | `count`  | `GET {base}/{resource}/$count`  |
/// | `get`    | `GET {base}/{resource}/{id}`    |
/// | `create` | `POST {base}/{resource}`        |
/// | `update` | `PUT {base}/{resource}/{id}`    |
/// | `delete` | `DELETE {base}/{resource}/{id}` |
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    client: Client,
    base: String,
}

impl RemoteBackend {
    pub fn new(base: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base)
    }

    pub fn with_client(client: Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn url(&self, op: ResourceOp, request: &ResourceRequest) -> Result<String, HostError> {
        let collection = format!("{}/{}", self.base, request.resource);
        Ok(match op {
            ResourceOp::Query | ResourceOp::Create => collection,
            ResourceOp::Count => format!("{collection}/$count"),
            ResourceOp::Get | ResourceOp::Update | ResourceOp::Delete => {
                let id = match &request.id {
                    Some(Value::String(id)) => id.clone(),
                    Some(Value::Number(id)) => id.to_string(),
                    Some(other) => {
                        return Err(HostError::BadRequest(format!("`{other}` is not a valid id")));
                    }
                    None => return Err(HostError::BadRequest("an id is required".into())),
                };
                format!("{collection}/{id}")
            }
        })
    }
}

#[async_trait]
impl ResourceBackend for RemoteBackend {
    async fn call(&self, op: ResourceOp, request: ResourceRequest) -> HostResult {
        let url = self.url(op, &request)?;
        let builder = match op {
            ResourceOp::Query | ResourceOp::Count => self
                .client
                .get(&url)
                .query(&query_pairs(request.query.as_ref())?),
            ResourceOp::Get => self.client.get(&url),
            ResourceOp::Create => self.client.post(&url).json(&request.body),
            ResourceOp::Update => self.client.put(&url).json(&request.body),
            ResourceOp::Delete => self.client.delete(&url),
        };
        tracing::debug!(%url, ?op, "Remote resource call");
        send(builder).await
    }
}
