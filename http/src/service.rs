//! # IngressService - Tower Service Adapter
//!
//! Turns an HTTP request into one action dispatch:
//!
//! * `ANY /api/apps/{app}/action/{path}` runs the action at `{path}` in the app
//!   definition (e.g. `pages/checkout/blocks/0/actions/onSubmit`),
//! * `ANY /api/apps/{app}/webhooks/{name}` runs the named webhook.
//!
//! The action input is the query string as an object; a JSON object body is merged
//! over it, any other JSON body replaces it. Every request gets its own
//! [`Session`](tessera_runtime::Session), so nothing but the host's store outlives it.

use crate::error::status_for;
use ahash::AHashMap;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use serde_json::{Map, Value, json};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tessera_core::{ActionDefinition, ActionError, HostAdapter};
use tessera_runtime::{AppDefinition, Engine, Origin};
use tower::Service;
use tracing::Instrument;

/// Shared by every connection of one ingress.
pub(crate) struct IngressState {
    pub(crate) engine: Engine,
    pub(crate) host: Arc<dyn HostAdapter>,
    pub(crate) apps: AHashMap<String, Arc<AppDefinition>>,
    pub(crate) request_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Route<'a> {
    Action { app: &'a str, path: &'a str },
    Webhook { app: &'a str, name: &'a str },
}

/// Splits the path into the next segment and the remainder.
fn next_segment(path: &str) -> (&str, Option<&str>) {
    match path.split_once('/') {
        Some((segment, rest)) => (segment, Some(rest)),
        None => (path, None),
    }
}

pub(crate) fn route(path: &str) -> Option<Route<'_>> {
    let (api, rest) = next_segment(path.trim_start_matches('/'));
    let (apps, rest) = next_segment(rest?);
    if api != "api" || apps != "apps" {
        return None;
    }
    let (app, rest) = next_segment(rest?);
    let (kind, rest) = next_segment(rest?);
    let rest = rest.map(|r| r.trim_end_matches('/')).filter(|r| !r.is_empty())?;
    if app.is_empty() {
        return None;
    }
    match kind {
        "action" => Some(Route::Action { app, path: rest }),
        "webhooks" if !rest.contains('/') => Some(Route::Webhook { app, name: rest }),
        _ => None,
    }
}

fn json_response(status: StatusCode, body: &Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn failure(status: StatusCode, kind: &str, message: impl Into<String>) -> Response<Full<Bytes>> {
    json_response(status, &json!({ "kind": kind, "message": message.into() }))
}

impl IngressState {
    pub(crate) async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: std::fmt::Display,
    {
        let request_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "HTTPRequest",
            tessera.http.method = %req.method(),
            tessera.http.path = %req.uri().path(),
            tessera.http.request_id = %request_id
        );

        async move {
            let response = self.respond(req, &request_id).await;
            tracing::info!(status = response.status().as_u16(), "Request handled");
            response
        }
        .instrument(span)
        .await
    }

    async fn respond<B>(&self, req: Request<B>, request_id: &str) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: std::fmt::Display,
    {
        let path = req.uri().path().to_string();
        let Some(route) = route(&path) else {
            return failure(StatusCode::NOT_FOUND, "not_found", format!("no route for `{path}`"));
        };
        let app_id = match route {
            Route::Action { app, .. } | Route::Webhook { app, .. } => app,
        };
        let Some(app) = self.apps.get(app_id) else {
            return failure(StatusCode::NOT_FOUND, "not_found", format!("no app `{app_id}`"));
        };

        let action = match route {
            Route::Action { path, .. } => match app.action_at(path) {
                Ok(action) => action,
                Err(err) => return json_response(status_for(&err), &err.to_payload()),
            },
            Route::Webhook { name, .. } => match app.webhook(name) {
                Some(action) => action.clone(),
                None => {
                    return failure(StatusCode::NOT_FOUND, "not_found", format!("no webhook `{name}`"));
                }
            },
        };

        let data = match read_input(req).await {
            Ok(data) => data,
            Err(message) => return failure(StatusCode::BAD_REQUEST, "validation", message),
        };

        self.run(Arc::clone(app), &action, data, request_id).await
    }

    async fn run(
        &self,
        app: Arc<AppDefinition>,
        action: &ActionDefinition,
        data: Value,
        request_id: &str,
    ) -> Response<Full<Bytes>> {
        let session = self.engine.session(app, Arc::clone(&self.host));
        let ctx = session.context().with_origin(Origin {
            request: Some(request_id.to_string()),
            ..Origin::default()
        });
        let dispatch = session.dispatch_with(action, data, &ctx);
        let outcome = tokio::time::timeout(self.request_timeout, dispatch)
            .await
            .unwrap_or_else(|_| {
                Err(ActionError::Cancelled(format!(
                    "request did not finish within {}ms",
                    self.request_timeout.as_millis()
                )))
            });
        // The session goes with the response; dropping it cancels anything still waiting.
        match outcome {
            Ok(value) => json_response(StatusCode::OK, &value),
            Err(err) => {
                let status = status_for(&err);
                if status.is_server_error() {
                    tracing::warn!(kind = %err.kind(), error = %err, "Action failed");
                } else {
                    tracing::debug!(kind = %err.kind(), error = %err, "Action failed");
                }
                json_response(status, &err.to_payload())
            }
        }
    }
}

/// Query parameters, with the JSON body merged over them.
async fn read_input<B>(req: Request<B>) -> Result<Value, String>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: std::fmt::Display,
{
    let mut data = Map::new();
    if let Some(query) = req.uri().query() {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
            .map_err(|err| format!("invalid query string: {err}"))?;
        data.extend(pairs.into_iter().map(|(key, value)| (key, Value::String(value))));
    }

    let body = req
        .into_body()
        .collect()
        .await
        .map_err(|err| format!("failed to read the body: {err}"))?
        .to_bytes();
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(data));
    }

    match serde_json::from_slice(&body).map_err(|err| format!("body is not valid JSON: {err}"))? {
        Value::Object(fields) => {
            data.extend(fields);
            Ok(Value::Object(data))
        }
        other => Ok(other),
    }
}

/// Raw service form of an ingress, for tower stacks and tests.
#[derive(Clone)]
pub struct IngressService {
    pub(crate) state: Arc<IngressState>,
}

impl std::fmt::Debug for IngressService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut apps: Vec<_> = self.state.apps.keys().collect();
        apps.sort();
        f.debug_struct("IngressService").field("apps", &apps).finish()
    }
}

impl<B> Service<Request<B>> for IngressService
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: std::fmt::Display,
{
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let state = Arc::clone(&self.state);
        Box::pin(async move { Ok(state.handle(req).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_actions_and_webhooks() {
        assert_eq!(
            route("/api/apps/crm/action/pages/home/blocks/0/actions/onLoad"),
            Some(Route::Action {
                app: "crm",
                path: "pages/home/blocks/0/actions/onLoad"
            })
        );
        assert_eq!(
            route("/api/apps/crm/webhooks/stripe/"),
            Some(Route::Webhook {
                app: "crm",
                name: "stripe"
            })
        );
        assert_eq!(route("/api/apps/crm/webhooks/a/b"), None);
        assert_eq!(route("/api/apps/crm/action/"), None);
        assert_eq!(route("/api/apps/crm"), None);
        assert_eq!(route("/health"), None);
    }
}
