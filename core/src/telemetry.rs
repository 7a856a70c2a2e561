//! # Telemetry: Subscriber Setup and Host Decorators
//!
//! [`init_tracing`] installs the process-wide subscriber from [`EngineConfig`].
//! [`Traced`] wraps any [`HostAdapter`] so every capability call is recorded with
//! its duration and outcome.

use crate::config::{EngineConfig, LogFormat};
use crate::host::{
    Capability, CapabilityArgs, EmailRequest, Environment, GroupOp, HostAdapter, HostResult,
    HttpRequest, LinkRequest, MemberOp, NotificationOp, ResourceOp, ResourceRequest, StorageOp,
    StorageRequest, UserOp,
};
use async_trait::async_trait;
use std::future::Future;
use std::time::Instant;
use thiserror::Error;
use tracing::{Instrument, info_span};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to install subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Install a global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &EngineConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&config.log.filter)?;
    let registry = tracing_subscriber::registry().with(filter);
    match config.log.format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init()?,
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init()?,
    }
    Ok(())
}

/// A Host Adapter decorator that adds a span and an outcome event to every call.
#[derive(Clone)]
pub struct Traced<H> {
    inner: H,
    name: String,
}

impl<H> Traced<H> {
    pub fn new(inner: H, name: &str) -> Self {
        Self {
            inner,
            name: name.to_string(),
        }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H: HostAdapter> Traced<H> {
    async fn observe<F>(&self, capability: Capability, call: F) -> HostResult
    where
        F: Future<Output = HostResult>,
    {
        let span = info_span!(
            "host",
            tessera.host = %self.name,
            tessera.capability = %capability
        );

        async move {
            let start = Instant::now();
            let result = call.await;
            let duration = start.elapsed();
            match &result {
                Ok(_) => tracing::debug!(?duration, "Capability completed"),
                Err(err) => tracing::warn!(
                    error = %err,
                    status = err.status(),
                    ?duration,
                    "Capability failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl<H: HostAdapter> HostAdapter for Traced<H> {
    fn environment(&self) -> Environment {
        self.inner.environment()
    }

    async fn resource(&self, op: ResourceOp, request: ResourceRequest) -> HostResult {
        self.observe(Capability::Resource(op), self.inner.resource(op, request))
            .await
    }

    async fn storage(&self, op: StorageOp, request: StorageRequest) -> HostResult {
        self.observe(Capability::Storage(op), self.inner.storage(op, request))
            .await
    }

    async fn link(&self, request: LinkRequest) -> HostResult {
        let capability = Capability::Link(request.op);
        self.observe(capability, self.inner.link(request)).await
    }

    async fn user(&self, op: UserOp, args: CapabilityArgs) -> HostResult {
        self.observe(Capability::User(op), self.inner.user(op, args))
            .await
    }

    async fn group(&self, op: GroupOp, args: CapabilityArgs) -> HostResult {
        self.observe(Capability::Group(op), self.inner.group(op, args))
            .await
    }

    async fn member(&self, op: MemberOp, args: CapabilityArgs) -> HostResult {
        self.observe(Capability::Member(op), self.inner.member(op, args))
            .await
    }

    async fn email(&self, request: EmailRequest) -> HostResult {
        self.observe(Capability::Email, self.inner.email(request))
            .await
    }

    async fn notification(&self, op: NotificationOp, args: CapabilityArgs) -> HostResult {
        self.observe(Capability::Notification(op), self.inner.notification(op, args))
            .await
    }

    async fn request(&self, request: HttpRequest) -> HostResult {
        self.observe(Capability::Request, self.inner.request(request))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostError, StorageBackend};
    use serde_json::{Value, json};

    struct Echo;

    #[async_trait]
    impl HostAdapter for Echo {
        fn environment(&self) -> Environment {
            Environment::Client
        }

        async fn storage(&self, _op: StorageOp, request: StorageRequest) -> HostResult {
            Ok(json!({ "key": request.key }))
        }
    }

    #[tokio::test]
    async fn traced_is_transparent() {
        let host = Traced::new(Echo, "echo");
        assert_eq!(host.environment(), Environment::Client);

        let ok = host
            .storage(
                StorageOp::Read,
                StorageRequest {
                    backend: StorageBackend::Local,
                    key: "theme".into(),
                    value: Value::Null,
                },
            )
            .await
            .unwrap();
        assert_eq!(ok, json!({ "key": "theme" }));

        let err = host
            .email(EmailRequest {
                to: "a@example.com".into(),
                subject: "hi".into(),
                body: String::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, HostError::Unsupported(Capability::Email));
    }
}
