//! Host Adapter for server-side execution.
//!
//! Resources and app storage live in a [`MemoryStore`] shared by every request.
//! There is no browser to navigate, so `link` echoes its target back, and
//! `localStorage`/`sessionStorage` do not exist.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use tessera_core::host::{
    EmailRequest, LinkRequest, ResourceOp, ResourceRequest, StorageBackend, StorageOp,
    StorageRequest,
};
use tessera_core::{Capability, Environment, HostAdapter, HostError, HostResult};
use tessera_runtime::MemoryStore;

#[derive(Debug, Default)]
pub struct ServerHost {
    store: Arc<MemoryStore>,
    outbox: Mutex<Vec<EmailRequest>>,
}

impl ServerHost {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            outbox: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Emails "sent" so far.
    pub fn outbox(&self) -> Vec<EmailRequest> {
        self.outbox.lock().clone()
    }
}

#[async_trait]
impl HostAdapter for ServerHost {
    fn environment(&self) -> Environment {
        Environment::Server
    }

    async fn resource(&self, op: ResourceOp, request: ResourceRequest) -> HostResult {
        self.store.resource(op, request)
    }

    async fn storage(&self, op: StorageOp, request: StorageRequest) -> HostResult {
        match request.backend {
            StorageBackend::App => Ok(self.store.storage(op, &request.key, request.value)),
            StorageBackend::Local | StorageBackend::Session => {
                Err(HostError::Unsupported(Capability::Storage(op)))
            }
        }
    }

    async fn link(&self, request: LinkRequest) -> HostResult {
        Ok(json!({
            "to": request.to,
            "data": request.data,
        }))
    }

    async fn email(&self, request: EmailRequest) -> HostResult {
        tracing::info!(to = %request.to, subject = %request.subject, "Email queued");
        self.outbox.lock().push(request);
        Ok(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(backend: StorageBackend, key: &str, value: Value) -> StorageRequest {
        StorageRequest {
            backend,
            key: key.into(),
            value,
        }
    }

    #[tokio::test]
    async fn app_storage_is_shared_through_the_store() {
        let store = Arc::new(MemoryStore::new());
        let first = ServerHost::new(store.clone());
        let second = ServerHost::new(store);

        first
            .storage(StorageOp::Write, storage(StorageBackend::App, "k", json!("v")))
            .await
            .unwrap();
        let read = second
            .storage(StorageOp::Read, storage(StorageBackend::App, "k", Value::Null))
            .await
            .unwrap();
        assert_eq!(read, json!("v"));
    }

    #[tokio::test]
    async fn browser_storage_is_unsupported() {
        let host = ServerHost::default();
        let err = host
            .storage(StorageOp::Write, storage(StorageBackend::Local, "k", json!(1)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 501);
    }

    #[tokio::test]
    async fn emails_land_in_the_outbox() {
        let host = ServerHost::default();
        host.email(EmailRequest {
            to: "ada@example.com".into(),
            subject: "Welcome".into(),
            body: String::new(),
        })
        .await
        .unwrap();
        assert_eq!(host.outbox()[0].subject, "Welcome");
    }
}
