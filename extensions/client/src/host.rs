//! Host Adapter for client-side execution.

use crate::backend::ResourceBackend;
use crate::navigation::History;
use crate::remote;
use ahash::AHashMap;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::Arc;
use tessera_core::host::{
    HttpRequest, LinkOp, LinkRequest, ResourceOp, ResourceRequest, StorageBackend, StorageOp,
    StorageRequest,
};
use tessera_core::{Environment, HostAdapter, HostError, HostResult};
use tessera_runtime::{MemoryStore, apply_storage};

/// One client's view of the world: its own storage areas and page history,
/// resources from a [`ResourceBackend`], and outbound HTTP through reqwest.
pub struct ClientHost {
    local: Mutex<AHashMap<String, Value>>,
    session: Mutex<AHashMap<String, Value>>,
    app: Mutex<AHashMap<String, Value>>,
    history: Mutex<History>,
    resources: Arc<dyn ResourceBackend>,
    http: Client,
}

impl ClientHost {
    pub fn new(resources: Arc<dyn ResourceBackend>) -> Self {
        Self {
            local: Mutex::default(),
            session: Mutex::default(),
            app: Mutex::default(),
            history: Mutex::default(),
            resources,
            http: Client::new(),
        }
    }

    /// A host whose resources live in a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn with_http(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Start the history on `page`.
    pub fn starting_at(self, page: impl Into<String>) -> Self {
        *self.history.lock() = History::new(page);
        self
    }

    pub fn current_page(&self) -> Option<String> {
        self.history.lock().current().map(str::to_string)
    }

    pub fn history(&self) -> History {
        self.history.lock().clone()
    }

    fn area(&self, backend: StorageBackend) -> &Mutex<AHashMap<String, Value>> {
        match backend {
            StorageBackend::Local => &self.local,
            StorageBackend::Session => &self.session,
            StorageBackend::App => &self.app,
        }
    }
}

impl std::fmt::Debug for ClientHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHost")
            .field("history", &*self.history.lock())
            .field("local", &self.local.lock().len())
            .field("session", &self.session.lock().len())
            .field("app", &self.app.lock().len())
            .finish()
    }
}

#[async_trait]
impl HostAdapter for ClientHost {
    fn environment(&self) -> Environment {
        Environment::Client
    }

    async fn resource(&self, op: ResourceOp, request: ResourceRequest) -> HostResult {
        self.resources.call(op, request).await
    }

    async fn storage(&self, op: StorageOp, request: StorageRequest) -> HostResult {
        let mut area = self.area(request.backend).lock();
        Ok(apply_storage(&mut area, op, &request.key, request.value))
    }

    /// Resolves with `{ to, data }`, where `to` is the page now shown.
    async fn link(&self, request: LinkRequest) -> HostResult {
        let mut history = self.history.lock();
        let page = match request.op {
            LinkOp::To => {
                let to = request
                    .to
                    .ok_or_else(|| HostError::BadRequest("`link` requires `to`".into()))?;
                history.push(to);
                history.current()
            }
            LinkOp::Back => history.back(),
            LinkOp::Next => history.forward(),
        };
        tracing::debug!(page = ?page, op = ?request.op, "Navigated");
        Ok(json!({ "to": page, "data": request.data }))
    }

    async fn request(&self, request: HttpRequest) -> HostResult {
        let builder = remote::build_request(&self.http, &request)?;
        tracing::debug!(method = %request.method, url = %request.url, "Outbound request");
        remote::send(builder).await
    }
}
