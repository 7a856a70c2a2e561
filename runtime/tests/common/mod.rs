#![allow(dead_code)]

use ahash::AHashMap;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tessera_core::host::{
    HttpRequest, LinkRequest, ResourceOp, ResourceRequest, StorageBackend, StorageOp,
    StorageRequest,
};
use tessera_core::{EngineConfig, Environment, HostAdapter, HostResult};
use tessera_runtime::{AppDefinition, Engine, MemoryStore, Session, apply_storage};

/// Host that records what it was asked to do.
#[derive(Default)]
pub struct RecordingHost {
    pub store: MemoryStore,
    pub local: Mutex<AHashMap<String, Value>>,
    pub links: Mutex<Vec<LinkRequest>>,
    pub log: Mutex<Vec<String>>,
}

#[async_trait]
impl HostAdapter for RecordingHost {
    fn environment(&self) -> Environment {
        Environment::Client
    }

    async fn resource(&self, op: ResourceOp, request: ResourceRequest) -> HostResult {
        self.store.resource(op, request)
    }

    async fn storage(&self, op: StorageOp, request: StorageRequest) -> HostResult {
        Ok(match request.backend {
            StorageBackend::App => self.store.storage(op, &request.key, request.value),
            StorageBackend::Local | StorageBackend::Session => {
                apply_storage(&mut self.local.lock(), op, &request.key, request.value)
            }
        })
    }

    async fn link(&self, request: LinkRequest) -> HostResult {
        let data = request.data.clone();
        self.links.lock().push(request);
        Ok(data)
    }

    /// Logs `start <i>`, sleeps `delay` ms, logs `end <i>`, and echoes the body.
    async fn request(&self, request: HttpRequest) -> HostResult {
        let body = request.body.unwrap_or(Value::Null);
        let item = body["i"].clone();
        self.log.lock().push(format!("start {item}"));
        let delay = body["delay"].as_u64().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.log.lock().push(format!("end {item}"));
        Ok(body)
    }
}

pub fn engine() -> Engine {
    engine_with(EngineConfig::default())
}

pub fn engine_with(config: EngineConfig) -> Engine {
    Engine::new(tessera_std::standard_evaluator(), &config)
}

pub fn app(definition: Value) -> Arc<AppDefinition> {
    Arc::new(
        AppDefinition::from_value(definition)
            .unwrap()
            .with_id("test-app"),
    )
}

pub fn session(definition: Value) -> (Session, Arc<RecordingHost>) {
    let host = Arc::new(RecordingHost::default());
    let session = engine().session(app(definition), host.clone());
    (session, host)
}

pub fn empty_app() -> Value {
    json!({ "pages": [] })
}

pub fn action(value: Value) -> tessera_core::ActionDefinition {
    tessera_core::ActionDefinition::from_value(&value).unwrap()
}
