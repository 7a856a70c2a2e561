use async_trait::async_trait;
use std::sync::Arc;
use tessera_core::HostResult;
use tessera_core::host::{ResourceOp, ResourceRequest};
use tessera_runtime::MemoryStore;

/// Where a client's `resource.*` calls go.
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    async fn call(&self, op: ResourceOp, request: ResourceRequest) -> HostResult;
}

#[async_trait]
impl ResourceBackend for MemoryStore {
    async fn call(&self, op: ResourceOp, request: ResourceRequest) -> HostResult {
        self.resource(op, request)
    }
}

#[async_trait]
impl<B: ResourceBackend + ?Sized> ResourceBackend for Arc<B> {
    async fn call(&self, op: ResourceOp, request: ResourceRequest) -> HostResult {
        (**self).call(op, request).await
    }
}
