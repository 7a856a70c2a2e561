use crate::bus::EventBus;
use crate::flow::FlowController;
use serde::Serialize;
use std::sync::Arc;
use tessera_core::{HostAdapter, RemapperContext};
use tokio_util::sync::CancellationToken;

/// Where an execution was started from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Origin {
    pub page: Option<String>,
    pub block: Option<String>,
    /// Server-side request id, when there is one.
    pub request: Option<String>,
}

/// Everything one dispatch may touch. Cheap to clone; created per interaction
/// or per request.
#[derive(Clone)]
pub struct ExecutionContext {
    pub remap: RemapperContext,
    pub host: Arc<dyn HostAdapter>,
    pub bus: Arc<EventBus>,
    pub origin: Origin,
    pub flow: Option<Arc<FlowController>>,
    /// Cancelled when the owning block, page or session goes away.
    pub scope: CancellationToken,
}

impl ExecutionContext {
    pub fn new(remap: RemapperContext, host: Arc<dyn HostAdapter>, bus: Arc<EventBus>) -> Self {
        Self {
            remap,
            host,
            bus,
            origin: Origin::default(),
            flow: None,
            scope: CancellationToken::new(),
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_flow(mut self, flow: Arc<FlowController>) -> Self {
        self.flow = Some(flow);
        self
    }

    pub fn with_scope(mut self, scope: CancellationToken) -> Self {
        self.scope = scope;
        self
    }

    /// A copy whose scope ends with this one, but can also be ended on its own.
    pub fn child(&self) -> Self {
        let mut child = self.clone();
        child.scope = self.scope.child_token();
        child
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("app", &self.remap.app_id)
            .field("environment", &self.host.environment())
            .field("origin", &self.origin)
            .field("flow", &self.flow.is_some())
            .field("cancelled", &self.scope.is_cancelled())
            .finish()
    }
}
