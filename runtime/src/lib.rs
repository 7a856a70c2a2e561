//! # Tessera Runtime
//!
//! Schedules actions: the [`Dispatcher`] interprets action definitions, the
//! [`EventBus`] connects blocks, and a [`Session`] ties an app definition to a
//! Host Adapter for one app load or one server request.
//!
//! ```rust,ignore
//! let engine = Engine::new(tessera_std::standard_evaluator(), &EngineConfig::default());
//! let session = engine.session(app, host);
//! let page = session.mount_page("signup", Map::new(), Value::Null)?;
//! page.blocks()[0].dispatch("onSubmit", json!({ "email": "a@b.c" })).await?;
//! ```

pub mod app;
pub mod block;
pub mod bus;
pub mod context;
pub mod dispatch;
pub mod flow;
mod host_call;
pub mod page;
pub mod session;
pub mod store;

use std::sync::Arc;
use tessera_core::{EngineConfig, Evaluator, HostAdapter};

pub use app::{AppDefinition, BlockDefinition, FlowDefinition, FlowKind, PageDefinition};
pub use block::{BlockActions, BlockEvents, BlockInstance};
pub use bus::{BusClosed, Event, EventBus, SubscriptionId, Waiter};
pub use context::{ExecutionContext, Origin};
pub use dispatch::{BoxFuture, DispatchResult, Dispatcher};
pub use flow::FlowController;
pub use page::{PageInstance, SubPageInstance};
pub use session::Session;
pub use store::{MemoryStore, apply_storage};

/// Shared, stateless half of the runtime. Clone it into every server worker.
#[derive(Debug, Clone)]
pub struct Engine {
    dispatcher: Arc<Dispatcher>,
}

impl Engine {
    pub fn new(evaluator: Evaluator, config: &EngineConfig) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(evaluator, config)),
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn session(&self, app: Arc<AppDefinition>, host: Arc<dyn HostAdapter>) -> Session {
        Session::new(app, Arc::clone(&self.dispatcher), host)
    }
}

pub mod prelude {
    pub use crate::Engine;
    pub use crate::app::AppDefinition;
    pub use crate::block::BlockInstance;
    pub use crate::bus::{Event, EventBus};
    pub use crate::context::ExecutionContext;
    pub use crate::dispatch::{DispatchResult, Dispatcher};
    pub use crate::page::PageInstance;
    pub use crate::session::Session;
    pub use crate::store::MemoryStore;
}
