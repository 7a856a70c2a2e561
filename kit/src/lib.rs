//! Tessera facade crate.
//!
//! This crate re-exports core, flow, runtime, std, and (by feature) the http and
//! client crates with a single entry point.
//!
//! ```rust,ignore
//! use tessera::prelude::*;
//!
//! let engine = tessera::engine(&EngineConfig::load(None)?);
//! let session = engine.session(Arc::new(app), Arc::new(ClientHost::in_memory()));
//! ```

#[cfg(feature = "client")]
pub use tessera_client as client;
pub use tessera_core as core;
pub use tessera_flow as flow;
#[cfg(feature = "http")]
pub use tessera_http as http;
pub use tessera_runtime as runtime;
pub use tessera_std as std;

pub use tessera_core::{ActionDefinition, ActionError, EngineConfig, HostAdapter, Remapper};
pub use tessera_runtime::{AppDefinition, Engine, Session};

/// An engine with the standard operator library.
pub fn engine(config: &EngineConfig) -> Engine {
    Engine::new(tessera_std::standard_evaluator(), config)
}

pub mod prelude {
    pub use crate::engine;
    #[cfg(feature = "client")]
    pub use tessera_client::{ClientHost, RemoteBackend, ResourceBackend};
    pub use tessera_core::EngineConfig;
    pub use tessera_core::prelude::*;
    #[cfg(feature = "http")]
    pub use tessera_http::prelude::*;
    pub use tessera_runtime::prelude::*;
    pub use tessera_std::prelude::*;
}
