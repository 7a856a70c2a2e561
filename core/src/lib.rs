//! # Tessera Core
//!
//! Environment-agnostic building blocks of the action engine: action and remapper
//! definitions, the remapper evaluator, the action resolver, the Host Adapter
//! contract, configuration, and telemetry.
//!
//! Nothing in this crate schedules work. Dispatching lives in `tessera-runtime`.

pub mod action;
pub mod config;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod host;
pub mod remap;
pub mod resolver;
pub mod telemetry;

pub use action::{ActionDefinition, ActionKind, FlowAction, HostAction, LogLevel, MatchCase};
pub use config::{ConfigError, EngineConfig, LogFormat, ServerConfig};
pub use context::RemapperContext;
pub use error::{ActionError, ErrorKind};
pub use evaluator::{ArrayFrame, Evaluator, Operator, OperatorTable, Scope, truthy};
pub use events::EventsDefinition;
pub use host::{Capability, Environment, HostAdapter, HostError, HostResult};
pub use remap::{RemapError, Remapper};
pub use resolver::{ActionType, FlowOp};
pub use telemetry::Traced;

pub mod prelude {
    pub use crate::action::{ActionDefinition, ActionKind};
    pub use crate::context::RemapperContext;
    pub use crate::error::{ActionError, ErrorKind};
    pub use crate::evaluator::{Evaluator, OperatorTable, Scope, truthy};
    pub use crate::events::EventsDefinition;
    pub use crate::host::{Capability, Environment, HostAdapter, HostError, HostResult};
    pub use crate::remap::{RemapError, Remapper};
}
