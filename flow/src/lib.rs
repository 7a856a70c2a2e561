//! Tessera Flow - Subpage State Machine
//!
//! This crate defines how flow and loop pages move between their subpages and
//! accumulate the data submitted along the way:
//! - `FlowState`: where a flow currently is
//! - `FlowMachine`: the transitions between those states
//!
//! **IMPORTANT**: This layer is Pure Rust - no IO, no Async. Running the
//! `onFlowFinish` / `onFlowCancel` actions is the runtime's job.

pub mod state;

pub use state::{FlowError, FlowMachine, FlowOutcome, FlowState};
