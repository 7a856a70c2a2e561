//! # Tessera HTTP
//!
//! Server-side execution: a [`ServerHost`] backed by a shared
//! [`MemoryStore`](tessera_runtime::MemoryStore), and an HTTP ingress that runs
//! app actions and webhooks on request.

pub mod error;
pub mod host;
pub mod ingress;
pub mod service;

pub use error::{IngressError, status_for};
pub use host::ServerHost;
pub use ingress::{HttpIngress, Tessera};
pub use service::IngressService;

pub mod prelude {
    pub use crate::error::IngressError;
    pub use crate::host::ServerHost;
    pub use crate::ingress::{HttpIngress, Tessera};
    pub use crate::service::IngressService;
}
