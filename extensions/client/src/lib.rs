//! # Tessera Client
//!
//! The client-side Host Adapter: `localStorage`, `sessionStorage` and app storage
//! kept per client, a page history for `link`, resources through a pluggable
//! [`ResourceBackend`], and outbound `request` calls via reqwest.

pub mod backend;
pub mod host;
pub mod navigation;
pub mod remote;

pub use backend::ResourceBackend;
pub use host::ClientHost;
pub use navigation::History;
pub use remote::RemoteBackend;
