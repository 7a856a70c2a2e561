use http::StatusCode;
use tessera_core::{ActionError, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngressError {
    #[error("invalid bind address `{addr}`: {source}")]
    Addr {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("failed to accept a connection: {0}")]
    Accept(#[source] std::io::Error),
}

/// HTTP status for an action failure.
pub fn status_for(err: &ActionError) -> StatusCode {
    match err {
        ActionError::Host(host) => {
            StatusCode::from_u16(host.status()).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        other => match other.kind() {
            ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Validation
            | ErrorKind::Configuration
            | ErrorKind::Navigation
            | ErrorKind::Rejected
            | ErrorKind::Host => StatusCode::BAD_REQUEST,
        },
    }
}
