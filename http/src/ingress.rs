//! # Ingress Module - Flat API Entry Point
//!
//! ```rust,ignore
//! Tessera::http(engine, host)
//!     .bind("127.0.0.1:3000")
//!     .app(crm)
//!     .run()
//!     .await?;
//! ```
//!
//! [`HttpIngress::into_raw_service`] is the escape hatch into tower.

use crate::error::IngressError;
use crate::service::{IngressService, IngressState};
use ahash::AHashMap;
use http::Request;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tessera_core::{HostAdapter, ServerConfig};
use tessera_runtime::{AppDefinition, Engine};
use tokio::net::TcpListener;

/// Entry point for the ingress builders. Only HTTP exists today.
pub struct Tessera;

impl Tessera {
    pub fn http(engine: Engine, host: Arc<dyn HostAdapter>) -> HttpIngress {
        HttpIngress::new(engine, host)
    }
}

/// HTTP action ingress builder.
pub struct HttpIngress {
    addr: Option<String>,
    engine: Engine,
    host: Arc<dyn HostAdapter>,
    apps: AHashMap<String, Arc<AppDefinition>>,
    request_timeout: Duration,
}

impl HttpIngress {
    pub fn new(engine: Engine, host: Arc<dyn HostAdapter>) -> Self {
        Self {
            addr: None,
            engine,
            host,
            apps: AHashMap::new(),
            request_timeout: ServerConfig::default().request_timeout(),
        }
    }

    /// Set the bind address (default `127.0.0.1:3000`).
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.addr = Some(addr.into());
        self
    }

    /// Deadline for each request's dispatch (default 30s). A request that runs
    /// past it is cancelled and answered with `503`.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Serve `app` under `/api/apps/{app.id}`. A later app with the same id wins.
    pub fn app(mut self, app: AppDefinition) -> Self {
        self.apps.insert(app.id.clone(), Arc::new(app));
        self
    }

    pub fn into_raw_service(self) -> IngressService {
        IngressService {
            state: Arc::new(self.into_state()),
        }
    }

    /// Serve until the process ends.
    pub async fn run(self) -> Result<(), IngressError> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves. In-flight connections keep running.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<(), IngressError> {
        let addr_str = self.addr.clone().unwrap_or_else(|| "127.0.0.1:3000".to_string());
        let addr: SocketAddr = addr_str.parse().map_err(|source| IngressError::Addr {
            addr: addr_str.clone(),
            source,
        })?;
        let state = Arc::new(self.into_state());

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| IngressError::Bind { addr, source })?;
        tracing::info!(apps = state.apps.len(), "Tessera HTTP ingress listening on http://{}", addr);

        tokio::pin!(shutdown);
        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => accepted.map_err(IngressError::Accept)?,
                () = &mut shutdown => {
                    tracing::info!("Tessera HTTP ingress shutting down");
                    return Ok(());
                }
            };
            let io = TokioIo::new(stream);
            let state = Arc::clone(&state);

            tokio::task::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let state = Arc::clone(&state);
                    async move { Ok::<_, Infallible>(state.handle(req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::error!(%peer, "Error serving connection: {:?}", err);
                }
            });
        }
    }

    fn into_state(self) -> IngressState {
        IngressState {
            engine: self.engine,
            host: self.host,
            apps: self.apps,
            request_timeout: self.request_timeout,
        }
    }
}
