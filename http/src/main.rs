//! tessera-server - serve app definitions over HTTP
//!
//! ```text
//! tessera-server --config tessera.toml apps/crm.json apps/helpdesk.json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tessera_core::telemetry::init_tracing;
use tessera_core::{EngineConfig, Traced};
use tessera_http::{ServerHost, Tessera};
use tessera_runtime::{AppDefinition, Engine, MemoryStore};

/// Tessera action server
#[derive(Parser)]
#[command(name = "tessera-server", author, version, about)]
struct Cli {
    /// Engine configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address, overriding the configuration
    #[arg(short, long)]
    bind: Option<String>,

    /// App definition files (JSON). The file stem is the app id unless the
    /// definition sets one.
    #[arg(required = true)]
    apps: Vec<PathBuf>,
}

fn load_app(path: &Path) -> Result<AppDefinition> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw: Value = serde_json::from_str(&source)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let app = AppDefinition::from_value(raw).with_context(|| format!("invalid app {}", path.display()))?;
    if !app.id.is_empty() {
        return Ok(app);
    }
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .context("app file name is not valid UTF-8")?;
    Ok(app.with_id(stem))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = EngineConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    init_tracing(&config).context("failed to initialise tracing")?;

    let store = Arc::new(MemoryStore::new());
    let host = Arc::new(Traced::new(ServerHost::new(store), "server"));
    let engine = Engine::new(tessera_std::standard_evaluator(), &config);

    let mut ingress = Tessera::http(engine, host)
        .bind(config.server.bind.clone())
        .request_timeout(config.server.request_timeout());
    for path in &cli.apps {
        let app = load_app(path)?;
        tracing::info!(app = %app.id, pages = app.pages.len(), "App loaded");
        ingress = ingress.app(app);
    }

    ingress
        .run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "Failed to listen for shutdown signal");
            }
        })
        .await?;
    Ok(())
}
