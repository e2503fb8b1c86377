//! Standalone job monitor API.
//!
//! Serves the history table over HTTP. Recording is embed-only: signals
//! come from an in-process bus that only a host application embedding
//! `jobwatch-infra` can publish to, so this binary starts no recorder and
//! reads rows a host wrote to the shared Postgres table. Its registry is
//! empty, so every retry answers "Job class not found"; hosts that need
//! retries build their router with `build_app` and a populated
//! `JobRegistry`.

use std::sync::Arc;

use anyhow::Context;

use jobwatch_api::app::{build_app, services::AppServices};
use jobwatch_infra::{JobRegistry, MonitorConfig};

const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    jobwatch_observability::init();

    let config = MonitorConfig::from_env().context("invalid job monitor configuration")?;
    let services = Arc::new(AppServices::from_env(config.clone(), JobRegistry::new()).await?);
    tracing::info!("standalone mode: serving history only; recording and retry need an embedding host");

    let app = build_app(&config, services);

    let bind = std::env::var("JOBWATCH_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;

    Ok(())
}
