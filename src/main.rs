//! Tournament Caster — Binary Entrypoint
//! Boots the polling scheduler, the device adapter, alert channels, and the
//! /metrics endpoint.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tournament_caster::config;
use tournament_caster::device::CattDevice;
use tournament_caster::metrics::Metrics;
use tournament_caster::notify::NotifierMux;
use tournament_caster::scheduler::CastScheduler;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tournament_caster=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op where the environment is already set.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = config::load_config_default().context("loading scheduler config")?;

    // /metrics for scraping; bind address overridable for multi-instance hosts.
    let metrics = Metrics::init();
    let addr = std::env::var("METRICS_ADDR").unwrap_or_else(|_| "127.0.0.1:9184".to_string());
    let router = metrics.router();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding metrics listener on {addr}"))?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::warn!(error = ?e, "metrics server exited");
        }
    });

    let device =
        CattDevice::new(cfg.device_name.clone()).with_timeout(cfg.command_timeout_secs);
    let notifier = NotifierMux::from_env();
    if notifier.is_empty() {
        tracing::info!("no alert webhooks configured; alerts go to the log only");
    }

    let scheduler = CastScheduler::load(cfg, device, notifier).await;
    scheduler.run().await;

    Ok(())
}
