// =============================================================================
// Setup Scanner — Main Entry Point
// =============================================================================
//
// Serves the scanning API. Without an ALPHAVANTAGE_API_KEY every request is
// answered from synthetic bars, which keeps the service usable offline.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod indicators;
mod market_data;
mod provider;
mod runtime_config;
mod scanner;
mod scoring;
mod types;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::provider::{AlphaVantageClient, BarProvider};
use crate::runtime_config::{api_key_from_env, ScannerConfig, CONFIG_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Setup Scanner starting up");

    let mut config = if Path::new(CONFIG_PATH).exists() {
        ScannerConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            ScannerConfig::default()
        })
    } else {
        let defaults = ScannerConfig::default();
        if let Err(e) = defaults.save(CONFIG_PATH) {
            warn!(error = %e, "Failed to write default config");
        }
        defaults
    };
    config.apply_env();

    // ── 2. Provider ──────────────────────────────────────────────────────
    let provider: Option<Arc<dyn BarProvider>> = match api_key_from_env() {
        Some(key) => {
            let client = AlphaVantageClient::new(key, config.provider_base_url.clone())
                .context("failed to build provider client")?;
            Some(Arc::new(client))
        }
        None => {
            warn!("ALPHAVANTAGE_API_KEY not set — serving synthetic bars only");
            None
        }
    };

    // ── 3. Shared state ──────────────────────────────────────────────────
    let state = Arc::new(AppState::new(config, provider));
    info!(
        source = %state.source(),
        default_interval = %state.config.default_interval,
        cache_ttl_secs = state.config.cache_ttl_secs,
        scan_concurrency = state.scanner.concurrency(),
        max_batch = state.config.max_batch,
        "scanner ready"
    );

    // ── 4. API server ────────────────────────────────────────────────────
    let bind_addr = state.config.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    let app = api::rest::router(state);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Err(e) = served {
        error!(error = %e, "API server failed");
        return Err(e.into());
    }

    info!("Setup Scanner shut down complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    warn!("Shutdown signal received — stopping gracefully");
}
