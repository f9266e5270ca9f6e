//! Server composition and startup.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::config::GatewayConfig;
use crate::engine::OllamaClient;
use crate::routers::{build_router, AppState};
use crate::session::GatewayService;

/// Build the gateway from its configuration and serve until shutdown.
pub async fn startup(config: GatewayConfig) -> anyhow::Result<()> {
    config.validate()?;

    let engine = Arc::new(OllamaClient::new(&config)?);
    let service = Arc::new(GatewayService::new(engine, &config)?);
    let router = build_router(AppState { service });

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(
        addr = %addr,
        upstream = %config.ollama_url,
        max_concurrent = config.max_concurrent_generations,
        "starting gateway"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
