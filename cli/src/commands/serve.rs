use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use lure_api::{AppState, create_api_routes};
use lure_common::config::Config;
use lure_core::network::link::LinkProvider;
use tracing::info;

pub async fn serve(config: Config, links: Arc<dyn LinkProvider>) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.bind_address, config.server.port
            )
        })?;

    let state = AppState::new(links, config);
    let app = create_api_routes(state.clone());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!(%addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    if state.sessions.is_active() {
        info!("Waiting for the active session to restore its targets");
        state.sessions.wait_idle().await;
    }
    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
