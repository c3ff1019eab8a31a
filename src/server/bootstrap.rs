use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::runtime::{RoomRuntime, DEFAULT_CHAT_RATE_LIMIT_MS};
use crate::store::RoomStore;

const LOG_TARGET: &str = "server::bootstrap";

pub struct ServerConfig {
    pub bind: SocketAddr,
    pub chat_rate_limit_ms: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:4000".parse().expect("valid default bind address"),
            chat_rate_limit_ms: DEFAULT_CHAT_RATE_LIMIT_MS,
        }
    }
}

/// Binds the listener, builds the router over the given store, and serves
/// until a ctrl-c signal arrives, draining in-flight connections instead of
/// dying mid-broadcast.
pub async fn run_server<S: RoomStore + 'static>(config: ServerConfig, store: Arc<S>) -> Result<()> {
    let runtime = Arc::new(RoomRuntime::new(store).with_chat_rate_limit_ms(config.chat_rate_limit_ms));
    let router = super::routes::build_router(runtime);

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    let local_addr = listener.local_addr()?;
    info!(target: LOG_TARGET, %local_addr, "holdem room engine listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target: LOG_TARGET, %err, "failed to install ctrl-c handler");
    }
    info!(target: LOG_TARGET, "shutdown signal received");
}
