use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use tokio::net::TcpListener;
use tracing::info;

use crate::lobby::{
    Broadcaster, InMemoryLobbyStore, LobbyCoordinator, LobbyService, LobbyStore, RoomChannels,
};

use super::routes::PartyServer;

const LOG_TARGET: &str = "server::bootstrap";

pub struct ServerConfig {
    pub bind: SocketAddr,
    pub allowed_origins: Vec<String>,
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let store: Arc<dyn LobbyStore> = Arc::new(InMemoryLobbyStore::new());
    let rooms = Arc::new(RoomChannels::new());
    let broadcaster: Arc<dyn Broadcaster> = rooms.clone();
    let service: Arc<dyn LobbyService> = Arc::new(LobbyCoordinator::new(store, broadcaster));

    let origins = config
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("invalid CORS origin {origin:?}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let server = PartyServer::new(service, rooms, origins);
    let make_service = server.into_router().into_make_service();

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    let local_addr = listener.local_addr()?;
    info!(
        target = LOG_TARGET,
        %local_addr,
        origins = config.allowed_origins.len(),
        "party game server listening"
    );

    axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error")
}

async fn shutdown_signal() {
    use tracing::warn;

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target = LOG_TARGET,
            error = %err,
            "failed to install ctrl-c handler"
        );
    }
    info!(target = LOG_TARGET, "shutdown signal received");
}
