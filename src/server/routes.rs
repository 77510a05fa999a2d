use std::sync::Arc;

use axum::extract::Path;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::{middleware, Extension, Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::game::Lobby;
use crate::lobby::{LobbyService, RoomChannels};

use super::error::ApiError;
use super::logging::log_requests;
use super::ws::ws_handler;

/// Shared state handed to every handler.
pub struct ServerContext {
    pub service: Arc<dyn LobbyService>,
    /// Concrete room channels so websocket sessions can subscribe; the
    /// service only sees the [`crate::lobby::Broadcaster`] side of it.
    pub rooms: Arc<RoomChannels>,
}

/// Axum server facade hosting the lobby coordinator.
pub struct PartyServer {
    router: Router,
}

impl PartyServer {
    pub fn new(
        service: Arc<dyn LobbyService>,
        rooms: Arc<RoomChannels>,
        allowed_origins: Vec<HeaderValue>,
    ) -> Self {
        let context = Arc::new(ServerContext { service, rooms });

        let cors = CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_credentials(true);

        let router = Router::new()
            .route("/ws", get(ws_handler))
            .route("/lobby/:lobby_name", get(get_lobby_snapshot))
            .layer(middleware::from_fn(log_requests))
            .layer(cors)
            .layer(Extension(context));

        Self { router }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

#[derive(Debug, Deserialize)]
struct LobbyPath {
    lobby_name: String,
}

async fn get_lobby_snapshot(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(path): Path<LobbyPath>,
) -> Result<Json<Lobby>, ApiError> {
    ctx.service
        .snapshot(&path.lobby_name)
        .await
        .map(Json)
        .map_err(ApiError::from)
}
