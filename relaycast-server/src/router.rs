use crate::config::RelayConfig;
use crate::registry::{RoomDirectory, RoomRecord};
use crate::relay::Relay;
use crate::signaling::ws_handler;
use anyhow::{Context, Result};
use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use relaycast_core::RoomId;
use tracing::info;

/// Websocket relay plus the room directory endpoints.
pub fn router(relay: Relay) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/room", get(list_rooms).post(create_room))
        .route("/api/room/{id}", get(get_room))
        .route("/api/room/{id}/checkBroadcaster", get(check_broadcaster))
        .with_state(relay)
}

pub async fn serve(config: RelayConfig) -> Result<()> {
    let relay = Relay::new(&config);
    let app = router(relay);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("Signaling relay listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
        .context("Relay server failed")?;

    Ok(())
}

async fn list_rooms(State(relay): State<Relay>) -> Json<Vec<RoomRecord>> {
    Json(relay.registry().list_rooms().await)
}

async fn create_room(State(relay): State<Relay>) -> Json<RoomId> {
    Json(relay.registry().create_room().await)
}

async fn get_room(
    State(relay): State<Relay>,
    Path(id): Path<String>,
) -> Result<Json<RoomRecord>, StatusCode> {
    relay
        .registry()
        .get_room(&RoomId::from(id))
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// `true` when the caller should take the broadcaster role.
async fn check_broadcaster(State(relay): State<Relay>, Path(id): Path<String>) -> Json<bool> {
    Json(!relay.registry().broadcaster_present(&RoomId::from(id)).await)
}
