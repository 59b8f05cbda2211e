use axum::{
    extract::{Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    core::{client::serve_connection, MAX_MESSAGE_BYTES},
    state::AppState,
};

/// WebSocket endpoint for in-game traffic
///
/// Possession of a valid (game id, player id) pair is the whole credential;
/// both must resolve before the upgrade happens.
pub async fn websocket_handler(
    Path((game_id, player_id)): Path<(Uuid, Uuid)>,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .registry
        .find(game_id)
        .await
        .ok_or((StatusCode::NOT_FOUND, "game not found".to_string()))?;

    let player = session.lookup(player_id).await.ok_or((
        StatusCode::UNAUTHORIZED,
        "player not in this game".to_string(),
    ))?;

    tracing::debug!(game = %game_id, player = %player_id, "websocket accepted");

    let events = session.events.clone();
    let hub = session.hub.clone();
    Ok(ws
        .max_message_size(MAX_MESSAGE_BYTES)
        .on_upgrade(move |socket| serve_connection(socket, player, events, hub)))
}
