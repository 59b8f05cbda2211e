use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    core::SessionError,
    models::{CreateGameResponse, JoinGameRequest, JoinGameResponse},
    state::AppState,
};

/// Create a new game session
///
/// # Returns
///
/// JSON with the new game's id and join code. Join-code exhaustion is a
/// 503, not a crash.
pub async fn create_game(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .registry
        .create_session()
        .await
        .map_err(|err| (StatusCode::SERVICE_UNAVAILABLE, err.to_string()))?;

    tracing::debug!(join_code = %session.join_code, "started new game");
    Ok(Json(CreateGameResponse {
        game_id: session.id,
        join_code: session.join_code,
    }))
}

/// Add a player to a joinable game, identified by join code
///
/// # Returns
///
/// JSON with the game id and the new player's id; the player id is what
/// the WebSocket endpoint authenticates against.
pub async fn join_game(
    State(state): State<AppState>,
    Json(request): Json<JoinGameRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .registry
        .find_by_join_code(&request.join_code)
        .await
        .ok_or((
            StatusCode::NOT_FOUND,
            "game not found, or no longer joinable".to_string(),
        ))?;

    let player = session.join().await.map_err(|err| match err {
        SessionError::AlreadyStarted => (StatusCode::CONFLICT, err.to_string()),
        SessionError::Closed => (StatusCode::NOT_FOUND, err.to_string()),
    })?;

    tracing::debug!(game = %session.id, player = %player.id, "player joined");
    Ok(Json(JoinGameResponse {
        game_id: session.id,
        player_id: player.id,
        player_name: player.name,
        join_code: session.join_code,
    }))
}
