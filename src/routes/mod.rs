pub mod game;
pub mod health;
pub mod websocket;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// All routes, shared by the binary and the integration tests.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/games/create", post(game::create_game))
        .route("/api/games/join", post(game::join_game))
        .route("/ws/:game_id/:player_id", get(websocket::websocket_handler))
        .with_state(state)
}
