use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response to a successful game creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGameResponse {
    #[serde(rename = "gameID")]
    pub game_id: Uuid,
    #[serde(rename = "joinCode")]
    pub join_code: String,
}

/// Response to a successful join. The player id is the credential the
/// client presents when opening its WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinGameResponse {
    #[serde(rename = "gameID")]
    pub game_id: Uuid,
    #[serde(rename = "playerID")]
    pub player_id: Uuid,
    #[serde(rename = "playerName")]
    pub player_name: String,
    #[serde(rename = "joinCode")]
    pub join_code: String,
}
