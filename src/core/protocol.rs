//! The `{ "type": ..., "data": ... }` envelope spoken on every WebSocket,
//! in both directions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::player::Player;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid message envelope: {0}")]
    Envelope(#[from] serde_json::Error),
    #[error("message data has the wrong shape for `{0}`")]
    Data(&'static str),
    #[error("malformed player id in award: {0}")]
    Award(#[from] uuid::Error),
    #[error("unknown message type `{0}`")]
    UnknownType(String),
}

/// Raw inbound envelope. `data` may be absent for types that carry none.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// A parsed client → session message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// New display name for the sender.
    Name(String),
    /// Start the game; only honored from the first player in join order.
    Start,
    /// An encoded drawing of the current prompt.
    Drawing(String),
    /// A guess at the current drawing.
    Guess(String),
    /// Award a point to another player during review.
    Award(Uuid),
    /// The sender is finished reviewing.
    Done,
}

impl ClientMessage {
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(raw)?;
        match envelope.kind.as_str() {
            "name" => Ok(Self::Name(expect_string(envelope.data, "name")?)),
            "start" => Ok(Self::Start),
            "drawing" => Ok(Self::Drawing(expect_string(envelope.data, "drawing")?)),
            "guess" => Ok(Self::Guess(expect_string(envelope.data, "guess")?)),
            "award" => {
                let target = expect_string(envelope.data, "award")?;
                Ok(Self::Award(Uuid::parse_str(&target)?))
            }
            "done" => Ok(Self::Done),
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }
}

fn expect_string(data: Value, kind: &'static str) -> Result<String, ProtocolError> {
    match data {
        Value::String(s) => Ok(s),
        _ => Err(ProtocolError::Data(kind)),
    }
}

/// A session → client update, serialized into the same envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ServerUpdate {
    /// Current roster, broadcast every second while the game is forming.
    Players(Vec<Player>),
    /// The prompt to draw this round (even rounds).
    Word(String),
    /// The drawing to guess this round (odd rounds).
    Drawing(String),
    /// Full journey history, broadcast when the last round completes.
    Review(Vec<JourneyView>),
    /// Final roster with scores, broadcast when everyone is done reviewing.
    Results(Vec<Player>),
}

/// A journey as shown to clients during review, with player records
/// resolved in place of bare ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyView {
    #[serde(rename = "playOrder")]
    pub play_order: Vec<Player>,
    #[serde(rename = "gamePlays")]
    pub game_plays: Vec<PlayView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayView {
    Word {
        word: String,
        player: Option<Player>,
    },
    Drawing {
        drawing: String,
        player: Option<Player>,
    },
}
