use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::constants::MAX_NAME_LEN;

/// Represents a player in one game session
///
/// Owned by exactly one session; everything else refers to a player by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Unique player identifier
    #[serde(rename = "playerID")]
    pub id: Uuid,
    /// Player's display name (1-15 characters, mutable)
    #[serde(rename = "playerName")]
    pub name: String,
    /// Review-phase award score, only ever incremented
    pub points: u32,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("name empty")]
    Empty,
    #[error("name too long")]
    TooLong,
}

impl Player {
    /// Create a new player with a placeholder name based on join order.
    /// Clients rename themselves with a `name` message.
    pub fn new(join_index: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: format!("Player {}", join_index),
            points: 0,
        }
    }

    /// Update the display name, enforcing the 1-15 character limit.
    pub fn set_name(&mut self, name: &str) -> Result<(), NameError> {
        let count = name.chars().count();
        if count < 1 {
            return Err(NameError::Empty);
        }
        if count > MAX_NAME_LEN {
            return Err(NameError::TooLong);
        }
        self.name = name.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_player() {
        let player = Player::new(3);

        assert_eq!(player.name, "Player 3");
        assert_eq!(player.points, 0);
        assert!(!player.id.is_nil());
    }

    #[test]
    fn test_set_name() {
        let mut player = Player::new(0);

        assert!(player.set_name("Ada").is_ok());
        assert_eq!(player.name, "Ada");
    }

    #[test]
    fn test_set_name_rejects_empty() {
        let mut player = Player::new(0);

        assert_eq!(player.set_name(""), Err(NameError::Empty));
        assert_eq!(player.name, "Player 0");
    }

    #[test]
    fn test_set_name_rejects_too_long() {
        let mut player = Player::new(0);

        assert_eq!(player.set_name("abcdefghijklmnop"), Err(NameError::TooLong));

        // 15 characters is the boundary and is allowed
        assert!(player.set_name("abcdefghijklmno").is_ok());
    }

    #[test]
    fn test_wire_shape_keys() {
        let player = Player::new(0);
        let json = serde_json::to_value(&player).unwrap();

        assert!(json.get("playerID").is_some());
        assert!(json.get("playerName").is_some());
        assert!(json.get("points").is_some());
    }
}
