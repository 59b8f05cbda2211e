use serde::{Deserialize, Serialize};

/// Request to join a game by its short code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinGameRequest {
    #[serde(rename = "joinCode")]
    pub join_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_request_wire_key() {
        let request: JoinGameRequest = serde_json::from_str(r#"{"joinCode":"ABCD"}"#).unwrap();
        assert_eq!(request.join_code, "ABCD");
    }
}
