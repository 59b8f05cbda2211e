use std::sync::Arc;

use crate::core::GameRegistry;

/// Shared application state: the one owned registry of live sessions.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<GameRegistry>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(GameRegistry::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
