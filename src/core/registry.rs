use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::constants::{JOIN_CODE_ATTEMPTS, JOIN_CODE_LEN};
use super::session::{GameSession, SessionHandle};

/// Registry of all active sessions, keyed by id and by join code.
///
/// Created once at startup and injected into request handlers; sessions
/// remove themselves when they end or hit their lifetime ceiling.
pub struct GameRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    sessions: HashMap<Uuid, SessionHandle>,
    join_codes: HashMap<String, Uuid>,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("could not allocate a free join code")]
    JoinCodesExhausted,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    /// Create and register a new session with a fresh join code.
    ///
    /// Allocation and insertion happen under one write lock, so a code
    /// observed by a concurrent lookup always resolves to a fully
    /// initialized session.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::JoinCodesExhausted` when no free code is
    /// found within the attempt limit.
    pub async fn create_session(self: &Arc<Self>) -> Result<SessionHandle, RegistryError> {
        let mut inner = self.inner.write().await;
        let join_code = allocate_join_code(&inner.join_codes, &mut rand::thread_rng())?;
        let id = Uuid::new_v4();

        let handle = GameSession::spawn(id, join_code.clone(), Arc::clone(self));
        inner.join_codes.insert(join_code, id);
        inner.sessions.insert(id, handle.clone());
        tracing::debug!(session = %id, join_code = %handle.join_code, "registered new session");
        Ok(handle)
    }

    pub async fn find(&self, id: Uuid) -> Option<SessionHandle> {
        self.inner.read().await.sessions.get(&id).cloned()
    }

    /// Resolve a join code to a still-joinable session.
    pub async fn find_by_join_code(&self, code: &str) -> Option<SessionHandle> {
        let inner = self.inner.read().await;
        let id = inner.join_codes.get(&code.to_ascii_uppercase())?;
        inner.sessions.get(id).cloned()
    }

    /// Called when a game starts: the code stops resolving and may be
    /// handed out again.
    pub async fn release_join_code(&self, code: &str) {
        self.inner.write().await.join_codes.remove(code);
    }

    pub async fn remove_session(&self, id: Uuid) {
        let mut inner = self.inner.write().await;
        inner.sessions.remove(&id);
        inner.join_codes.retain(|_, session| *session != id);
    }
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Random uppercase codes, retried against the live set a bounded number
/// of times. Exhaustion is an error for the caller, never a crash.
fn allocate_join_code(
    taken: &HashMap<String, Uuid>,
    rng: &mut impl Rng,
) -> Result<String, RegistryError> {
    for _ in 0..JOIN_CODE_ATTEMPTS {
        let code: String = (0..JOIN_CODE_LEN)
            .map(|_| rng.gen_range(b'A'..=b'Z') as char)
            .collect();
        if !taken.contains_key(&code) {
            return Ok(code);
        }
    }
    Err(RegistryError::JoinCodesExhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[tokio::test]
    async fn test_create_session() {
        let registry = Arc::new(GameRegistry::new());

        let handle = registry.create_session().await.unwrap();

        assert_eq!(handle.join_code.len(), JOIN_CODE_LEN);
        assert!(handle.join_code.chars().all(|c| c.is_ascii_uppercase()));
        assert!(registry.find(handle.id).await.is_some());
    }

    #[tokio::test]
    async fn test_find_by_join_code_is_case_insensitive() {
        let registry = Arc::new(GameRegistry::new());
        let handle = registry.create_session().await.unwrap();

        let found = registry
            .find_by_join_code(&handle.join_code.to_lowercase())
            .await
            .unwrap();
        assert_eq!(found.id, handle.id);
    }

    #[tokio::test]
    async fn test_find_nonexistent_session() {
        let registry = GameRegistry::new();

        assert!(registry.find(Uuid::new_v4()).await.is_none());
        assert!(registry.find_by_join_code("ZZZZ").await.is_none());
    }

    #[tokio::test]
    async fn test_live_codes_are_unique() {
        let registry = Arc::new(GameRegistry::new());

        let a = registry.create_session().await.unwrap();
        let b = registry.create_session().await.unwrap();
        let c = registry.create_session().await.unwrap();

        assert_ne!(a.join_code, b.join_code);
        assert_ne!(b.join_code, c.join_code);
        assert_ne!(a.join_code, c.join_code);
    }

    #[tokio::test]
    async fn test_release_join_code_keeps_session_findable() {
        let registry = Arc::new(GameRegistry::new());
        let handle = registry.create_session().await.unwrap();

        registry.release_join_code(&handle.join_code).await;

        assert!(registry.find_by_join_code(&handle.join_code).await.is_none());
        assert!(registry.find(handle.id).await.is_some());
    }

    #[tokio::test]
    async fn test_remove_session_clears_both_indexes() {
        let registry = Arc::new(GameRegistry::new());
        let handle = registry.create_session().await.unwrap();

        registry.remove_session(handle.id).await;

        assert!(registry.find(handle.id).await.is_none());
        assert!(registry.find_by_join_code(&handle.join_code).await.is_none());
    }

    #[test]
    fn test_allocate_join_code_skips_taken_codes() {
        // A constant rng always proposes the same code.
        let mut rng = StepRng::new(0, 0);
        let mut taken = HashMap::new();

        let code = allocate_join_code(&taken, &mut rng).unwrap();
        assert_eq!(code.len(), JOIN_CODE_LEN);

        taken.insert(code, Uuid::new_v4());
        assert_eq!(
            allocate_join_code(&taken, &mut rng),
            Err(RegistryError::JoinCodesExhausted)
        );
    }
}
