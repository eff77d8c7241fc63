//! Session state registry
//!
//! Prune state is keyed by session ID. First access to a session loads
//! its persisted snapshot when a store is attached; load failures
//! degrade to a fresh state rather than failing the request.

use dcp_foundation::{SessionState, StateStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Keyed registry of per-session prune state.
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionState>>>,
    store: Option<Arc<dyn StateStore>>,
}

impl SessionRegistry {
    /// Create a registry without persistence.
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            store: None,
        }
    }

    /// Create a registry backed by a snapshot store.
    pub fn with_store(store: Arc<dyn StateStore>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            store: Some(store),
        }
    }

    /// Run `f` against the session's state, initializing it on first
    /// access.
    pub async fn with_state<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionState) -> R,
    ) -> R {
        self.ensure_loaded(session_id).await;
        let mut sessions = self.sessions.write().await;
        let state = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionState::new(session_id));
        f(state)
    }

    /// Clear a session's state, keeping only its ID.
    pub async fn reset(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(state) = sessions.get_mut(session_id) {
            state.reset();
            debug!(session_id, "session state reset");
        }
    }

    /// Persist a snapshot of the session's state.
    ///
    /// No-op without a store; store failures are logged and swallowed.
    pub async fn save(&self, session_id: &str) {
        let Some(store) = &self.store else {
            return;
        };
        let snapshot = {
            let sessions = self.sessions.read().await;
            sessions.get(session_id).map(SessionState::to_persisted)
        };
        let Some(snapshot) = snapshot else {
            return;
        };
        if let Err(err) = store.save_session_state(session_id, &snapshot).await {
            warn!(session_id, error = %err, "failed to persist session snapshot");
        }
    }

    async fn ensure_loaded(&self, session_id: &str) {
        {
            let sessions = self.sessions.read().await;
            if sessions.contains_key(session_id) {
                return;
            }
        }

        let state = match &self.store {
            Some(store) => match store.load_session_state(session_id).await {
                Ok(Some(persisted)) => {
                    debug!(session_id, "rehydrating session state from snapshot");
                    SessionState::from_persisted(session_id, persisted)
                }
                Ok(None) => SessionState::new(session_id),
                Err(err) => {
                    warn!(session_id, error = %err, "snapshot load failed, starting fresh");
                    SessionState::new(session_id)
                }
            },
            None => SessionState::new(session_id),
        };

        let mut sessions = self.sessions.write().await;
        sessions.entry(session_id.to_string()).or_insert(state);
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
