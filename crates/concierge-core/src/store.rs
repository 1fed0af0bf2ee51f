//! In-memory session store.
//! Process-lifetime only: nothing survives a restart.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use async_trait::async_trait;
use concierge_types::session::{PendingAction, Session, Turn, TurnRole};

use crate::ports::SessionStore;

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn history(&self, session_id: &str) -> Vec<Turn> {
        self.sessions()
            .get(session_id)
            .map(|s| s.turns.clone())
            .unwrap_or_default()
    }

    async fn append(&self, session_id: &str, role: TurnRole, content: &str) {
        self.sessions()
            .entry(session_id.to_string())
            .or_default()
            .turns
            .push(Turn { role, content: content.to_string() });
    }

    async fn clear(&self, session_id: &str) {
        let mut sessions = self.sessions();
        let session = sessions.entry(session_id.to_string()).or_default();
        session.turns.clear();
        session.pending = None;
    }

    async fn set_pending(&self, session_id: &str, normalized_request: &str) -> String {
        let action = PendingAction::new(normalized_request);
        let action_id = action.action_id.clone();
        self.sessions()
            .entry(session_id.to_string())
            .or_default()
            .pending = Some(action);
        action_id
    }

    async fn pending(&self, session_id: &str) -> Option<PendingAction> {
        self.sessions()
            .get(session_id)
            .and_then(|s| s.pending.clone())
    }

    async fn clear_pending(&self, session_id: &str) {
        if let Some(session) = self.sessions().get_mut(session_id) {
            session.pending = None;
        }
    }
}

/// Per-session async locks.
///
/// Holding a session's lock for the whole of a request serializes concurrent
/// requests for that session; other sessions are unaffected.
#[derive(Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

pub type SessionGuard = tokio::sync::OwnedMutexGuard<()>;

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, session_id: &str) -> SessionGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
