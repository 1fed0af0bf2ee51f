//! Confirmation gate, the per-session state machine behind chat / approve / reject.
//!
//! A session is either idle or holding one pending write. Writes are never
//! executed from a chat message: the router's write decision only stores a
//! pending action, and only an explicit approval re-runs it with write
//! privileges. An ordinary message sent while a write is pending is answered
//! on its own and leaves the pending action untouched.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use serde::{Deserialize, Serialize};
use concierge_types::{
    Result,
    route::Intent,
    session::TurnRole,
};

use crate::ports::{AgentTurnRunner, IntentClassifier, SessionStore};
use crate::store::SessionLocks;

pub const CLEARED_REPLY: &str = "✅ Cleared chat.";
pub const CONFIRM_PROMPT: &str =
    "I can do that. Click **Approve** to proceed or **Reject** to cancel.";
pub const NOTHING_TO_APPROVE: &str = "No pending action to approve.";
pub const NOTHING_TO_REJECT: &str = "No pending action to reject.";
pub const WRITES_DISABLED_REPLY: &str =
    "Writes are disabled (DISALLOW_WRITES=true). Set DISALLOW_WRITES=false in .env and restart.";
pub const CANCELLED_REPLY: &str = "✅ Cancelled. No changes were made.";

/// Literal messages that clear the session without consulting the router
const CLEAR_SHORTCUTS: &[&str] = &["/clear", "clear chat", "reset"];

/// Reply to one chat / approve / reject request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    #[serde(default)]
    pub needs_confirm: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_action_id: Option<String>,
}

impl ChatReply {
    fn text(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            needs_confirm: false,
            pending_action_id: None,
        }
    }

    fn confirm(action_id: String) -> Self {
        Self {
            reply: CONFIRM_PROMPT.to_string(),
            needs_confirm: true,
            pending_action_id: Some(action_id),
        }
    }
}

/// Global write kill switch, shared by the gate and the tool connector so
/// the provider process always sees the same setting the gate enforces.
#[derive(Debug, Clone)]
pub struct WriteSwitch {
    disabled: Arc<AtomicBool>,
}

impl WriteSwitch {
    pub fn new(disabled: bool) -> Self {
        Self {
            disabled: Arc::new(AtomicBool::new(disabled)),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::SeqCst);
    }
}

pub fn is_clear_shortcut(message: &str) -> bool {
    let lowered = message.trim().to_lowercase();
    CLEAR_SHORTCUTS.contains(&lowered.as_str())
}

pub struct ConfirmationGate {
    store: Arc<dyn SessionStore>,
    classifier: Arc<dyn IntentClassifier>,
    agent: Arc<dyn AgentTurnRunner>,
    locks: SessionLocks,
    writes: WriteSwitch,
}

impl ConfirmationGate {
    pub fn new(
        store: Arc<dyn SessionStore>,
        classifier: Arc<dyn IntentClassifier>,
        agent: Arc<dyn AgentTurnRunner>,
        writes: WriteSwitch,
    ) -> Self {
        Self {
            store,
            classifier,
            agent,
            locks: SessionLocks::new(),
            writes,
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn write_switch(&self) -> &WriteSwitch {
        &self.writes
    }

    pub fn writes_disabled(&self) -> bool {
        self.writes.is_disabled()
    }

    /// Handle an ordinary chat message.
    pub async fn chat(&self, session_id: &str, message: &str) -> Result<ChatReply> {
        let session_id = session_id.trim();
        let user_text = message.trim();
        let _guard = self.locks.lock(session_id).await;

        self.store.append(session_id, TurnRole::User, user_text).await;

        let history = self.store.history(session_id).await;
        let route = self.classifier.classify(user_text, &history).await;
        log::info!(
            "session {}: routed as {} (confirm: {}, reason: {})",
            session_id,
            route.intent.as_str(),
            route.needs_confirm,
            route.reason
        );

        if route.intent == Intent::Clear || is_clear_shortcut(user_text) {
            self.store.clear(session_id).await;
            return Ok(ChatReply::text(CLEARED_REPLY));
        }

        if route.intent == Intent::Write && route.needs_confirm {
            let action_id = self.store.set_pending(session_id, &route.normalized_request).await;
            log::info!("session {}: pending write {} stored", session_id, action_id);
            return Ok(ChatReply::confirm(action_id));
        }

        let reply = self.agent.run_guarded_turn(&history, false).await?;
        self.store.append(session_id, TurnRole::Assistant, &reply).await;
        Ok(ChatReply::text(reply))
    }

    /// Execute the session's pending write with write privileges.
    pub async fn approve(&self, session_id: &str) -> Result<ChatReply> {
        let session_id = session_id.trim();
        let _guard = self.locks.lock(session_id).await;

        let Some(pending) = self.store.pending(session_id).await else {
            return Ok(ChatReply::text(NOTHING_TO_APPROVE));
        };

        if self.writes_disabled() {
            log::info!(
                "session {}: approval of {} refused, writes disabled",
                session_id,
                pending.action_id
            );
            return Ok(ChatReply::text(WRITES_DISABLED_REPLY));
        }

        log::info!("session {}: executing approved write {}", session_id, pending.action_id);
        self.store.clear_pending(session_id).await;
        self.store
            .append(session_id, TurnRole::User, &pending.normalized_request)
            .await;

        let history = self.store.history(session_id).await;
        let reply = self.agent.run_guarded_turn(&history, true).await?;
        self.store.append(session_id, TurnRole::Assistant, &reply).await;
        Ok(ChatReply::text(reply))
    }

    /// Drop the session's pending write without executing it.
    pub async fn reject(&self, session_id: &str) -> Result<ChatReply> {
        let session_id = session_id.trim();
        let _guard = self.locks.lock(session_id).await;

        let Some(pending) = self.store.pending(session_id).await else {
            return Ok(ChatReply::text(NOTHING_TO_REJECT));
        };

        log::info!("session {}: pending write {} rejected", session_id, pending.action_id);
        self.store.clear_pending(session_id).await;
        self.store
            .append(session_id, TurnRole::Assistant, CANCELLED_REPLY)
            .await;
        Ok(ChatReply::text(CANCELLED_REPLY))
    }
}
