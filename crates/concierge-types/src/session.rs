use serde::{Deserialize, Serialize};
use crate::message::Message;

/// Who spoke a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

/// One entry of a session's chat history. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: TurnRole::User, content: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: TurnRole::Assistant, content: text.into() }
    }

    /// `role: text` line used in the router's recent-context block
    pub fn context_line(&self) -> String {
        format!("{}: {}", self.role.as_str(), self.content)
    }
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        match turn.role {
            TurnRole::User => Message::user(&turn.content),
            TurnRole::Assistant => Message::assistant(&turn.content),
        }
    }
}

/// A write request that was classified but not yet executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub action_id: String,
    pub normalized_request: String,
    pub created_at: String,
}

impl PendingAction {
    pub fn new(normalized_request: impl Into<String>) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            normalized_request: normalized_request.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Process-lifetime state of one chat session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub turns: Vec<Turn>,
    pub pending: Option<PendingAction>,
}
