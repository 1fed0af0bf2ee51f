//! Port traits: the hexagonal architecture boundary.
//!
//! These traits are defined here in `concierge-core` (pure Rust).
//! Implementations live in `concierge-platform` (HTTP and MCP adapters).
//! The core never imports platform code; it only depends on these traits.

use async_trait::async_trait;
use serde_json::Value;
use concierge_types::{
    Result,
    message::Message,
    route::RouteDecision,
    session::{PendingAction, Turn, TurnRole},
    tool::ToolDefinition,
};

// ─── LLM Port ────────────────────────────────────────────────

/// Request to send to an LLM
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Complete (non-streaming) response from an LLM
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub message: Message,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[async_trait]
pub trait LlmPort: Send + Sync {
    /// Non-streaming chat completion
    async fn chat_completion(&self, req: ChatRequest) -> Result<ChatResponse>;
}

// ─── Tool Provider Port ──────────────────────────────────────

/// One live connection to the remote tool provider.
///
/// Acquired per agent turn and released with [`ToolSession::close`]; callers
/// must close on every exit path.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// The provider's tool catalog
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>>;

    /// Invoke a tool. A rejection by the provider is `ConciergeError::ToolCall`.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value>;

    /// Release the connection. Calls after the first are no-ops.
    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait ToolConnector: Send + Sync {
    /// Open a fresh connection to the provider
    async fn connect(&self) -> Result<Box<dyn ToolSession>>;
}

// ─── Session Store Port ──────────────────────────────────────

/// Keyed chat history plus at most one pending write per session.
/// Every operation is atomic with respect to other operations.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Copy of the session's history; an unknown session has none
    async fn history(&self, session_id: &str) -> Vec<Turn>;

    /// Append a turn, creating the session if absent
    async fn append(&self, session_id: &str, role: TurnRole, content: &str);

    /// Empty the history and drop any pending action
    async fn clear(&self, session_id: &str);

    /// Store a new pending action, replacing any previous one; returns its id
    async fn set_pending(&self, session_id: &str, normalized_request: &str) -> String;

    async fn pending(&self, session_id: &str) -> Option<PendingAction>;

    async fn clear_pending(&self, session_id: &str);
}

// ─── Core seams ──────────────────────────────────────────────

/// Maps an utterance plus recent context to a validated route decision.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, user_text: &str, history: &[Turn]) -> RouteDecision;
}

/// Runs one agent turn over a history under a privilege mode.
#[async_trait]
pub trait AgentTurnRunner: Send + Sync {
    async fn run_guarded_turn(&self, history: &[Turn], write_allowed: bool) -> Result<String>;
}
