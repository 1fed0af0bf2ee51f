use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ConciergeError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The remote tool rejected a call. Recoverable inside the agent retry loop.
    #[error("Tool error: {0}")]
    ToolCall(String),

    #[error("Tool provider error: {0}")]
    ToolProvider(String),

    #[error("Tool not found in provider catalog: {name}")]
    MissingTool { name: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl ConciergeError {
    pub fn is_tool_call(&self) -> bool {
        matches!(self, ConciergeError::ToolCall(_))
    }
}

impl From<serde_json::Error> for ConciergeError {
    fn from(e: serde_json::Error) -> Self {
        ConciergeError::Serialization(e.to_string())
    }
}
