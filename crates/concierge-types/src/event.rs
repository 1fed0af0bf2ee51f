use serde::{Deserialize, Serialize};

/// Which post-hoc content guard rejected a candidate answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardKind {
    /// Periodic (weekly) wage figure not sourced from a tool
    WageHallucination,
    /// Visualization requested but no chart payload in the answer
    MissingChart,
}

/// Events emitted by the guarded executor while it drives one agent turn.
/// Subscribers (logs, tests) drain these after the turn completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TurnEvent {
    /// An attempt of the bounded retry loop started
    AttemptStart { attempt: usize, max_attempts: usize, write_allowed: bool },

    /// A tool call is about to execute
    ToolCallStart { call_id: String, tool_name: String, arguments: String },

    /// Tool call finished
    ToolCallEnd { call_id: String, success: bool },

    /// A content guard rejected the candidate answer; a correction was queued
    GuardTriggered { attempt: usize, guard: GuardKind },

    /// The agent invocation failed with a tool error; a correction was queued
    ToolError { attempt: usize, message: String },

    /// A guard-free answer was accepted
    Answered { attempt: usize },

    /// All attempts were exhausted; the fallback reply was returned
    GaveUp { attempts: usize },
}
