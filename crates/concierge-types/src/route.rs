//! Intent routing decision types.
//!
//! Everything the router model returns is untrusted. [`RouteDecision::sanitized`]
//! is the only way a decision is built from raw router output, and it always
//! restores the confirmation invariant.

use serde::{Deserialize, Serialize};

pub const MAX_REASON_CHARS: usize = 200;
pub const MAX_REQUEST_CHARS: usize = 500;

/// Classified purpose of a user utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Clear,
    Write,
    Read,
    Unknown,
}

impl Intent {
    /// Clamp a free-form label to the four-way taxonomy.
    pub fn parse_lenient(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "clear" => Intent::Clear,
            "write" => Intent::Write,
            "read" => Intent::Read,
            _ => Intent::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Clear => "clear",
            Intent::Write => "write",
            Intent::Read => "read",
            Intent::Unknown => "unknown",
        }
    }
}

/// Router output exactly as the model produced it, before validation.
///
/// Every field is optional and loosely typed; the model may omit keys or
/// put strings where booleans belong.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRouteDecision {
    #[serde(default)]
    pub intent: Option<serde_json::Value>,
    #[serde(default)]
    pub needs_confirm: Option<serde_json::Value>,
    #[serde(default)]
    pub reason: Option<serde_json::Value>,
    #[serde(default)]
    pub normalized_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDecision {
    pub intent: Intent,
    pub needs_confirm: bool,
    pub reason: String,
    pub normalized_request: String,
}

impl RouteDecision {
    /// Fail-closed decision used whenever the router output cannot be trusted.
    pub fn parse_failed(user_text: &str) -> Self {
        Self {
            intent: Intent::Read,
            needs_confirm: false,
            reason: "parse failed".to_string(),
            normalized_request: truncate_chars(user_text, MAX_REQUEST_CHARS),
        }
    }

    /// Build a decision from raw router output, clamping the intent,
    /// deriving `needs_confirm` from it and capping string lengths.
    pub fn sanitized(raw: RawRouteDecision, user_text: &str) -> Self {
        let intent = raw
            .intent
            .as_ref()
            .and_then(|v| v.as_str())
            .map(Intent::parse_lenient)
            .unwrap_or(Intent::Unknown);

        // The model's own needs_confirm claim is ignored.
        let needs_confirm = intent == Intent::Write;

        let reason = raw.reason.as_ref().map(value_to_text).unwrap_or_default();
        let normalized_request = raw
            .normalized_request
            .as_ref()
            .map(value_to_text)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| user_text.to_string());

        Self {
            intent,
            needs_confirm,
            reason: truncate_chars(&reason, MAX_REASON_CHARS),
            normalized_request: truncate_chars(&normalized_request, MAX_REQUEST_CHARS),
        }
    }
}

fn value_to_text(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Truncate on a char boundary, never splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
