//! Intent router: classifies an utterance as clear / write / read / unknown.
//!
//! The model's answer is untrusted: it is parsed leniently, and any failure
//! (transport or parse) fails closed to a read with no confirmation, so an
//! ambiguous answer can never enable a write on its own.

use std::sync::Arc;
use async_trait::async_trait;
use concierge_types::{
    Result,
    message::Message,
    route::{RawRouteDecision, RouteDecision},
    session::Turn,
};

use crate::ports::{ChatRequest, IntentClassifier, LlmPort};

/// How many trailing turns are shown to the router
pub const CONTEXT_TURNS: usize = 6;

const ROUTER_SYSTEM: &str = r#"
You are an intent router for a Square Sandbox assistant.

Classify the user's message into one of:
- "clear": user wants to clear/reset chat/history
- "write": user wants to CREATE/UPDATE/DELETE Square data (catalog items, team members, jobs, wages, etc.)
- "read": user wants to fetch/see/analyze data (questions, summaries, charts, reports) without changing Square data
- "unknown": unclear

Return ONLY valid JSON with this schema:
{
  "intent": "clear" | "write" | "read" | "unknown",
  "needs_confirm": true | false,
  "reason": "short reason",
  "normalized_request": "rewrite the user request clearly (1 sentence)"
}

Rules:
- If intent == "write" -> needs_confirm must be true.
- If intent == "read" -> needs_confirm must be false.
- Charts/graphs/visualizations are ALWAYS "read" unless user explicitly asks to modify Square data too.
- If unclear whether it's read or write, choose "unknown" with needs_confirm false.
"#;

pub struct IntentRouter {
    llm: Arc<dyn LlmPort>,
    model: String,
    max_tokens: u32,
}

impl IntentRouter {
    pub fn new(llm: Arc<dyn LlmPort>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            max_tokens: 512,
        }
    }

    /// Classify `user_text` given the session's recent history.
    /// Never fails: errors degrade to [`RouteDecision::parse_failed`].
    pub async fn classify(&self, user_text: &str, history: &[Turn]) -> RouteDecision {
        match self.ask_model(user_text, history).await {
            Ok(reply) => match parse_route_json(&reply) {
                Ok(raw) => RouteDecision::sanitized(raw, user_text),
                Err(e) => {
                    log::warn!("router reply was not valid JSON ({}); defaulting to read", e);
                    RouteDecision::parse_failed(user_text)
                }
            },
            Err(e) => {
                log::warn!("router call failed ({}); defaulting to read", e);
                RouteDecision::parse_failed(user_text)
            }
        }
    }

    async fn ask_model(&self, user_text: &str, history: &[Turn]) -> Result<String> {
        let req = ChatRequest {
            messages: vec![
                Message::system(ROUTER_SYSTEM),
                Message::user(router_prompt(user_text, history)),
            ],
            tools: Vec::new(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: 0.0,
        };
        let response = self.llm.chat_completion(req).await?;
        Ok(response.message.content)
    }
}

#[async_trait]
impl IntentClassifier for IntentRouter {
    async fn classify(&self, user_text: &str, history: &[Turn]) -> RouteDecision {
        IntentRouter::classify(self, user_text, history).await
    }
}

/// User-side router prompt: the message plus the last few turns as `role: text` lines.
pub fn router_prompt(user_text: &str, history: &[Turn]) -> String {
    let tail = &history[history.len().saturating_sub(CONTEXT_TURNS)..];
    let context = tail
        .iter()
        .map(Turn::context_line)
        .collect::<Vec<_>>()
        .join("\n");
    format!("User message: {}\n\nRecent context:\n{}", user_text, context)
        .trim()
        .to_string()
}

/// Parse router output, tolerating code fences and prose around the JSON object.
pub fn parse_route_json(text: &str) -> std::result::Result<RawRouteDecision, serde_json::Error> {
    serde_json::from_str(extract_json_object(text))
}

fn extract_json_object(text: &str) -> &str {
    let mut text = text.trim();
    if text.starts_with("```") {
        text = text.trim_matches('`').trim();
        // ```json fence label
        if let Some(rest) = text.strip_prefix("json") {
            text = rest.trim_start();
        }
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}
