//! OpenAI-compatible LLM adapter.
//!
//! Works with OpenAI and any provider using the OpenAI chat completions
//! API format. Uses a shared `reqwest` client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use concierge_core::ports::*;
use concierge_types::{
    ConciergeError, Result,
    config::LlmConfig,
    message::{FunctionCall, Message, Role, ToolCallRequest},
};

/// Provider that speaks the OpenAI chat completions protocol.
pub struct OpenAiCompatProvider {
    config: LlmConfig,
    endpoint: String,
    http: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(config: LlmConfig) -> Self {
        let endpoint = completions_url(&config.api_base);
        Self {
            config,
            endpoint,
            http: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Chat completions URL for a base that may or may not already carry `/v1`.
pub fn completions_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.ends_with("/v1") {
        format!("{}/chat/completions", base)
    } else {
        format!("{}/v1/chat/completions", base)
    }
}

pub(crate) fn build_request_body(req: &ChatRequest) -> Value {
    let messages: Vec<Value> = req.messages.iter().map(message_to_json).collect();

    let mut body = json!({
        "model": req.model,
        "messages": messages,
        "max_tokens": req.max_tokens,
        "temperature": req.temperature,
    });

    if !req.tools.is_empty() {
        let tools: Vec<Value> = req
            .tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();
        body["tools"] = json!(tools);
    }

    body
}

#[async_trait]
impl LlmPort for OpenAiCompatProvider {
    async fn chat_completion(&self, req: ChatRequest) -> Result<ChatResponse> {
        let body = build_request_body(&req);
        log::debug!(
            "POST {} (model {}, {} messages, {} tools)",
            self.endpoint,
            req.model,
            req.messages.len(),
            req.tools.len()
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ConciergeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ConciergeError::Llm(format!("HTTP {}: {}", status, text)));
        }

        let data: ApiResponse = response
            .json()
            .await
            .map_err(|e| ConciergeError::Llm(e.to_string()))?;

        parse_api_response(data)
    }
}

pub(crate) fn parse_api_response(data: ApiResponse) -> Result<ChatResponse> {
    let choice = data
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ConciergeError::Llm("No choices in response".to_string()))?;

    let message = parse_api_message(choice.message);
    let usage = data.usage.map(|u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(ChatResponse { message, usage })
}

// ─── API response types ──────────────────────────────────────

#[derive(Deserialize)]
pub(crate) struct ApiResponse {
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Deserialize)]
pub(crate) struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Deserialize)]
struct ApiToolCall {
    id: String,
    function: ApiFunction,
}

#[derive(Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// ─── Serialization helpers ───────────────────────────────────

pub(crate) fn message_to_json(msg: &Message) -> Value {
    let mut obj = json!({
        "role": msg.role.as_str(),
        "content": msg.as_text(),
    });

    if let Some(ref id) = msg.tool_call_id {
        obj["tool_call_id"] = json!(id);
    }

    if !msg.tool_calls.is_empty() {
        let calls: Vec<Value> = msg
            .tool_calls
            .iter()
            .map(|tc| {
                json!({
                    "id": tc.id,
                    "type": "function",
                    "function": {
                        "name": tc.function.name,
                        "arguments": tc.function.arguments,
                    }
                })
            })
            .collect();
        obj["tool_calls"] = json!(calls);
    }

    obj
}

pub(crate) fn parse_api_message(api: ApiMessage) -> Message {
    let role = match api.role.as_str() {
        "system" => Role::System,
        "user" => Role::User,
        "tool" => Role::Tool,
        _ => Role::Assistant,
    };

    let tool_calls: Vec<ToolCallRequest> = api
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCallRequest {
            id: tc.id,
            function: FunctionCall {
                name: tc.function.name,
                arguments: tc.function.arguments,
            },
        })
        .collect();

    Message {
        role,
        content: api.content.unwrap_or_default(),
        tool_call_id: None,
        tool_calls,
    }
}
