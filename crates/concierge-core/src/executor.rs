//! Guarded agent executor: one agent turn with bounded self-correction.
//!
//! Each attempt runs the think → act → observe cycle:
//! 1. Send the transcript + provider tool catalog to the LLM (think)
//! 2. If the LLM returns tool calls, execute them on the provider (act)
//! 3. Append tool results to the transcript (observe)
//! 4. Loop back to step 1 until the LLM answers with text only
//!
//! The answer is then checked by the content guards. A tripped guard or a
//! tool error appends a corrective system message and starts the next
//! attempt; after `MAX_ATTEMPTS` the fixed fallback reply is returned.

use std::sync::Arc;
use async_trait::async_trait;
use concierge_types::{
    ConciergeError, Result,
    config::LlmConfig,
    event::TurnEvent,
    message::{Message, ToolCallRequest},
    session::Turn,
    tool::ToolResult,
};

use crate::event_bus::EventBus;
use crate::guards;
use crate::ports::*;
use crate::shaper::tool_output_text;
use crate::tools::{ToolCatalog, ToolLease, parse_tool_args};

pub const MAX_ATTEMPTS: usize = 4;
pub const MAX_TOOL_ITERATIONS: usize = 20;

pub const FALLBACK_REPLY: &str =
    "I couldn't complete the request after retries. Try rephrasing the question.";

const BASE_SYSTEM: &str = r#"
You are a Square Sandbox assistant connected through MCP, running inside a web app UI.

IMPORTANT UI CAPABILITY:
- This UI CAN display charts automatically if (and only if) you include a Chart.js config JSON wrapped EXACTLY like:
<CHART_CONFIG>
{ ... valid JSON ... }
</CHART_CONFIG>
- Therefore: NEVER say "I can't display charts" or "copy this config to render". The UI renders it for the user.

Tool rules:
- Tool methods are strict. If a tool call fails and shows "Available methods", pick from that list and retry.
- Orders search requires location_ids. If missing, call locations.list first.

Money rules:
- Square money fields are in cents (amount=3600 means $36.00). Convert to dollars in display.

Wage rules (CRITICAL, no guessing):
- Wage data is hourly_rate (money) in team member wage_setting/job_assignments.
- NEVER invent weekly/monthly salary unless a tool response explicitly provides it.
- For salary/wage/pay/rate questions:
  1) team.searchMembers (use name/context)
  2) team.getWageSetting if needed
  3) report hourly_rate.amount/100 as $/hr
  4) if missing, say not available in Square for that member.

Visualization rule (CRITICAL):
- If user asks for any chart/graph/plot/visualization OR it would help:
  1) Fetch needed data via tools.
  2) Reply briefly AND include <CHART_CONFIG> JSON.
- If user asks for "labels inside" on pie/doughnut:
  - Use Chart.js plugin "datalabels" via options.plugins.datalabels (JSON only).
"#;

const READ_ONLY_POLICY: &str = r#"
MODE: READ-ONLY
- You may READ data and answer questions.
- Do NOT perform create/update/delete actions.
- If user asks to change data, tell them to use Approve/Reject in the UI.
"#;

const WRITE_ALLOWED_POLICY: &str = r#"
MODE: WRITES ENABLED (APPROVED)
- The user already approved this action via the UI Approve button.
- Do NOT ask for confirmation.
- Execute the requested create/update/delete using tools.
- After writing, fetch and show the updated result briefly.
"#;

/// Transcript for a fresh turn: base instructions, mode policy, then history.
pub fn initial_transcript(history: &[Turn], write_allowed: bool) -> Vec<Message> {
    let policy = if write_allowed { WRITE_ALLOWED_POLICY } else { READ_ONLY_POLICY };
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(BASE_SYSTEM));
    messages.push(Message::system(policy));
    messages.extend(history.iter().map(Message::from));
    messages
}

fn tool_error_correction(attempt: usize, error_text: &str) -> String {
    format!(
        "Tool error (attempt {}/{}).\n\n{}\n\nRecover by using only valid methods shown and retry.",
        attempt, MAX_ATTEMPTS, error_text
    )
}

pub struct GuardedExecutor {
    llm: Arc<dyn LlmPort>,
    connector: Arc<dyn ToolConnector>,
    config: LlmConfig,
    api_tool_suffix: String,
    event_bus: EventBus,
}

impl GuardedExecutor {
    pub fn new(
        llm: Arc<dyn LlmPort>,
        connector: Arc<dyn ToolConnector>,
        config: LlmConfig,
        event_bus: EventBus,
    ) -> Self {
        Self {
            llm,
            connector,
            config,
            api_tool_suffix: "make_api_request".to_string(),
            event_bus,
        }
    }

    pub fn with_api_tool_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.api_tool_suffix = suffix.into();
        self
    }

    /// Run one guarded agent turn over `history`.
    ///
    /// Content-guard violations and tool errors never surface: they are retried
    /// and end in [`FALLBACK_REPLY`]. Only provider connection failures, a
    /// missing API tool and LLM transport errors are returned as `Err`. The
    /// provider connection is released on every path.
    pub async fn run_guarded_turn(&self, history: &[Turn], write_allowed: bool) -> Result<String> {
        let lease = ToolLease::acquire(self.connector.as_ref()).await?;
        let outcome = self.drive(lease.session(), history, write_allowed).await;
        lease.release().await;
        outcome
    }

    async fn drive(
        &self,
        tools: &dyn ToolSession,
        history: &[Turn],
        write_allowed: bool,
    ) -> Result<String> {
        let catalog = ToolCatalog::new(tools.list_tools().await?);
        catalog.require_suffix(&self.api_tool_suffix)?;

        let mut scratch = initial_transcript(history, write_allowed);

        for attempt in 1..=MAX_ATTEMPTS {
            log::info!(
                "agent attempt {}/{} (writes {})",
                attempt,
                MAX_ATTEMPTS,
                if write_allowed { "allowed" } else { "blocked" }
            );
            self.event_bus.emit(TurnEvent::AttemptStart {
                attempt,
                max_attempts: MAX_ATTEMPTS,
                write_allowed,
            });

            match self.invoke_agent(tools, &catalog, &scratch).await {
                Ok(answer) => match guards::violated_guard(history, &answer) {
                    Some(guard) => {
                        log::warn!("attempt {} rejected by {:?} guard", attempt, guard);
                        self.event_bus.emit(TurnEvent::GuardTriggered { attempt, guard });
                        scratch.push(Message::system(guards::correction_for(guard)));
                    }
                    None => {
                        self.event_bus.emit(TurnEvent::Answered { attempt });
                        return Ok(answer);
                    }
                },
                Err(ConciergeError::ToolCall(message)) => {
                    log::warn!("attempt {} hit a tool error: {}", attempt, message);
                    scratch.push(Message::system(tool_error_correction(attempt, &message)));
                    self.event_bus.emit(TurnEvent::ToolError { attempt, message });
                }
                Err(e) => return Err(e),
            }
        }

        log::warn!("giving up after {} attempts", MAX_ATTEMPTS);
        self.event_bus.emit(TurnEvent::GaveUp { attempts: MAX_ATTEMPTS });
        Ok(FALLBACK_REPLY.to_string())
    }

    /// One agent invocation: tool-using conversation until a text-only reply.
    async fn invoke_agent(
        &self,
        tools: &dyn ToolSession,
        catalog: &ToolCatalog,
        transcript: &[Message],
    ) -> Result<String> {
        let mut messages = transcript.to_vec();

        for _ in 0..MAX_TOOL_ITERATIONS {
            let req = ChatRequest {
                messages: messages.clone(),
                tools: catalog.definitions(),
                model: self.config.model.clone(),
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            };
            let response = self.llm.chat_completion(req).await?;
            if let Some(usage) = &response.usage {
                log::debug!(
                    "llm usage: {} prompt + {} completion = {} tokens",
                    usage.prompt_tokens,
                    usage.completion_tokens,
                    usage.total_tokens
                );
            }
            let assistant_msg = response.message;

            if assistant_msg.tool_calls.is_empty() {
                return Ok(assistant_msg.content);
            }

            let tool_calls = assistant_msg.tool_calls.clone();
            messages.push(assistant_msg);

            for tc in &tool_calls {
                let result = self.execute_tool(tools, catalog, tc).await?;
                messages.push(Message::tool_result(&result.call_id, result.output));
            }
        }

        Err(ConciergeError::Llm("agent exceeded maximum tool iterations".to_string()))
    }

    /// Execute a single tool call. Any failure is a `ToolCall` error, which
    /// aborts the invocation and is recovered by the retry loop.
    async fn execute_tool(
        &self,
        tools: &dyn ToolSession,
        catalog: &ToolCatalog,
        tc: &ToolCallRequest,
    ) -> Result<ToolResult> {
        let call_id = tc.id.clone();
        let tool_name = tc.function.name.clone();

        self.event_bus.emit(TurnEvent::ToolCallStart {
            call_id: call_id.clone(),
            tool_name: tool_name.clone(),
            arguments: tc.function.arguments.clone(),
        });

        let outcome = self.call_checked(tools, catalog, &tool_name, &tc.function.arguments).await;

        self.event_bus.emit(TurnEvent::ToolCallEnd {
            call_id: call_id.clone(),
            success: outcome.is_ok(),
        });

        let output = outcome?;
        Ok(ToolResult { call_id, output })
    }

    async fn call_checked(
        &self,
        tools: &dyn ToolSession,
        catalog: &ToolCatalog,
        tool_name: &str,
        arguments: &str,
    ) -> Result<String> {
        if catalog.get(tool_name).is_none() {
            let available = catalog
                .definitions()
                .into_iter()
                .map(|t| t.name)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ConciergeError::ToolCall(format!(
                "Unknown tool: {}. Available tools: {}",
                tool_name, available
            )));
        }

        let args = parse_tool_args(arguments).map_err(|e| {
            ConciergeError::ToolCall(format!("Failed to parse arguments for {}: {}", tool_name, e))
        })?;

        log::debug!("calling tool {} with {}", tool_name, arguments);
        let value = tools.call_tool(tool_name, args).await.map_err(|e| match e {
            ConciergeError::ToolCall(_) => e,
            other => ConciergeError::ToolCall(other.to_string()),
        })?;
        Ok(tool_output_text(&value))
    }
}

#[async_trait]
impl AgentTurnRunner for GuardedExecutor {
    async fn run_guarded_turn(&self, history: &[Turn], write_allowed: bool) -> Result<String> {
        GuardedExecutor::run_guarded_turn(self, history, write_allowed).await
    }
}
