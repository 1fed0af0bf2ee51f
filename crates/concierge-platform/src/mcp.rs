//! MCP tool provider over a child process speaking stdio.
//!
//! Every [`McpConnector::connect`] spawns a fresh provider process; the
//! returned session owns it until `close`.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParam, Tool},
    service::{RoleClient, RunningService, ServiceExt},
    transport::{ConfigureCommandExt, TokioChildProcess},
};
use serde_json::{json, Value};
use tokio::process::Command;
use tokio::sync::RwLock;

use concierge_core::gate::WriteSwitch;
use concierge_core::ports::{ToolConnector, ToolSession};
use concierge_types::{
    ConciergeError, Result,
    config::ToolProviderConfig,
    tool::{ToolDefinition, ToolParameters},
};

const LIST_TOOLS_TIMEOUT: Duration = Duration::from_secs(30);

/// Variables passed through from the parent environment
#[cfg(windows)]
const INHERITED_ENV: &[&str] = &[
    "APPDATA", "HOMEDRIVE", "HOMEPATH", "LOCALAPPDATA", "PATH", "PROCESSOR_ARCHITECTURE",
    "SYSTEMDRIVE", "SYSTEMROOT", "TEMP", "USERNAME", "USERPROFILE",
];
#[cfg(not(windows))]
const INHERITED_ENV: &[&str] = &["HOME", "LOGNAME", "PATH", "SHELL", "TERM", "USER"];

/// Launches the point-of-sale MCP server on demand.
pub struct McpConnector {
    config: ToolProviderConfig,
    writes: WriteSwitch,
}

impl McpConnector {
    pub fn new(config: ToolProviderConfig, writes: WriteSwitch) -> Self {
        Self { config, writes }
    }

    /// Environment handed to the child: a few inherited basics plus the
    /// provider's own settings. The write flag is read at each connect.
    pub fn child_env(&self) -> Vec<(String, String)> {
        let mut env: Vec<(String, String)> = INHERITED_ENV
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|v| (key.to_string(), v)))
            .collect();
        env.push(("ACCESS_TOKEN".into(), self.config.access_token.clone()));
        env.push(("SANDBOX".into(), self.config.sandbox.to_string()));
        env.push(("DISALLOW_WRITES".into(), self.writes.is_disabled().to_string()));
        env
    }
}

#[async_trait]
impl ToolConnector for McpConnector {
    async fn connect(&self) -> Result<Box<dyn ToolSession>> {
        let command = &self.config.command;
        log::info!("starting MCP provider: {} {}", command, self.config.args.join(" "));

        let env = self.child_env();
        let cmd = Command::new(command).configure(|cmd| {
            cmd.args(&self.config.args).env_clear().envs(env);
        });

        let (child, stderr) = TokioChildProcess::builder(cmd)
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ConciergeError::ToolProvider(format!("failed to start {}: {}", command, e))
            })?;

        if let Some(stderr) = stderr {
            tokio::spawn(async move {
                use tokio::io::{AsyncBufReadExt, BufReader};
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    log::debug!(target: "mcp_server", "{}", line.trim_end());
                }
            });
        }

        let service = ().serve(child).await.map_err(|e| {
            ConciergeError::ToolProvider(format!("MCP handshake failed: {}", e))
        })?;

        Ok(Box::new(McpToolSession {
            service: RwLock::new(Some(service)),
        }))
    }
}

/// One running provider process. `close` is idempotent.
pub struct McpToolSession {
    service: RwLock<Option<RunningService<RoleClient, ()>>>,
}

fn closed() -> ConciergeError {
    ConciergeError::ToolProvider("MCP session already closed".to_string())
}

#[async_trait]
impl ToolSession for McpToolSession {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        let guard = self.service.read().await;
        let service = guard.as_ref().ok_or_else(closed)?;

        let listing = tokio::time::timeout(LIST_TOOLS_TIMEOUT, service.list_tools(Default::default()))
            .await
            .map_err(|_| ConciergeError::ToolProvider("timeout listing tools".to_string()))?
            .map_err(|e| ConciergeError::ToolProvider(format!("failed to list tools: {}", e)))?;

        let tools = listing
            .tools
            .iter()
            .map(tool_definition)
            .collect::<Result<Vec<_>>>()?;
        log::debug!(
            "provider publishes {} tools: {}",
            tools.len(),
            tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(", ")
        );
        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        let arguments = match arguments {
            Value::Object(map) => Some(map),
            Value::Null => None,
            _ => {
                return Err(ConciergeError::ToolCall(format!(
                    "{}: parameters must be an object",
                    name
                )))
            }
        };

        let guard = self.service.read().await;
        let service = guard.as_ref().ok_or_else(closed)?;

        let result = service
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments,
            })
            .await
            .map_err(|e| ConciergeError::ToolCall(format!("{} failed: {}", name, e)))?;

        let payload = serde_json::to_value(&result)?;
        let blocks = text_blocks(&payload);
        if payload.get("isError").and_then(Value::as_bool).unwrap_or(false) {
            let message = blocks
                .iter()
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n");
            return Err(ConciergeError::ToolCall(message));
        }
        Ok(Value::Array(blocks))
    }

    async fn close(&self) -> Result<()> {
        if let Some(service) = self.service.write().await.take() {
            service
                .cancel()
                .await
                .map_err(|e| ConciergeError::ToolProvider(format!("MCP shutdown failed: {}", e)))?;
        }
        Ok(())
    }
}

/// Lift a provider tool into the model-facing definition.
pub fn tool_definition(tool: &Tool) -> Result<ToolDefinition> {
    let raw = serde_json::to_value(tool)?;
    let schema = raw
        .get("inputSchema")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    Ok(ToolDefinition {
        name: tool.name.to_string(),
        description: raw
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        parameters: ToolParameters::from_schema(&schema),
    })
}

/// The text blocks of a serialized call result, as `{"type":"text","text":...}`.
pub fn text_blocks(payload: &Value) -> Vec<Value> {
    payload
        .get("content")
        .and_then(Value::as_array)
        .map(|content| {
            content
                .iter()
                .filter(|c| c.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|c| c.get("text").and_then(Value::as_str))
                .map(|text| json!({"type": "text", "text": text}))
                .collect()
        })
        .unwrap_or_default()
}
