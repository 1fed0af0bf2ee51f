use serde::{Deserialize, Serialize};
use crate::{ConciergeError, Result};

/// Top-level service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConciergeConfig {
    pub llm: LlmConfig,
    pub provider: ToolProviderConfig,
    pub writes: WriteConfig,
    pub server: ServerConfig,
}

impl ConciergeConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(key) = get("OPENAI_API_KEY") {
            config.llm.api_key = key;
        }
        if let Some(base) = get("OPENAI_BASE_URL") {
            config.llm.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(model) = get("CHAT_MODEL") {
            config.llm.model = model;
        }
        config.llm.router_model = get("ROUTER_MODEL");

        config.provider.access_token = get("SQUARE_ACCESS_TOKEN")
            .or_else(|| get("ACCESS_TOKEN"))
            .ok_or_else(|| {
                ConciergeError::Config(
                    "Missing SQUARE_ACCESS_TOKEN (or ACCESS_TOKEN). \
                     Set it to your Square Sandbox access token."
                        .to_string(),
                )
            })?;
        if let Some(command) = get("MCP_COMMAND") {
            config.provider.command = command;
        }
        if let Some(args) = get("MCP_ARGS") {
            config.provider.args = args.split_whitespace().map(String::from).collect();
        }

        if let Some(flag) = get("DISALLOW_WRITES") {
            config.writes.disallow = flag.eq_ignore_ascii_case("true");
        }

        if let Some(addr) = get("LISTEN_ADDR") {
            config.server.listen_addr = addr;
        }

        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    /// Model used by the intent router; falls back to `model`
    pub router_model: Option<String>,
    pub api_key: String,
    pub api_base: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl LlmConfig {
    pub fn router_model(&self) -> &str {
        self.router_model.as_deref().unwrap_or(&self.model)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1".to_string(),
            router_model: None,
            api_key: String::new(),
            api_base: "https://api.openai.com".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

/// How to launch the point-of-sale MCP server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolProviderConfig {
    pub command: String,
    pub args: Vec<String>,
    pub access_token: String,
    pub sandbox: bool,
    /// Name suffix of the generic `{service, method, request}` tool
    pub api_tool_suffix: String,
}

impl Default for ToolProviderConfig {
    fn default() -> Self {
        let command = if cfg!(windows) { "npx.cmd" } else { "npx" };
        Self {
            command: command.to_string(),
            args: vec!["-y".into(), "square-mcp-server".into(), "start".into()],
            access_token: String::new(),
            sandbox: true,
            api_tool_suffix: "make_api_request".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteConfig {
    /// Global kill switch for approved writes
    pub disallow: bool,
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self { disallow: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8000".to_string(),
        }
    }
}
