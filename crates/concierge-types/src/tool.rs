use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Definition of a tool that the LLM can invoke.
/// Follows the OpenAI function-calling schema; built from the provider's catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameters {
    #[serde(rename = "type")]
    pub schema_type: String, // always "object"
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub required: Vec<String>,
}

impl ToolParameters {
    /// Lift a raw JSON schema object (as published by the provider) into parameters.
    pub fn from_schema(schema: &serde_json::Map<String, Value>) -> Self {
        let properties = schema
            .get("properties")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();
        let required = schema
            .get("required")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            schema_type: "object".to_string(),
            properties,
            required,
        }
    }
}

/// Result of executing one tool call inside an agent invocation
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub call_id: String,
    pub output: String,
}

/// The `{service, method, request}` envelope accepted by the provider's
/// generic API tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRequest {
    pub service: String,
    pub method: String,
    #[serde(default)]
    pub request: Value,
}

impl ApiRequest {
    pub fn new(service: impl Into<String>, method: impl Into<String>, request: Value) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            request,
        }
    }
}
