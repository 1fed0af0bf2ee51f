pub mod llm;
pub mod mcp;
