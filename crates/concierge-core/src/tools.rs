//! Tool catalog and scoped tool-provider connections.
//!
//! The catalog is whatever the provider publishes for the current connection;
//! nothing is built in.

use std::collections::BTreeMap;
use concierge_types::{ConciergeError, Result, tool::ToolDefinition};
use serde_json::Value;

use crate::ports::{ToolConnector, ToolSession};

/// Tools published by one provider connection, keyed by name
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: BTreeMap<String, ToolDefinition>,
}

impl ToolCatalog {
    pub fn new(definitions: Vec<ToolDefinition>) -> Self {
        let tools = definitions
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();
        Self { tools }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// First tool whose name ends with `suffix` (providers may namespace names).
    pub fn find_by_suffix(&self, suffix: &str) -> Option<&ToolDefinition> {
        self.tools.values().find(|t| t.name.ends_with(suffix))
    }

    /// Like [`find_by_suffix`](Self::find_by_suffix) but a missing tool is a
    /// hard configuration error.
    pub fn require_suffix(&self, suffix: &str) -> Result<&ToolDefinition> {
        self.find_by_suffix(suffix)
            .ok_or_else(|| ConciergeError::MissingTool { name: suffix.to_string() })
    }
}

/// Parse a JSON arguments string into a serde_json::Value
pub fn parse_tool_args(args: &str) -> std::result::Result<Value, serde_json::Error> {
    if args.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(args)
}

/// A tool-provider connection that is released exactly once.
///
/// Call [`ToolLease::release`] on every normal exit path. If the lease is
/// dropped without being released (panic, cancelled future) the close is
/// scheduled on the ambient tokio runtime when there is one.
pub struct ToolLease {
    session: Option<Box<dyn ToolSession>>,
}

impl ToolLease {
    pub async fn acquire(connector: &dyn ToolConnector) -> Result<Self> {
        let session = connector.connect().await?;
        Ok(Self { session: Some(session) })
    }

    pub fn session(&self) -> &dyn ToolSession {
        // Only `release` takes the session, and it consumes the lease.
        match self.session.as_deref() {
            Some(session) => session,
            None => unreachable!("tool lease used after release"),
        }
    }

    /// Close the connection, swallowing any error raised while closing.
    pub async fn release(mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.close().await {
                log::debug!("ignoring error while releasing tool provider: {}", e);
            }
        }
    }
}

impl Drop for ToolLease {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let _ = session.close().await;
                });
            }
            Err(_) => log::warn!("tool lease dropped outside a runtime; connection not closed"),
        }
    }
}
