//! Composition root: builds every adapter from configuration and hands them
//! to the confirmation gate.

use std::sync::Arc;

use concierge_core::event_bus::EventBus;
use concierge_core::executor::GuardedExecutor;
use concierge_core::gate::{ConfirmationGate, WriteSwitch};
use concierge_core::ports::{LlmPort, ToolConnector};
use concierge_core::router::IntentRouter;
use concierge_core::store::MemorySessionStore;
use concierge_platform::llm::OpenAiCompatProvider;
use concierge_platform::mcp::McpConnector;
use concierge_types::config::ConciergeConfig;
use concierge_types::event::TurnEvent;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<ConfirmationGate>,
    pub connector: Arc<dyn ToolConnector>,
    pub api_tool_suffix: String,
    pub event_bus: EventBus,
}

impl AppState {
    pub fn new(
        gate: Arc<ConfirmationGate>,
        connector: Arc<dyn ToolConnector>,
        api_tool_suffix: impl Into<String>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            gate,
            connector,
            api_tool_suffix: api_tool_suffix.into(),
            event_bus,
        }
    }

    /// Wire the production adapters.
    pub fn from_config(config: &ConciergeConfig) -> Self {
        let event_bus = EventBus::new();
        let writes = WriteSwitch::new(config.writes.disallow);

        let llm: Arc<dyn LlmPort> = Arc::new(OpenAiCompatProvider::new(config.llm.clone()));
        let connector: Arc<dyn ToolConnector> = Arc::new(McpConnector::new(
            config.provider.clone(),
            writes.clone(),
        ));

        let router = IntentRouter::new(llm.clone(), config.llm.router_model());
        let executor = GuardedExecutor::new(
            llm,
            connector.clone(),
            config.llm.clone(),
            event_bus.clone(),
        )
        .with_api_tool_suffix(config.provider.api_tool_suffix.clone());

        let gate = ConfirmationGate::new(
            Arc::new(MemorySessionStore::new()),
            Arc::new(router),
            Arc::new(executor),
            writes,
        );

        log::info!(
            "chat model {}, router model {}, writes {}",
            config.llm.model,
            config.llm.router_model(),
            if config.writes.disallow { "disabled" } else { "enabled" }
        );

        Self::new(
            Arc::new(gate),
            connector,
            config.provider.api_tool_suffix.clone(),
            event_bus,
        )
    }

    /// Flush buffered agent events to the log.
    pub fn log_turn_events(&self, session_id: &str) {
        for event in self.event_bus.drain() {
            match event {
                TurnEvent::GuardTriggered { attempt, guard } => {
                    log::info!("[{}] attempt {} tripped {:?}", session_id, attempt, guard)
                }
                TurnEvent::GaveUp { attempts } => {
                    log::warn!("[{}] no acceptable answer after {} attempts", session_id, attempts)
                }
                other => log::debug!("[{}] {:?}", session_id, other),
            }
        }
    }
}
