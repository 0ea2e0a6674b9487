//! Domain event system — decoupled observability for the orchestrator.
//!
//! Events are published when something interesting happens in a turn.
//! Callers can subscribe to react (metrics, audit) without tight coupling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrchestratorEvent {
    /// One dispatch round finished (provider call plus any tool execution)
    RoundCompleted {
        session_id: String,
        round: u32,
        tool_invocations: usize,
        timestamp: DateTime<Utc>,
    },

    /// A tool was invoked
    ToolInvoked {
        tool_name: String,
        ok: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A turn was routed to a specialist
    DelegationRouted {
        session_id: String,
        specialist: String,
        timestamp: DateTime<Utc>,
    },

    /// The completion provider failed; the round was abandoned
    ProviderFailed {
        provider: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for orchestrator events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub. Components
/// subscribe to receive all events and filter for what they care about.
pub struct EventBus {
    sender: broadcast::Sender<Arc<OrchestratorEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: OrchestratorEvent) {
        // Ignore send errors (no subscribers = that's fine)
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<OrchestratorEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
