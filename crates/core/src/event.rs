//! Domain event system — decoupled communication between bounded contexts.
//!
//! Events are published when something interesting happens in the system.
//! Other components can subscribe to react without tight coupling; the CLI
//! subscribes for structured activity logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::tool::ToolRef;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A tool provider was registered into the registry.
    ProviderRegistered {
        server: String,
        tool_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// The model backend was consulted for one round.
    ModelConsulted {
        principal: String,
        round: u32,
        requested_tools: usize,
        timestamp: DateTime<Utc>,
    },

    /// One tool invocation finished (success or failure).
    ToolInvoked {
        tool: ToolRef,
        success: bool,
        latency_ms: u64,
        round: u32,
        timestamp: DateTime<Utc>,
    },

    /// A full turn was orchestrated and appended.
    TurnCompleted {
        principal: String,
        turn_id: u64,
        rounds: u32,
        tool_calls: usize,
        truncated: bool,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub. Components
/// subscribe to receive all events and filter for what they care about.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
