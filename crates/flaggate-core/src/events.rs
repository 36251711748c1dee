//! Gate outcome events for notification and audit hooks.
//!
//! The validation pipeline decides; subscribers react. Accepted payloads are
//! handed to subscribers for the downstream business action (notifications,
//! scheduled clean-up, audit logging) and rejections are published so
//! alerting can follow up with the flag maintainer.
//!
//! ```text
//!                    Accepted / Rejected
//! ┌─────────────────┐       Events        ┌────────────────────┐
//! │ /validate-flag  │ ───────────────────▶│ MulticastHandler   │
//! │ (Producer)      │                     │ (Event Dispatcher) │
//! └─────────────────┘                     └────────────────────┘
//!                                                   │
//!                                                   ▼
//!                                     notification, audit, scheduling
//! ```
//!
//! Handlers run after the verdict is final and cannot change the response.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{ErrorResponse, FlagSummary};

/// Events emitted once per gated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GateEvent {
    /// Every stage passed.
    Accepted(AcceptedEvent),

    /// A stage rejected the request.
    Rejected(RejectedEvent),
}

/// Emitted when a payload passed authentication and every schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedEvent {
    /// Unique ID for this event.
    pub event_id: Uuid,

    /// The validated payload.
    pub payload: Value,

    /// When the verdict was reached.
    pub accepted_at: DateTime<Utc>,
}

/// Emitted when a request was rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedEvent {
    /// Unique ID for this event.
    pub event_id: Uuid,

    /// Name of the stage that rejected the request.
    pub stage: String,

    /// HTTP status sent back to the caller.
    pub status: u16,

    /// The exact body sent back to the caller.
    pub response: ErrorResponse,

    /// When the verdict was reached.
    pub rejected_at: DateTime<Utc>,
}

impl GateEvent {
    /// Builds an accepted event for `payload`.
    pub fn accepted(payload: Value) -> Self {
        Self::Accepted(AcceptedEvent { event_id: Uuid::new_v4(), payload, accepted_at: Utc::now() })
    }

    /// Builds a rejected event.
    pub fn rejected(stage: impl Into<String>, status: u16, response: ErrorResponse) -> Self {
        Self::Rejected(RejectedEvent {
            event_id: Uuid::new_v4(),
            stage: stage.into(),
            status,
            response,
            rejected_at: Utc::now(),
        })
    }

    /// Returns the flag summary carried by a rejection, if any.
    pub fn flag(&self) -> Option<&FlagSummary> {
        match self {
            Self::Accepted(_) => None,
            Self::Rejected(event) => event.response.flag.as_ref(),
        }
    }
}

/// Trait for reacting to gate outcomes.
///
/// Implementations must not block for long and must swallow their own
/// failures; the HTTP response has already been decided.
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync + std::fmt::Debug {
    /// Handles a gate event.
    async fn handle_event(&self, event: GateEvent);
}

/// Event handler that discards all events.
#[derive(Debug, Default)]
pub struct NoOpEventHandler;

impl NoOpEventHandler {
    /// Creates a new no-op event handler.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl EventHandler for NoOpEventHandler {
    async fn handle_event(&self, _event: GateEvent) {}
}

/// Records every outcome as a structured log line.
#[derive(Debug, Default)]
pub struct LoggingEventHandler;

#[async_trait::async_trait]
impl EventHandler for LoggingEventHandler {
    async fn handle_event(&self, event: GateEvent) {
        match &event {
            GateEvent::Accepted(accepted) => {
                info!(event_id = %accepted.event_id, "Flag change accepted");
            },
            GateEvent::Rejected(rejected) => {
                let flag_key = rejected
                    .response
                    .flag
                    .as_ref()
                    .and_then(|flag| flag.key.as_ref())
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                warn!(
                    event_id = %rejected.event_id,
                    stage = %rejected.stage,
                    status = rejected.status,
                    flag_key,
                    errors = rejected.response.errors.len(),
                    "Flag change rejected"
                );
            },
        }
    }
}

/// Forwards events to every registered subscriber concurrently.
#[derive(Debug, Clone, Default)]
pub struct MulticastEventHandler {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl MulticastEventHandler {
    /// Creates a new multicast handler with no subscribers.
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// Adds a subscriber.
    pub fn add_subscriber(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// Returns the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }
}

#[async_trait::async_trait]
impl EventHandler for MulticastEventHandler {
    async fn handle_event(&self, event: GateEvent) {
        let futures = self.handlers.iter().map(|handler| {
            let event = event.clone();
            async move {
                handler.handle_event(event).await;
            }
        });

        futures::future::join_all(futures).await;
    }
}
