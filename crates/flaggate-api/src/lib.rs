//! HTTP surface of the flag webhook gate.
//!
//! Authenticates inbound flag-change webhooks with an HMAC-SHA256
//! signature, validates them against the flag schemas, and answers with a
//! uniform verdict body.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use flaggate_core::{EventHandler, NoOpEventHandler};

pub mod config;
pub mod crypto;
pub mod handlers;
pub mod pipeline;
pub mod request;
pub mod server;

pub use config::{Config, WebhookSecret};
pub use pipeline::{
    GateSettings, PipelineState, Rejection, SchemaStage, SignatureStage, Stage,
    ValidationPipeline, Verdict,
};
pub use request::WebhookRequest;
pub use server::{create_router, start_server, RouterOptions};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The validation pipeline, built once at startup.
    pub pipeline: Arc<ValidationPipeline>,
    /// Subscribers notified of every verdict.
    pub events: Arc<dyn EventHandler>,
}

impl AppState {
    /// Creates state with no event subscribers.
    pub fn new(pipeline: Arc<ValidationPipeline>) -> Self {
        Self { pipeline, events: Arc::new(NoOpEventHandler::new()) }
    }

    /// Replaces the event subscriber.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventHandler>) -> Self {
        self.events = events;
        self
    }
}
