//! Test infrastructure for the flag webhook gate.
//!
//! Provides payload builders, request signing, and an in-process router
//! harness that records every gate event.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use flaggate_api::{
    create_router, crypto::compute_signature, server::VALIDATE_FLAG_PATH, AppState, GateSettings,
    RouterOptions, ValidationPipeline,
};
use flaggate_core::{EventHandler, GateEvent, MulticastEventHandler};
use serde_json::Value;
use tower::ServiceExt;

pub mod fixtures;

pub use fixtures::{scenarios, FlagPayloadBuilder};

/// Secret shared between the test gate and the signing helpers.
pub const TEST_SECRET: &str = "test-webhook-secret";

/// Signature header used by the test gate.
pub const TEST_HEADER: &str = "X-LD-Signature";

/// Signs `body` with [`TEST_SECRET`].
pub fn sign(body: &[u8]) -> String {
    sign_with(body, TEST_SECRET)
}

/// Signs `body` with an arbitrary secret.
pub fn sign_with(body: &[u8], secret: &str) -> String {
    compute_signature(body, secret).unwrap_or_default()
}

/// Settings matching [`TEST_SECRET`] and [`TEST_HEADER`].
pub fn test_settings() -> GateSettings {
    GateSettings::new(TEST_SECRET, TEST_HEADER)
}

/// Event handler that keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingEventHandler {
    events: Mutex<Vec<GateEvent>>,
}

impl RecordingEventHandler {
    /// Returns a copy of the recorded events.
    pub fn events(&self) -> Vec<GateEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Number of accepted events recorded.
    pub fn accepted_count(&self) -> usize {
        self.events().iter().filter(|event| matches!(event, GateEvent::Accepted(_))).count()
    }

    /// Number of rejected events recorded.
    pub fn rejected_count(&self) -> usize {
        self.events().iter().filter(|event| matches!(event, GateEvent::Rejected(_))).count()
    }
}

#[async_trait::async_trait]
impl EventHandler for RecordingEventHandler {
    async fn handle_event(&self, event: GateEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Response captured from the in-process router.
#[derive(Debug, Clone)]
pub struct TestResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Body parsed as JSON, or `Value::Null` if it was not JSON.
    pub body: Value,
}

/// The gate router wired to a recording event handler.
pub struct TestGate {
    router: Router,
    /// Every event published by the gate.
    pub events: Arc<RecordingEventHandler>,
}

impl TestGate {
    /// Builds the flag gate with the test secret and header.
    ///
    /// # Errors
    ///
    /// Fails if the pipeline cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_options(RouterOptions::default())
    }

    /// Builds the flag gate with custom transport limits.
    ///
    /// # Errors
    ///
    /// Fails if the pipeline cannot be built.
    pub fn with_options(options: RouterOptions) -> Result<Self> {
        let pipeline =
            ValidationPipeline::flag_gate(&test_settings()).context("failed to build pipeline")?;
        Ok(Self::from_pipeline(pipeline, options))
    }

    /// Wraps an existing pipeline.
    pub fn from_pipeline(pipeline: ValidationPipeline, options: RouterOptions) -> Self {
        let events = Arc::new(RecordingEventHandler::default());
        let state = AppState::new(Arc::new(pipeline)).with_events(events.clone());
        Self { router: create_router(state, options), events }
    }

    /// Builds the flag gate with an extra event subscriber alongside the
    /// recorder.
    ///
    /// # Errors
    ///
    /// Fails if the pipeline cannot be built.
    pub fn with_subscriber(
        subscriber: Arc<dyn EventHandler>,
        options: RouterOptions,
    ) -> Result<Self> {
        let pipeline =
            ValidationPipeline::flag_gate(&test_settings()).context("failed to build pipeline")?;
        let events = Arc::new(RecordingEventHandler::default());

        let mut multicast = MulticastEventHandler::new();
        multicast.add_subscriber(events.clone());
        multicast.add_subscriber(subscriber);

        let state = AppState::new(Arc::new(pipeline)).with_events(Arc::new(multicast));
        Ok(Self { router: create_router(state, options), events })
    }

    /// Posts `payload` signed with the test secret.
    ///
    /// # Errors
    ///
    /// Fails if the router cannot serve the request.
    pub async fn post_signed(&self, payload: &Value) -> Result<TestResponse> {
        let body = payload.to_string().into_bytes();
        let signature = sign(&body);
        self.post_raw(body, Some(&signature)).await
    }

    /// Posts `payload` without a signature header.
    ///
    /// # Errors
    ///
    /// Fails if the router cannot serve the request.
    pub async fn post_unsigned(&self, payload: &Value) -> Result<TestResponse> {
        self.post_raw(payload.to_string().into_bytes(), None).await
    }

    /// Posts raw bytes with an optional signature header value.
    ///
    /// # Errors
    ///
    /// Fails if the router cannot serve the request.
    pub async fn post_raw(
        &self,
        body: impl Into<Bytes>,
        signature: Option<&str>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(VALIDATE_FLAG_PATH)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header(TEST_HEADER, signature);
        }

        self.send(builder.body(Body::from(body.into()))?).await
    }

    /// Sends a GET request.
    ///
    /// # Errors
    ///
    /// Fails if the router cannot serve the request.
    pub async fn get(&self, path: &str) -> Result<TestResponse> {
        self.send(Request::builder().method(Method::GET).uri(path).body(Body::empty())?).await
    }

    /// Sends any request through the router.
    ///
    /// # Errors
    ///
    /// Fails if the router cannot serve the request or the body cannot be
    /// read.
    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        Ok(TestResponse { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_are_hex_digests() {
        let signature = sign(b"{}");
        assert_eq!(signature.len(), 64);
        assert_ne!(signature, sign_with(b"{}", "other"));
    }

    #[tokio::test]
    async fn harness_serves_health() {
        let gate = TestGate::new().unwrap();
        let response = gate.get("/health").await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["status"], "alive");
    }

    #[tokio::test]
    async fn harness_records_events() {
        let gate = TestGate::new().unwrap();
        gate.post_signed(&scenarios::valid_flag()).await.unwrap();
        gate.post_unsigned(&scenarios::valid_flag()).await.unwrap();

        assert_eq!(gate.events.accepted_count(), 1);
        assert_eq!(gate.events.rejected_count(), 1);
    }
}
