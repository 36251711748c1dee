//! Router-level tests: middleware, status mapping and event publication.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use flaggate_api::{
    pipeline::{Rejection, Stage},
    RouterOptions, SignatureStage, ValidationPipeline, WebhookRequest,
};
use flaggate_core::{ErrorResponse, EventHandler, GateEvent};
use flaggate_testing::{scenarios, sign, test_settings, FlagPayloadBuilder, TestGate, TEST_HEADER};
use serde_json::json;

#[derive(Debug)]
struct SlowSubscriber;

#[async_trait]
impl EventHandler for SlowSubscriber {
    async fn handle_event(&self, _event: GateEvent) {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
}

#[derive(Debug)]
struct PanickingStage;

impl Stage for PanickingStage {
    fn name(&self) -> &str {
        "panicking"
    }

    fn check(&self, _request: &WebhookRequest) -> Result<(), Rejection> {
        panic!("stage blew up");
    }
}

#[tokio::test]
async fn every_response_carries_request_id() {
    let gate = TestGate::new().unwrap();

    let health = gate.get("/health").await.unwrap();
    let rejected = gate.post_unsigned(&scenarios::valid_flag()).await.unwrap();

    let first = health.headers.get("x-request-id").expect("request id on health");
    let second = rejected.headers.get("x-request-id").expect("request id on rejection");
    assert_ne!(first, second);
}

#[tokio::test]
async fn health_reports_alive() {
    let gate = TestGate::new().unwrap();

    let response = gate.get("/health").await.unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "alive");
    assert_eq!(response.body["service"], "flaggate");
    assert!(response.body["timestamp"].is_string());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let gate = TestGate::new().unwrap();

    let response = gate.get("/validate").await.unwrap();

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_on_validation_route_is_not_allowed() {
    let gate = TestGate::new().unwrap();

    let response = gate.get("/validate-flag").await.unwrap();

    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn permissive_cors_answers_any_origin() {
    let gate = TestGate::new().unwrap();
    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header(header::ORIGIN, "https://dashboard.example.com")
        .body(Body::empty())
        .unwrap();

    let response = gate.send(request).await.unwrap();

    assert_eq!(
        response.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).map(|v| v.as_bytes()),
        Some(b"*".as_slice())
    );
}

#[tokio::test]
async fn cors_can_be_disabled() {
    let options = RouterOptions { cors_permissive: false, ..RouterOptions::default() };
    let gate = TestGate::with_options(options).unwrap();
    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header(header::ORIGIN, "https://dashboard.example.com")
        .body(Body::empty())
        .unwrap();

    let response = gate.send(request).await.unwrap();

    assert!(response.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn oversized_body_is_rejected_before_validation() {
    let options = RouterOptions { max_body_bytes: 64, ..RouterOptions::default() };
    let gate = TestGate::with_options(options).unwrap();
    let body = FlagPayloadBuilder::with_defaults().build_bytes();
    assert!(body.len() > 64);
    let signature = sign(&body);

    let response = gate.post_raw(body, Some(&signature)).await.unwrap();

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(
        response.body,
        json!({
            "isValid": false,
            "errors": [{"field": "request", "message": "Request body is too large"}]
        })
    );
    assert!(gate.events.events().is_empty());
}

#[tokio::test]
async fn slow_request_times_out_with_json_body() {
    let options = RouterOptions { request_timeout: Duration::from_millis(20), ..RouterOptions::default() };
    let gate = TestGate::with_subscriber(Arc::new(SlowSubscriber), options).unwrap();

    let response = gate.post_signed(&scenarios::valid_flag()).await.unwrap();

    assert_eq!(response.status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(response.headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(response.body["isValid"], false);
    assert_eq!(response.body["errors"][0]["message"], "Request timed out");
}

#[tokio::test]
async fn panicking_stage_renders_internal_error() {
    let pipeline = ValidationPipeline::from_stages(vec![
        Box::new(SignatureStage::new(&test_settings()).unwrap()),
        Box::new(PanickingStage),
    ]);
    let gate = TestGate::from_pipeline(pipeline, RouterOptions::default());

    let response = gate.post_signed(&scenarios::valid_flag()).await.unwrap();

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body, serde_json::to_value(ErrorResponse::internal()).unwrap());
}

#[tokio::test]
async fn accepted_event_carries_payload() {
    let gate = TestGate::new().unwrap();
    let payload = scenarios::valid_flag();

    let response = gate.post_signed(&payload).await.unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({"isValid": true}));

    let events = gate.events.events();
    assert_eq!(events.len(), 1);
    let GateEvent::Accepted(accepted) = &events[0] else {
        panic!("expected accepted event");
    };
    assert_eq!(accepted.payload, payload);
}

#[tokio::test]
async fn rejections_never_reach_success_subscribers() {
    let gate = TestGate::new().unwrap();

    gate.post_unsigned(&scenarios::valid_flag()).await.unwrap();
    gate.post_signed(&scenarios::unprefixed_name()).await.unwrap();
    gate.post_raw(b"{}".to_vec(), Some("zz")).await.unwrap();

    assert_eq!(gate.events.accepted_count(), 0);
    assert_eq!(gate.events.rejected_count(), 3);
}

#[tokio::test]
async fn rejected_event_mirrors_response() {
    let gate = TestGate::new().unwrap();

    let response = gate.post_signed(&scenarios::empty_tags()).await.unwrap();

    let events = gate.events.events();
    let GateEvent::Rejected(rejected) = &events[0] else {
        panic!("expected rejected event");
    };
    assert_eq!(rejected.stage, "flag-config");
    assert_eq!(rejected.status, 422);
    assert_eq!(serde_json::to_value(&rejected.response).unwrap(), response.body);
}

#[tokio::test]
async fn signature_header_name_is_case_insensitive() {
    let gate = TestGate::new().unwrap();
    let body = FlagPayloadBuilder::with_defaults().build_bytes();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/validate-flag")
        .header(TEST_HEADER.to_lowercase(), sign(&body))
        .body(Body::from(body))
        .unwrap();

    let response = gate.send(request).await.unwrap();

    assert_eq!(response.status, StatusCode::OK);
}
