//! Flag-change webhook validation handler.
//!
//! Runs the pipeline over the exact bytes received, publishes the outcome to
//! the event subscribers, then answers with the verdict.

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use flaggate_core::GateEvent;
use serde_json::Value;
use tracing::{info, instrument};

use crate::{pipeline::Verdict, request::WebhookRequest, AppState};

/// Validates a flag-change webhook.
///
/// Responds with:
/// - 200 and `{"isValid": true}` when every stage passes
/// - 401 when the signature is missing, malformed or wrong
/// - 422 when the payload violates a schema
/// - 500 when a stage fails internally
///
/// Subscribers receive an `Accepted` event only for 200 responses. They run
/// after the verdict is reached and cannot change it.
#[instrument(
    name = "validate_flag",
    skip(state, headers, body),
    fields(body_len = body.len())
)]
pub async fn validate_flag(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = WebhookRequest::new(headers, body);
    let verdict = state.pipeline.run(&request);

    let event = match &verdict {
        Verdict::Accepted => {
            info!("Flag change passed validation");
            GateEvent::accepted(request.into_body().unwrap_or(Value::Null))
        },
        Verdict::Rejected { stage, status, response } => {
            GateEvent::rejected(stage.clone(), status.as_u16(), response.clone())
        },
    };
    state.events.handle_event(event).await;

    verdict.into_response()
}
