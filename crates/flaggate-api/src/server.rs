//! HTTP server configuration and request routing.
//!
//! Requests flow through middleware in order:
//! 1. CORS handling (if enabled)
//! 2. Request ID generation
//! 3. Request/response logging
//! 4. JSON rendering of transport rejections (413, 408)
//! 5. Timeout enforcement
//! 6. Body size limit
//! 7. Panic recovery
//! 8. Handler execution
//!
//! # Graceful Shutdown
//!
//! The server stops accepting connections on Ctrl-C or SIGTERM and lets
//! in-flight requests finish.

use std::{any::Any, net::SocketAddr, time::Duration};

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use flaggate_core::ErrorResponse;
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{config::Config, handlers, AppState};

/// Path of the validation endpoint.
pub const VALIDATE_FLAG_PATH: &str = "/validate-flag";

/// Path of the liveness endpoint.
pub const HEALTH_PATH: &str = "/health";

/// Transport limits applied around every route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterOptions {
    /// Time allowed for a request before it is aborted.
    pub request_timeout: Duration,
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
    /// Whether to answer cross-origin requests from any origin.
    pub cors_permissive: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_body_bytes: 1024 * 1024,
            cors_permissive: true,
        }
    }
}

impl From<&Config> for RouterOptions {
    fn from(config: &Config) -> Self {
        Self {
            request_timeout: config.request_timeout(),
            max_body_bytes: config.max_body_bytes,
            cors_permissive: config.cors_permissive,
        }
    }
}

/// Creates the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use flaggate_api::{create_router, AppState, GateSettings, RouterOptions, ValidationPipeline};
///
/// let settings = GateSettings::new("secret", "X-LD-Signature");
/// let pipeline = ValidationPipeline::flag_gate(&settings).expect("valid settings");
/// let app = create_router(AppState::new(Arc::new(pipeline)), RouterOptions::default());
/// // Serve the app...
/// ```
pub fn create_router(state: AppState, options: RouterOptions) -> Router {
    let router = Router::new()
        .route(HEALTH_PATH, get(handlers::liveness_check))
        .route(VALIDATE_FLAG_PATH, post(handlers::validate_flag))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(options.max_body_bytes))
        .layer(TimeoutLayer::new(options.request_timeout))
        .layer(middleware::map_response(render_transport_rejection))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id));

    let router = if options.cors_permissive {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(state)
}

/// Middleware to inject request ID into all responses.
///
/// Adds X-Request-Id header for tracing requests across services.
async fn inject_request_id(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let mut req = req;
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Message for a body over the configured limit.
const BODY_TOO_LARGE_MESSAGE: &str = "Request body is too large";

/// Message for a request that outlived the configured timeout.
const TIMED_OUT_MESSAGE: &str = "Request timed out";

/// Rewrites the plain-text 413 and empty 408 produced by the body-limit and
/// timeout layers into the JSON error shape.
async fn render_transport_rejection(response: Response) -> Response {
    let status = response.status();
    let message = match status {
        StatusCode::PAYLOAD_TOO_LARGE => BODY_TOO_LARGE_MESSAGE,
        StatusCode::REQUEST_TIMEOUT => TIMED_OUT_MESSAGE,
        _ => return response,
    };

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if is_json {
        return response;
    }

    warn!(status = status.as_u16(), message, "Request rejected before validation");
    (status, Json(ErrorResponse::request_rejected(message))).into_response()
}

/// Renders a panic anywhere below the router as the generic internal error.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    error!(detail, "Request handler panicked");

    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::internal())).into_response()
}

/// Starts the HTTP server with graceful shutdown support.
///
/// # Errors
///
/// Returns `std::io::Error` if the address cannot be bound.
pub async fn start_server(
    state: AppState,
    options: RouterOptions,
    addr: SocketAddr,
) -> Result<(), std::io::Error> {
    let app = create_router(state, options);

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("HTTP server listening on {}", actual_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    warn!("Waiting for in-flight requests to complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_render_internal_body() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = handle_panic(Box::new(String::from("boom")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = handle_panic(Box::new(42_u8));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn transport_rejections_become_json() {
        for (status, message) in [
            (StatusCode::PAYLOAD_TOO_LARGE, BODY_TOO_LARGE_MESSAGE),
            (StatusCode::REQUEST_TIMEOUT, TIMED_OUT_MESSAGE),
        ] {
            let plain = (status, "Length limit exceeded").into_response();

            let response = render_transport_rejection(plain).await;

            assert_eq!(response.status(), status);
            assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body, ErrorResponse::request_rejected(message));
        }
    }

    #[tokio::test]
    async fn other_responses_pass_through() {
        let response = render_transport_rejection(StatusCode::NOT_FOUND.into_response()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn router_options_follow_config() {
        let config = Config {
            request_timeout: 5,
            max_body_bytes: 2048,
            cors_permissive: false,
            ..Config::default()
        };

        let options = RouterOptions::from(&config);

        assert_eq!(options.request_timeout, Duration::from_secs(5));
        assert_eq!(options.max_body_bytes, 2048);
        assert!(!options.cors_permissive);
    }
}
