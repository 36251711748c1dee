//! Flag webhook gate.
//!
//! Main entry point for the gate server. Loads configuration, builds the
//! validation pipeline once, and serves until a shutdown signal arrives.

use std::sync::Arc;

use anyhow::{Context, Result};
use flaggate_api::{start_server, AppState, Config, RouterOptions, ValidationPipeline};
use flaggate_core::{LoggingEventHandler, MulticastEventHandler};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    init_tracing(&config.rust_log)?;

    info!("Starting flag webhook gate");
    info!(
        host = %config.host,
        port = config.port,
        signature_header = %config.signature_header,
        request_timeout = config.request_timeout,
        max_body_bytes = config.max_body_bytes,
        cors_permissive = config.cors_permissive,
        "Configuration loaded"
    );

    let pipeline = ValidationPipeline::flag_gate(&config.to_gate_settings())
        .context("Failed to build validation pipeline")?;
    info!(stages = ?pipeline.stage_names(), "Validation pipeline ready");

    let mut events = MulticastEventHandler::new();
    events.add_subscriber(Arc::new(LoggingEventHandler));

    let state = AppState::new(Arc::new(pipeline)).with_events(Arc::new(events));
    let addr = config.parse_server_addr()?;

    start_server(state, RouterOptions::from(&config), addr).await.context("Server failed")?;

    info!("Flag webhook gate shutdown complete");
    Ok(())
}

/// Initializes tracing with environment-based configuration.
///
/// `RUST_LOG` wins when set; otherwise `base_level` applies with debug
/// output for the gate and the HTTP layer.
fn init_tracing(base_level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{base_level},flaggate=debug,tower_http=debug")))
        .context("Invalid log filter")?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing")
}
