//! Configuration management for the flag webhook gate.

use std::{fmt, net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use axum::http::HeaderName;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::pipeline::GateSettings;

const CONFIG_FILE: &str = "flaggate.toml";

const ENV_PREFIX: &str = "FLAGGATE_";

/// Shared secret used to verify webhook signatures.
///
/// `Debug` never prints the value.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    /// Wraps a secret value.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether no secret was configured.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("WebhookSecret(<unset>)")
        } else {
            f.write_str("WebhookSecret([redacted])")
        }
    }
}

/// Service configuration with defaults, file, and environment overrides.
///
/// Configuration is loaded in priority order:
/// 1. `WEBHOOK_SECRET` and `X_LD_HEADER` (highest priority)
/// 2. `FLAGGATE_*` environment variables, e.g. `FLAGGATE_PORT`
/// 3. Configuration file (`flaggate.toml`)
/// 4. Built-in defaults (lowest priority)
///
/// The secret and signature header have no defaults and must be supplied.
///
/// # Example
///
/// ```no_run
/// use flaggate_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
///
/// println!("Server will bind to {}:{}", config.host, config.port);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Authentication
    /// Shared secret for HMAC-SHA256 signatures.
    ///
    /// Environment variable: `WEBHOOK_SECRET` or `FLAGGATE_WEBHOOK_SECRET`
    #[serde(default)]
    pub webhook_secret: WebhookSecret,
    /// Name of the header carrying the signature.
    ///
    /// Environment variable: `X_LD_HEADER` or `FLAGGATE_SIGNATURE_HEADER`
    #[serde(default)]
    pub signature_header: String,

    // Server
    /// Server bind address.
    ///
    /// Environment variable: `FLAGGATE_HOST`
    #[serde(default = "default_host")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `FLAGGATE_PORT`
    #[serde(default = "default_port")]
    pub port: u16,
    /// HTTP request timeout in seconds.
    ///
    /// Environment variable: `FLAGGATE_REQUEST_TIMEOUT`
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Largest accepted request body in bytes.
    ///
    /// Environment variable: `FLAGGATE_MAX_BODY_BYTES`
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Whether to answer cross-origin requests from any origin.
    ///
    /// Environment variable: `FLAGGATE_CORS_PERMISSIVE`
    #[serde(default = "default_cors_permissive")]
    pub cors_permissive: bool,

    // Logging
    /// Base log level. `RUST_LOG` takes precedence when set.
    ///
    /// Environment variable: `FLAGGATE_RUST_LOG`
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

impl Config {
    /// Load configuration from defaults, config file, and environment variable
    /// overrides.
    ///
    /// # Errors
    ///
    /// Fails if a source cannot be parsed or a value is invalid, including a
    /// missing secret or signature header.
    pub fn load() -> Result<Self> {
        let config: Self = Self::figment().extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Env::raw().only(&["WEBHOOK_SECRET"]))
            .merge(Env::raw().only(&["X_LD_HEADER"]).map(|_| "signature_header".into()))
    }

    /// Authentication settings for the validation pipeline.
    pub fn to_gate_settings(&self) -> GateSettings {
        GateSettings::new(self.webhook_secret.expose(), self.signature_header.trim())
    }

    /// Parse server socket address from host and port configuration.
    ///
    /// # Errors
    ///
    /// Fails if host and port do not form a socket address.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Request timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.webhook_secret.is_empty() {
            anyhow::bail!("webhook_secret is required (set WEBHOOK_SECRET)");
        }

        if self.signature_header.trim().is_empty() {
            anyhow::bail!("signature_header is required (set X_LD_HEADER)");
        }

        HeaderName::from_str(self.signature_header.trim()).with_context(|| {
            format!("signature_header {:?} is not a valid header name", self.signature_header)
        })?;

        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.request_timeout == 0 {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if self.max_body_bytes == 0 {
            anyhow::bail!("max_body_bytes must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webhook_secret: WebhookSecret::default(),
            signature_header: String::new(),
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
            cors_permissive: default_cors_permissive(),
            rust_log: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_cors_permissive() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
