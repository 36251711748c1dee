//! Error taxonomy for the webhook gate.
//!
//! Splits failures into the expected, caller-facing outcomes (authentication
//! and schema rejections) and internal faults (configuration mistakes and
//! programming errors). Each variant carries a stable code so logs and
//! downstream consumers can disambiguate without parsing messages.

use thiserror::Error;

/// Result type alias using `GateError`.
pub type Result<T> = std::result::Result<T, GateError>;

/// Gate error types with stable codes.
#[derive(Debug, Error)]
pub enum GateError {
    // Authentication (E1001-E1003)
    /// The configured signature header is absent from the request (E1001).
    #[error("[E1001] Missing signature header: {header}")]
    MissingSignatureHeader {
        /// Name of the header that was expected
        header: String,
    },

    /// The signature is not hex or has the wrong digest length (E1002).
    #[error("[E1002] Malformed signature")]
    MalformedSignature,

    /// The signature does not match the payload (E1003).
    #[error("[E1003] Invalid signature: HMAC validation failed")]
    InvalidSignature,

    // Validation (E2001)
    /// One or more schema constraints were violated (E2001).
    #[error("[E2001] Schema violation: {schema} reported {count} failure(s)")]
    SchemaViolation {
        /// Name of the schema that rejected the payload
        schema: String,
        /// Number of collected failures
        count: usize,
    },

    // Configuration and internal (E3001-E3004)
    /// No shared secret was configured (E3001).
    #[error("[E3001] Missing webhook secret")]
    MissingSecret,

    /// The signature header name is absent or not a valid header name (E3002).
    #[error("[E3002] Invalid signature header name: {0:?}")]
    InvalidHeaderName(String),

    /// A schema could not be built from its declaration (E3003).
    #[error("[E3003] Schema definition error in {schema}: {reason}")]
    SchemaDefinition {
        /// Name of the schema being built
        schema: String,
        /// What was wrong with the declaration
        reason: String,
    },

    /// The error formatter was handed an empty failure list (E3004).
    #[error("[E3004] Error response requested without any failures")]
    NoFailures,

    /// Anything else that went wrong inside the gate.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GateError {
    /// Returns the stable error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingSignatureHeader { .. } => "E1001",
            Self::MalformedSignature => "E1002",
            Self::InvalidSignature => "E1003",
            Self::SchemaViolation { .. } => "E2001",
            Self::MissingSecret => "E3001",
            Self::InvalidHeaderName(_) => "E3002",
            Self::SchemaDefinition { .. } => "E3003",
            Self::NoFailures => "E3004",
            Self::Internal(_) => "E9999",
        }
    }

    /// Returns whether this error is an authentication failure.
    pub const fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::MissingSignatureHeader { .. } | Self::MalformedSignature | Self::InvalidSignature
        )
    }

    /// Returns whether this error is an internal fault rather than a
    /// caller-facing rejection.
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::MissingSecret
                | Self::InvalidHeaderName(_)
                | Self::SchemaDefinition { .. }
                | Self::NoFailures
                | Self::Internal(_)
        )
    }
}
