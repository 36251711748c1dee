//! Ordered validation stages with short-circuit semantics.
//!
//! A request moves through the stages in order:
//!
//! ```text
//! Authenticating ──▶ ValidatingSchema(1) ──▶ … ──▶ ValidatingSchema(n) ──▶ Accepted
//!       │                    │                             │
//!       └────────────────────┴──────────────┬──────────────┘
//!                                           ▼
//!                                       Rejected
//! ```
//!
//! The first stage that fails decides the response: 401 for authentication
//! failures, 422 for schema violations and 500 for internal faults. Later
//! stages never run after a failure. The pipeline holds only immutable
//! configuration and keeps no state between requests.

use std::{fmt, sync::Arc};

use axum::{
    http::{HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use flaggate_core::{
    extract_context, format_error_response,
    schema::flag::{flag_action_schema, flag_config_schema},
    ErrorResponse, GateError, PayloadValidator, SuccessResponse, ValidationFailure,
};
use tracing::{debug, error, info, warn};

use crate::{
    crypto::{verify_signature, SignatureError},
    request::{HeaderText, WebhookRequest},
};

/// Immutable authentication settings, fixed at startup.
#[derive(Clone)]
pub struct GateSettings {
    secret: String,
    signature_header: String,
}

impl GateSettings {
    /// Creates settings from the shared secret and signature header name.
    pub fn new(secret: impl Into<String>, signature_header: impl Into<String>) -> Self {
        Self { secret: secret.into(), signature_header: signature_header.into() }
    }

    /// The header carrying the signature, as configured.
    pub fn signature_header(&self) -> &str {
        &self.signature_header
    }
}

impl fmt::Debug for GateSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateSettings")
            .field("secret", &"[redacted]")
            .field("signature_header", &self.signature_header)
            .finish()
    }
}

/// Where a request currently is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Checking the signature.
    Authenticating,
    /// Running the n-th schema (1-based).
    ValidatingSchema(usize),
    /// Every stage passed.
    Accepted,
    /// A stage failed.
    Rejected,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authenticating => write!(f, "authenticating"),
            Self::ValidatingSchema(n) => write!(f, "validating_schema_{n}"),
            Self::Accepted => write!(f, "accepted"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Why a stage stopped the request.
#[derive(Debug)]
pub enum Rejection {
    /// Authentication failed.
    Unauthorized(ValidationFailure),
    /// The payload violated one or more constraints.
    Unprocessable(Vec<ValidationFailure>),
    /// The stage itself could not run.
    Internal(GateError),
}

impl Rejection {
    /// HTTP status for this rejection.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// One step of the pipeline.
pub trait Stage: Send + Sync + fmt::Debug {
    /// Name used in logs and events.
    fn name(&self) -> &str;

    /// Whether this stage authenticates the caller.
    fn is_authentication(&self) -> bool {
        false
    }

    /// Checks the request.
    ///
    /// # Errors
    ///
    /// Returns the rejection that ends the pipeline.
    fn check(&self, request: &WebhookRequest) -> Result<(), Rejection>;
}

/// Verifies the HMAC signature of the raw body.
pub struct SignatureStage {
    header: HeaderName,
    header_label: String,
    secret: String,
}

impl SignatureStage {
    /// Name reported for this stage.
    pub const NAME: &'static str = "signature";

    /// Builds the stage.
    ///
    /// # Errors
    ///
    /// Returns `GateError::MissingSecret` if the secret is empty and
    /// `GateError::InvalidHeaderName` if the header name is empty or not a
    /// valid HTTP header name.
    pub fn new(settings: &GateSettings) -> Result<Self, GateError> {
        if settings.secret.is_empty() {
            return Err(GateError::MissingSecret);
        }

        let label = settings.signature_header.trim();
        let header = HeaderName::try_from(label)
            .map_err(|_| GateError::InvalidHeaderName(settings.signature_header.clone()))?;

        Ok(Self { header, header_label: label.to_string(), secret: settings.secret.clone() })
    }

    fn failure(&self, message: impl Into<String>) -> Rejection {
        Rejection::Unauthorized(ValidationFailure::new([self.header_label.clone()], message))
    }
}

impl fmt::Debug for SignatureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureStage").field("header", &self.header).finish_non_exhaustive()
    }
}

impl Stage for SignatureStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_authentication(&self) -> bool {
        true
    }

    fn check(&self, request: &WebhookRequest) -> Result<(), Rejection> {
        let result = match request.header_text(&self.header) {
            HeaderText::Missing => verify_signature(request.raw_body(), None, &self.secret),
            HeaderText::Opaque => Err(SignatureError::MalformedSignature),
            HeaderText::Present(value) => {
                verify_signature(request.raw_body(), Some(value), &self.secret)
            },
        };

        let Err(error) = result else {
            return Ok(());
        };
        debug!(code = error.into_gate_error(&self.header_label).code(), "Signature check failed");

        match error {
            SignatureError::MissingSignature => {
                Err(self.failure(format!("Missing header: {}", self.header_label)))
            },
            SignatureError::MalformedSignature => Err(self.failure("Malformed signature")),
            SignatureError::InvalidSignature => Err(self.failure("Invalid signature")),
            SignatureError::InvalidSecret => {
                Err(Rejection::Internal(error.into_gate_error(&self.header_label)))
            },
        }
    }
}

/// Runs one payload validator in collect-all mode.
#[derive(Debug, Clone)]
pub struct SchemaStage {
    validator: Arc<dyn PayloadValidator>,
}

impl SchemaStage {
    /// Wraps a validator.
    pub fn new(validator: Arc<dyn PayloadValidator>) -> Self {
        Self { validator }
    }
}

impl Stage for SchemaStage {
    fn name(&self) -> &str {
        self.validator.name()
    }

    fn check(&self, request: &WebhookRequest) -> Result<(), Rejection> {
        let failures = self.validator.validate(request.body()).map_err(Rejection::Internal)?;

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Rejection::Unprocessable(failures))
        }
    }
}

/// Final decision for one request.
#[derive(Debug, Clone)]
pub enum Verdict {
    /// Every stage passed.
    Accepted,
    /// A stage rejected the request.
    Rejected {
        /// Name of the deciding stage.
        stage: String,
        /// HTTP status to send.
        status: StatusCode,
        /// Body to send.
        response: ErrorResponse,
    },
}

impl Verdict {
    /// The terminal pipeline state.
    pub const fn state(&self) -> PipelineState {
        match self {
            Self::Accepted => PipelineState::Accepted,
            Self::Rejected { .. } => PipelineState::Rejected,
        }
    }

    /// HTTP status to send.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Accepted => StatusCode::OK,
            Self::Rejected { status, .. } => *status,
        }
    }
}

impl IntoResponse for Verdict {
    fn into_response(self) -> Response {
        match self {
            Self::Accepted => (StatusCode::OK, Json(SuccessResponse::new())).into_response(),
            Self::Rejected { status, response, .. } => (status, Json(response)).into_response(),
        }
    }
}

/// The ordered chain of stages.
#[derive(Debug)]
pub struct ValidationPipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl ValidationPipeline {
    /// Builds a pipeline that authenticates, then runs `validators` in order.
    ///
    /// # Errors
    ///
    /// Fails fast if the secret or signature header is missing or invalid.
    pub fn new(
        settings: &GateSettings,
        validators: Vec<Arc<dyn PayloadValidator>>,
    ) -> Result<Self, GateError> {
        let mut stages: Vec<Box<dyn Stage>> = vec![Box::new(SignatureStage::new(settings)?)];
        stages.extend(
            validators.into_iter().map(|v| Box::new(SchemaStage::new(v)) as Box<dyn Stage>),
        );
        Ok(Self { stages })
    }

    /// Builds the flag-change gate: signature, access list, flag definition.
    ///
    /// # Errors
    ///
    /// Fails if the settings are invalid or a schema cannot be built.
    pub fn flag_gate(settings: &GateSettings) -> Result<Self, GateError> {
        let action: Arc<dyn PayloadValidator> = Arc::new(flag_action_schema()?);
        let config: Arc<dyn PayloadValidator> = Arc::new(flag_config_schema()?);
        Self::new(settings, vec![action, config])
    }

    /// Builds a pipeline from arbitrary stages.
    pub fn from_stages(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Runs every stage in order, stopping at the first rejection.
    pub fn run(&self, request: &WebhookRequest) -> Verdict {
        let mut schema_index = 0;

        for stage in &self.stages {
            let state = if stage.is_authentication() {
                PipelineState::Authenticating
            } else {
                schema_index += 1;
                PipelineState::ValidatingSchema(schema_index)
            };
            debug!(state = %state, stage = stage.name(), "Running pipeline stage");

            if let Err(rejection) = stage.check(request) {
                return Self::reject(stage.name(), rejection, request);
            }
        }

        info!(stages = self.stages.len(), "All pipeline stages passed");
        Verdict::Accepted
    }

    fn reject(stage: &str, rejection: Rejection, request: &WebhookRequest) -> Verdict {
        let status = rejection.status();
        let failures = match rejection {
            Rejection::Unauthorized(failure) => vec![failure],
            Rejection::Unprocessable(failures) => {
                let violation =
                    GateError::SchemaViolation { schema: stage.to_string(), count: failures.len() };
                debug!(code = violation.code(), error = %violation, "Schema rejected payload");
                failures
            },
            Rejection::Internal(e) => return Self::internal(stage, &e),
        };

        match format_error_response(&failures, extract_context(request.body())) {
            Ok(response) => {
                warn!(
                    stage,
                    status = status.as_u16(),
                    failures = failures.len(),
                    "Webhook rejected"
                );
                Verdict::Rejected { stage: stage.to_string(), status, response }
            },
            Err(e) => Self::internal(stage, &e),
        }
    }

    fn internal(stage: &str, e: &GateError) -> Verdict {
        error!(stage, code = e.code(), error = %e, "Pipeline stage failed internally");
        Verdict::Rejected {
            stage: stage.to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            response: ErrorResponse::internal(),
        }
    }
}
