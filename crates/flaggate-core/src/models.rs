//! Wire shapes and domain values shared across the gate.
//!
//! `ErrorResponse` and `SuccessResponse` are the JSON contract returned to
//! webhook senders and consumed by alerting and audit tooling; their field
//! names and ordering must stay stable across every failure cause.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field reported by the generic internal-error response.
pub const INTERNAL_ERROR_FIELD: &str = "middleware";

/// Message reported by the generic internal-error response.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal validation/verification error";

/// Field reported when a request is refused before validation runs.
pub const REQUEST_ERROR_FIELD: &str = "request";

/// A single field-level validation failure.
///
/// The path is kept as ordered segments; array indices appear as decimal
/// segments (`["accesses", "0", "resource"]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFailure {
    /// Location of the offending value inside the payload.
    pub field_path: Vec<String>,
    /// Human-readable description of the violation.
    pub message: String,
}

impl ValidationFailure {
    /// Creates a failure at the given path.
    pub fn new<I, S>(field_path: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { field_path: field_path.into_iter().map(Into::into).collect(), message: message.into() }
    }

    /// Returns the path joined with `.`.
    pub fn dotted_path(&self) -> String {
        self.field_path.join(".")
    }
}

/// One entry of the `errors` array on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Dot-joined field path.
    pub field: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl From<&ValidationFailure> for FieldError {
    fn from(failure: &ValidationFailure) -> Self {
        Self { field: failure.dotted_path(), message: failure.message.clone() }
    }
}

/// Descriptive flag fields copied out of the payload for error responses.
///
/// Fields missing from the payload are left out of the serialized form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagSummary {
    /// `currentVersion.name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    /// `currentVersion.kind`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Value>,
    /// `currentVersion.key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Value>,
    /// Top-level `title`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,
    /// Top-level `titleVerb`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_verb: Option<Value>,
    /// `currentVersion.creationDate`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<Value>,
}

/// Context describing who and what a rejected payload was about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadContext {
    /// The flag maintainer, with internal link metadata stripped.
    pub maintainer: Option<Map<String, Value>>,
    /// Summary of the flag under change.
    pub flag: Option<FlagSummary>,
}

impl PayloadContext {
    /// Returns an empty context.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true when neither maintainer nor flag could be extracted.
    pub fn is_empty(&self) -> bool {
        self.maintainer.is_none() && self.flag.is_none()
    }
}

/// Body returned for every rejected request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Always `false`.
    pub is_valid: bool,
    /// Maintainer of the flag, when it could be extracted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintainer: Option<Map<String, Value>>,
    /// Flag summary, when it could be extracted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<FlagSummary>,
    /// Every failure that caused the rejection.
    pub errors: Vec<FieldError>,
}

impl ErrorResponse {
    /// The fixed body for unexpected internal failures.
    ///
    /// Carries no payload context and no detail about what went wrong.
    pub fn internal() -> Self {
        Self {
            is_valid: false,
            maintainer: None,
            flag: None,
            errors: vec![FieldError {
                field: INTERNAL_ERROR_FIELD.to_string(),
                message: INTERNAL_ERROR_MESSAGE.to_string(),
            }],
        }
    }

    /// Body for a request the transport refused before the pipeline ran,
    /// such as an oversized body or a timeout.
    pub fn request_rejected(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            maintainer: None,
            flag: None,
            errors: vec![FieldError {
                field: REQUEST_ERROR_FIELD.to_string(),
                message: message.into(),
            }],
        }
    }
}

/// Body returned when every stage passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse {
    /// Always `true`.
    pub is_valid: bool,
}

impl SuccessResponse {
    /// Creates the success body.
    pub const fn new() -> Self {
        Self { is_valid: true }
    }
}

impl Default for SuccessResponse {
    fn default() -> Self {
        Self::new()
    }
}
