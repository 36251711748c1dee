//! Core validation logic for the flag webhook gate.
//!
//! Transport-free building blocks: JSON Schema validation and the flag
//! schemas, best-effort payload context extraction, the canonical
//! error response shape, the error taxonomy and the outcome events that
//! notification and audit hooks subscribe to.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod events;
pub mod format;
pub mod models;
pub mod schema;

pub use context::extract_context;
pub use error::{GateError, Result};
pub use events::{
    AcceptedEvent, EventHandler, GateEvent, LoggingEventHandler, MulticastEventHandler,
    NoOpEventHandler, RejectedEvent,
};
pub use format::format_error_response;
pub use models::{
    ErrorResponse, FieldError, FlagSummary, PayloadContext, SuccessResponse, ValidationFailure,
};
pub use schema::{MessageKey, PayloadValidator, Schema, SchemaBuilder};
