//! HTTP request handlers for the flag webhook gate.
//!
//! - `validate` runs the validation pipeline for flag-change webhooks
//! - `health` answers liveness probes
//!
//! Every rejection body has the same shape: `isValid: false`, the list of
//! field errors, and whatever maintainer and flag context could be read from
//! the payload.

pub mod health;
pub mod validate;

pub use health::liveness_check;
pub use validate::validate_flag;
