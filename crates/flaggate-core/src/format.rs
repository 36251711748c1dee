//! Conversion of collected failures into the canonical error response.

use crate::{
    error::{GateError, Result},
    models::{ErrorResponse, FieldError, PayloadContext, ValidationFailure},
};

/// Builds the error response for a rejected request.
///
/// Each failure path is dot-joined into the `field` entry and the context is
/// merged into the top level of the body.
///
/// # Errors
///
/// Returns `GateError::NoFailures` when `failures` is empty; a rejection
/// without a reason is a caller bug.
pub fn format_error_response(
    failures: &[ValidationFailure],
    context: PayloadContext,
) -> Result<ErrorResponse> {
    if failures.is_empty() {
        return Err(GateError::NoFailures);
    }

    Ok(ErrorResponse {
        is_valid: false,
        maintainer: context.maintainer,
        flag: context.flag,
        errors: failures.iter().map(FieldError::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::context::extract_context;

    #[test]
    fn empty_failures_are_rejected() {
        let result = format_error_response(&[], PayloadContext::empty());
        assert!(matches!(result, Err(GateError::NoFailures)));
    }

    #[test]
    fn failures_keep_order_and_join_paths() {
        let failures = vec![
            ValidationFailure::new(["currentVersion", "name"], "Flag name must start with ff_ prefix"),
            ValidationFailure::new(["accesses", "0", "action"], "Action must be one of: createFlag"),
        ];

        let response = format_error_response(&failures, PayloadContext::empty()).unwrap();

        assert!(!response.is_valid);
        assert_eq!(response.errors.len(), 2);
        assert_eq!(response.errors[0].field, "currentVersion.name");
        assert_eq!(response.errors[1].field, "accesses.0.action");
    }

    #[test]
    fn context_is_merged_at_top_level() {
        let payload = json!({
            "titleVerb": "created the flag",
            "currentVersion": {
                "name": "myflag",
                "key": "ff_myflag",
                "_maintainer": {"firstName": "Ada", "_links": {"self": {}}}
            }
        });
        let failures =
            vec![ValidationFailure::new(["currentVersion", "name"], "Flag name must start with ff_ prefix")];

        let response = format_error_response(&failures, extract_context(Some(&payload))).unwrap();

        insta::assert_json_snapshot!(response, @r###"
        {
          "isValid": false,
          "maintainer": {
            "firstName": "Ada"
          },
          "flag": {
            "name": "myflag",
            "key": "ff_myflag",
            "titleVerb": "created the flag"
          },
          "errors": [
            {
              "field": "currentVersion.name",
              "message": "Flag name must start with ff_ prefix"
            }
          ]
        }
        "###);
    }
}
