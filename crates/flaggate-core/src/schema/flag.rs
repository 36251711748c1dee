//! Schemas for feature-flag change webhooks.
//!
//! Two independent schemas guard the `/validate-flag` route: one for the
//! access list describing what the change does, one for the flag definition
//! itself. Both tolerate fields they do not mention.

use serde_json::json;

use super::{MessageKey, Schema};
use crate::error::Result;

/// Name of the access-list schema.
pub const FLAG_ACTION_SCHEMA: &str = "flag-action";

/// Name of the flag-definition schema.
pub const FLAG_CONFIG_SCHEMA: &str = "flag-config";

/// Prefix every flag name and key must carry.
pub const FLAG_PREFIX: &str = "ff_";

/// Pattern enforcing [`FLAG_PREFIX`].
pub const FLAG_PREFIX_PATTERN: &str = "^ff_";

/// Actions accepted in `accesses[].action`.
pub const VALID_ACTIONS: [&str; 1] = ["createFlag"];

/// Accepted values of `currentVersion.kind`.
pub const FLAG_KINDS: [&str; 4] = ["boolean", "multivariate", "string", "number"];

/// Characters allowed in a tag.
pub const TAG_PATTERN: &str = "^[a-zA-Z0-9_-]+$";

/// Minimum tag length in characters.
pub const TAG_MIN_LEN: usize = 4;

/// Maximum tag length in characters.
pub const TAG_MAX_LEN: usize = 30;

/// Builds the schema for the `accesses` array.
///
/// # Errors
///
/// Returns `GateError::SchemaDefinition` if the document does not compile.
pub fn flag_action_schema() -> Result<Schema> {
    let document = json!({
        "type": "object",
        "additionalProperties": true,
        "required": ["accesses"],
        "properties": {
            "accesses": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": true,
                    "required": ["action", "resource"],
                    "properties": {
                        "action": {"type": "string", "not": {"const": ""}, "enum": VALID_ACTIONS},
                        "resource": {"type": "string", "not": {"const": ""}}
                    }
                }
            }
        }
    });

    Schema::builder(FLAG_ACTION_SCHEMA, document)
        .message("accesses", MessageKey::Required, "Action is required")
        .message(
            "accesses[].action",
            MessageKey::AnyOnly,
            format!("Action must be one of: {}", VALID_ACTIONS.join(", ")),
        )
        .build()
}

/// Builds the schema for `currentVersion`.
///
/// # Errors
///
/// Returns `GateError::SchemaDefinition` if the document does not compile.
pub fn flag_config_schema() -> Result<Schema> {
    let document = json!({
        "type": "object",
        "additionalProperties": true,
        "required": ["currentVersion"],
        "properties": {
            "currentVersion": {
                "type": "object",
                "additionalProperties": true,
                "required": ["name", "key", "description", "kind", "tags"],
                "properties": {
                    "name": {"type": "string", "not": {"const": ""}, "pattern": FLAG_PREFIX_PATTERN},
                    "key": {"type": "string", "not": {"const": ""}, "pattern": FLAG_PREFIX_PATTERN},
                    "description": {"type": "string", "not": {"const": ""}, "minLength": 1},
                    "kind": {"type": "string", "not": {"const": ""}, "enum": FLAG_KINDS},
                    "tags": {
                        "type": "array",
                        "minItems": 1,
                        "items": {
                            "type": "string",
                            "not": {"const": ""},
                            "pattern": TAG_PATTERN,
                            "minLength": TAG_MIN_LEN,
                            "maxLength": TAG_MAX_LEN
                        }
                    }
                }
            }
        }
    });

    Schema::builder(FLAG_CONFIG_SCHEMA, document)
        .required()
        .message("currentVersion", MessageKey::Required, "Flag Configuration is required")
        .message("currentVersion.name", MessageKey::Required, "Name is required")
        .message(
            "currentVersion.name",
            MessageKey::StringPattern,
            format!("Flag name must start with {FLAG_PREFIX} prefix"),
        )
        .message("currentVersion.key", MessageKey::Required, "Key is required")
        .message(
            "currentVersion.key",
            MessageKey::StringPattern,
            format!("Flag key must start with {FLAG_PREFIX} prefix"),
        )
        .message("currentVersion.description", MessageKey::Required, "Description is required")
        .message(
            "currentVersion.description",
            MessageKey::StringMin,
            "Description must be at least 1 character",
        )
        .message("currentVersion.kind", MessageKey::Required, "Kind is required")
        .message(
            "currentVersion.kind",
            MessageKey::AnyOnly,
            format!("Kind must be one of: {}", FLAG_KINDS.join(", ")),
        )
        .message("currentVersion.tags", MessageKey::Required, "Tags are required")
        .message("currentVersion.tags", MessageKey::ArrayMin, "At least one tag is required")
        .message(
            "currentVersion.tags[]",
            MessageKey::StringPattern,
            "Tags can only contain letters, numbers, hyphens and underscores",
        )
        .message(
            "currentVersion.tags[]",
            MessageKey::StringMin,
            format!("Each tag must be at least {TAG_MIN_LEN} characters"),
        )
        .message(
            "currentVersion.tags[]",
            MessageKey::StringMax,
            format!("Each tag cannot exceed {TAG_MAX_LEN} characters"),
        )
        .build()
}
