//! JSON Schema payload validation with collect-all reporting.
//!
//! A [`Schema`] wraps a JSON Schema document compiled once with
//! `jsonschema`, plus a table of custom messages keyed by field path and
//! [`MessageKey`]. Validation reports every violation the validator finds,
//! ordered by field declaration, with array items before the array's own
//! cardinality rule. Fields the document does not declare are ignored.
//!
//! Messages default to the wording webhook senders already see from the
//! upstream tooling (`"currentVersion.name" is required`). Strings are
//! declared non-empty with `"not": {"const": ""}`; an empty string reports
//! only that failure plus any closed-set failure.
//!
//! ```
//! use flaggate_core::schema::{MessageKey, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::builder(
//!     "greeting",
//!     json!({
//!         "type": "object",
//!         "required": ["word"],
//!         "properties": {"word": {"type": "string", "minLength": 3}}
//!     }),
//! )
//! .message("word", MessageKey::StringMin, "too short")
//! .build()
//! .unwrap();
//!
//! let failures = schema.validate(Some(&json!({"word": "hi", "extra": 1}))).unwrap_err();
//! assert_eq!(failures.len(), 1);
//! assert_eq!(failures[0].message, "too short");
//! ```

pub mod flag;

use std::{collections::HashMap, fmt};

use jsonschema::{error::ValidationErrorKind, Draft, ValidationError, Validator};
use serde_json::Value;

use crate::{
    error::{GateError, Result},
    models::ValidationFailure,
};

/// Label used in default messages for the payload root.
const ROOT_LABEL: &str = "value";

/// Identifies which check produced a failure, for message overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// A required value is missing (`required`).
    Required,
    /// The value is present but not a string.
    StringBase,
    /// The value is an empty string (`not: {const: ""}`).
    StringEmpty,
    /// The string is shorter than `minLength`.
    StringMin,
    /// The string is longer than `maxLength`.
    StringMax,
    /// The string does not match `pattern`.
    StringPattern,
    /// The value is outside the `enum` set.
    AnyOnly,
    /// The value is present but not an array.
    ArrayBase,
    /// The array has fewer items than `minItems`.
    ArrayMin,
    /// The array has more items than `maxItems`.
    ArrayMax,
    /// The value is present but not an object.
    ObjectBase,
}

impl MessageKey {
    /// Position of this failure among failures on the same value.
    const fn precedence(self) -> u8 {
        match self {
            Self::Required => 0,
            Self::AnyOnly => 1,
            Self::StringBase | Self::ArrayBase | Self::ObjectBase => 2,
            Self::StringEmpty => 3,
            Self::StringPattern => 4,
            Self::StringMin => 5,
            Self::StringMax => 6,
            Self::ArrayMin => 7,
            Self::ArrayMax => 8,
        }
    }

    /// String rules that an empty string does not report.
    const fn skipped_when_empty(self) -> bool {
        matches!(self, Self::StringPattern | Self::StringMin | Self::StringMax)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(name) => f.write_str(name),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Renders a path the way default messages show it: `accesses[0].resource`.
fn label(path: &[Segment]) -> String {
    if path.is_empty() {
        return ROOT_LABEL.to_string();
    }

    let mut rendered = String::new();
    for segment in path {
        match segment {
            Segment::Index(index) => rendered.push_str(&format!("[{index}]")),
            Segment::Key(name) => {
                if !rendered.is_empty() {
                    rendered.push('.');
                }
                rendered.push_str(name);
            },
        }
    }
    rendered
}

/// Field pattern used for message lookup: `accesses[].resource`.
fn field_pattern(path: &[Segment]) -> String {
    let mut pattern = String::new();
    for segment in path {
        push_segment(&mut pattern, segment);
    }
    pattern
}

fn push_segment(pattern: &mut String, segment: &Segment) {
    match segment {
        Segment::Index(_) => pattern.push_str("[]"),
        Segment::Key(name) => {
            if !pattern.is_empty() {
                pattern.push('.');
            }
            pattern.push_str(name);
        },
    }
}

/// Splits a JSON pointer into segments, telling indices from keys by
/// walking the payload alongside it.
fn resolve(payload: &Value, pointer: &str) -> Vec<Segment> {
    let mut current = Some(payload);
    let mut path = Vec::new();

    for raw in pointer.split('/').skip(1) {
        let token = raw.replace("~1", "/").replace("~0", "~");
        let segment = match (current, token.parse::<usize>()) {
            (Some(Value::Array(items)), Ok(index)) => {
                current = items.get(index);
                Segment::Index(index)
            },
            (Some(Value::Object(map)), _) => {
                current = map.get(&token);
                Segment::Key(token)
            },
            _ => {
                current = None;
                Segment::Key(token)
            },
        };
        path.push(segment);
    }
    path
}

/// Lists declared field patterns in declaration order: `required` names
/// first, then any other `properties`, then array `items`.
fn declared_fields(schema: &Value, prefix: &str, out: &mut Vec<String>) {
    if let Some(items) = schema.get("items") {
        let pattern = format!("{prefix}[]");
        out.push(pattern.clone());
        declared_fields(items, &pattern, out);
    }

    let properties = schema.get("properties").and_then(Value::as_object);
    let mut names: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if let Some(properties) = properties {
        let rest: Vec<&str> =
            properties.keys().map(String::as_str).filter(|name| !names.contains(name)).collect();
        names.extend(rest);
    }

    for name in names {
        let mut pattern = prefix.to_string();
        push_segment(&mut pattern, &Segment::Key(name.to_string()));
        out.push(pattern.clone());
        if let Some(child) = properties.and_then(|p| p.get(name)) {
            declared_fields(child, &pattern, out);
        }
    }
}

#[derive(Debug)]
struct Violation {
    path: Vec<Segment>,
    key: Option<MessageKey>,
    message: String,
}

/// Builder for [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    document: Value,
    root_required: bool,
    messages: Vec<(String, MessageKey, String)>,
}

impl SchemaBuilder {
    /// Rejects an absent payload with `"value" is required`.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.root_required = true;
        self
    }

    /// Overrides the message for one kind of failure on one field.
    ///
    /// `field` is written like `currentVersion.tags[]`; the empty string
    /// names the root.
    #[must_use]
    pub fn message(
        mut self,
        field: impl Into<String>,
        key: MessageKey,
        text: impl Into<String>,
    ) -> Self {
        self.messages.push((field.into(), key, text.into()));
        self
    }

    /// Compiles the document.
    ///
    /// # Errors
    ///
    /// Returns `GateError::SchemaDefinition` if the document does not
    /// compile or a message names a field the document does not declare.
    pub fn build(self) -> Result<Schema> {
        let Self { name, document, root_required, messages } = self;
        let definition_error =
            |reason: String| GateError::SchemaDefinition { schema: name.clone(), reason };

        let validator = jsonschema::options()
            .with_draft(Draft::Draft7)
            .build(&document)
            .map_err(|e| definition_error(format!("invalid schema: {e}")))?;

        let mut fields = Vec::new();
        declared_fields(&document, "", &mut fields);

        let undeclared: Vec<&str> = messages
            .iter()
            .map(|(field, _, _)| field.as_str())
            .filter(|field| !field.is_empty() && !fields.iter().any(|f| f == field))
            .collect();
        if !undeclared.is_empty() {
            return Err(definition_error(format!(
                "messages for undeclared fields: {}",
                undeclared.join(", ")
            )));
        }

        let messages =
            messages.into_iter().map(|(field, key, text)| ((field, key), text)).collect();

        Ok(Schema { name, document, validator, root_required, fields, messages })
    }
}

/// A named JSON Schema compiled once at startup.
pub struct Schema {
    name: String,
    document: Value,
    validator: Validator,
    root_required: bool,
    fields: Vec<String>,
    messages: HashMap<(String, MessageKey), String>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("root_required", &self.root_required)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl Schema {
    /// Starts a schema from a JSON Schema (draft 7) document.
    pub fn builder(name: impl Into<String>, document: Value) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            document,
            root_required: false,
            messages: Vec::new(),
        }
    }

    /// Returns the schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validates `payload`, collecting every violation.
    ///
    /// `None` stands for an absent payload.
    ///
    /// # Errors
    ///
    /// Returns all field-level failures, in declaration order, if any
    /// rule is violated.
    pub fn validate(&self, payload: Option<&Value>) -> std::result::Result<(), Vec<ValidationFailure>> {
        let Some(payload) = payload else {
            if !self.root_required {
                return Ok(());
            }
            let missing = self.violation(Vec::new(), Some(MessageKey::Required), || {
                format!("\"{ROOT_LABEL}\" is required")
            });
            return Err(vec![missing.into()]);
        };

        let mut violations: Vec<Violation> =
            self.validator.iter_errors(payload).map(|e| self.describe(&e, payload)).collect();

        if violations.is_empty() {
            return Ok(());
        }

        violations.sort_by_cached_key(|v| {
            (self.order_key(&v.path), v.key.map_or(u8::MAX, MessageKey::precedence))
        });

        let empty: Vec<Vec<Segment>> = violations
            .iter()
            .filter(|v| v.key == Some(MessageKey::StringEmpty))
            .map(|v| v.path.clone())
            .collect();
        violations.retain(|v| {
            !(v.key.is_some_and(MessageKey::skipped_when_empty) && empty.contains(&v.path))
        });

        Err(violations.into_iter().map(ValidationFailure::from).collect())
    }

    fn describe(&self, error: &ValidationError<'_>, payload: &Value) -> Violation {
        let instance_pointer = error.instance_path.to_string();
        let schema_pointer = error.schema_path.to_string();
        let mut path = resolve(payload, &instance_pointer);

        if let ValidationErrorKind::Required { property } = &error.kind {
            if let Some(name) = property.as_str() {
                path.push(Segment::Key(name.to_string()));
            }
        }

        let keyword = schema_pointer.rsplit('/').next().unwrap_or_default();
        let rule = self.document.pointer(&schema_pointer);
        let limit = rule.map(Value::to_string).unwrap_or_default();
        let field = label(&path);

        let (key, default) = match keyword {
            "required" => (Some(MessageKey::Required), format!("\"{field}\" is required")),
            "type" => match rule.and_then(Value::as_str) {
                Some("string") => {
                    (Some(MessageKey::StringBase), format!("\"{field}\" must be a string"))
                },
                Some("array") => {
                    (Some(MessageKey::ArrayBase), format!("\"{field}\" must be an array"))
                },
                Some("object") => {
                    (Some(MessageKey::ObjectBase), format!("\"{field}\" must be of type object"))
                },
                Some(other) => (None, format!("\"{field}\" must be a {other}")),
                None => (None, error.to_string()),
            },
            "not" => {
                (Some(MessageKey::StringEmpty), format!("\"{field}\" is not allowed to be empty"))
            },
            "enum" => {
                let allowed: Vec<String> = rule
                    .and_then(Value::as_array)
                    .map(|values| {
                        values
                            .iter()
                            .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
                (
                    Some(MessageKey::AnyOnly),
                    format!("\"{field}\" must be one of [{}]", allowed.join(", ")),
                )
            },
            "pattern" => {
                let text =
                    payload.pointer(&instance_pointer).and_then(Value::as_str).unwrap_or_default();
                let pattern = rule.and_then(Value::as_str).unwrap_or_default();
                (
                    Some(MessageKey::StringPattern),
                    format!(
                        "\"{field}\" with value \"{text}\" fails to match the required pattern: {pattern}"
                    ),
                )
            },
            "minLength" => (
                Some(MessageKey::StringMin),
                format!("\"{field}\" length must be at least {limit} characters long"),
            ),
            "maxLength" => (
                Some(MessageKey::StringMax),
                format!("\"{field}\" length must be less than or equal to {limit} characters long"),
            ),
            "minItems" => (
                Some(MessageKey::ArrayMin),
                format!("\"{field}\" must contain at least {limit} items"),
            ),
            "maxItems" => (
                Some(MessageKey::ArrayMax),
                format!("\"{field}\" must contain less than or equal to {limit} items"),
            ),
            _ => (None, error.to_string()),
        };

        self.violation(path, key, || default)
    }

    fn violation(
        &self,
        path: Vec<Segment>,
        key: Option<MessageKey>,
        default: impl FnOnce() -> String,
    ) -> Violation {
        let message = key
            .and_then(|key| self.messages.get(&(field_pattern(&path), key)))
            .cloned()
            .unwrap_or_else(default);
        Violation { path, key, message }
    }

    /// Sort key placing siblings in declaration order and a container
    /// after everything reported inside it.
    fn order_key(&self, path: &[Segment]) -> Vec<usize> {
        let mut pattern = String::new();
        let mut key = Vec::with_capacity(path.len() + 1);

        for segment in path {
            push_segment(&mut pattern, segment);
            key.push(match segment {
                Segment::Index(index) => *index,
                Segment::Key(_) => {
                    self.fields.iter().position(|f| *f == pattern).unwrap_or(usize::MAX - 1)
                },
            });
        }
        key.push(usize::MAX);
        key
    }
}

impl From<Violation> for ValidationFailure {
    fn from(violation: Violation) -> Self {
        Self {
            field_path: violation.path.iter().map(ToString::to_string).collect(),
            message: violation.message,
        }
    }
}

/// The capability the validation pipeline depends on.
///
/// Implementations evaluate a payload and return the collected failures;
/// an empty list means the payload passed. `Err` is reserved for faults in
/// the validator itself, which the pipeline reports as internal errors.
pub trait PayloadValidator: Send + Sync + fmt::Debug {
    /// Name used in logs and events.
    fn name(&self) -> &str;

    /// Validates `payload` in collect-all mode.
    ///
    /// # Errors
    ///
    /// Returns an error only when the validator cannot run at all.
    fn validate(&self, payload: Option<&Value>) -> Result<Vec<ValidationFailure>>;
}

impl PayloadValidator for Schema {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, payload: Option<&Value>) -> Result<Vec<ValidationFailure>> {
        Ok(Self::validate(self, payload).err().unwrap_or_default())
    }
}
