//! Test data builders and fixtures for flag-change webhooks.
//!
//! Provides a builder for the webhook payload with a valid default and
//! factory functions for the common rejection scenarios.

use serde_json::{json, Map, Value};

/// Builder for flag-change webhook payloads.
///
/// `with_defaults` produces a payload that passes every schema; individual
/// setters then break one thing at a time.
#[derive(Debug, Clone, Default)]
pub struct FlagPayloadBuilder {
    root: Map<String, Value>,
    current_version: Option<Map<String, Value>>,
}

impl FlagPayloadBuilder {
    /// Creates a builder with an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for a payload that passes validation.
    pub fn with_defaults() -> Self {
        Self::new()
            .access("createFlag", "proj/default:env/production:flag/ff_new_checkout")
            .title("Jane Doe")
            .title_verb("created the flag")
            .name("ff_new_checkout")
            .key("ff_new_checkout")
            .kind("boolean")
            .description("Gates the new checkout flow")
            .tags(["checkout", "team-payments"])
            .field("creationDate", json!(1_700_000_000_000_i64))
            .maintainer(json!({
                "_id": "569f183514f4432160000007",
                "email": "jane@example.com",
                "firstName": "Jane",
                "lastName": "Doe",
                "_links": {"self": {"href": "/api/v2/members/569f183514f4432160000007"}}
            }))
    }

    fn version(&mut self) -> &mut Map<String, Value> {
        self.current_version.get_or_insert_with(Map::new)
    }

    /// Sets `currentVersion.name`.
    #[must_use]
    pub fn name(self, name: impl Into<String>) -> Self {
        self.field("name", Value::String(name.into()))
    }

    /// Sets `currentVersion.key`.
    #[must_use]
    pub fn key(self, key: impl Into<String>) -> Self {
        self.field("key", Value::String(key.into()))
    }

    /// Sets `currentVersion.kind`.
    #[must_use]
    pub fn kind(self, kind: impl Into<String>) -> Self {
        self.field("kind", Value::String(kind.into()))
    }

    /// Sets `currentVersion.description`.
    #[must_use]
    pub fn description(self, description: impl Into<String>) -> Self {
        self.field("description", Value::String(description.into()))
    }

    /// Sets `currentVersion.tags`.
    #[must_use]
    pub fn tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags = tags.into_iter().map(|tag| Value::String(tag.into())).collect();
        self.field("tags", Value::Array(tags))
    }

    /// Sets `currentVersion._maintainer`.
    #[must_use]
    pub fn maintainer(self, maintainer: Value) -> Self {
        self.field("_maintainer", maintainer)
    }

    /// Sets any `currentVersion` field to an arbitrary value.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.version().insert(name.into(), value);
        self
    }

    /// Removes a `currentVersion` field.
    #[must_use]
    pub fn without(mut self, name: &str) -> Self {
        self.version().remove(name);
        self
    }

    /// Drops `currentVersion` entirely.
    #[must_use]
    pub fn without_current_version(mut self) -> Self {
        self.current_version = None;
        self
    }

    /// Appends an entry to `accesses`.
    #[must_use]
    pub fn access(mut self, action: impl Into<String>, resource: impl Into<String>) -> Self {
        let entry = json!({"action": action.into(), "resource": resource.into()});
        match self.root.get_mut("accesses") {
            Some(Value::Array(accesses)) => accesses.push(entry),
            _ => {
                self.root.insert("accesses".to_string(), Value::Array(vec![entry]));
            },
        }
        self
    }

    /// Sets any top-level field to an arbitrary value.
    #[must_use]
    pub fn top_level(mut self, name: impl Into<String>, value: Value) -> Self {
        self.root.insert(name.into(), value);
        self
    }

    /// Removes a top-level field.
    #[must_use]
    pub fn without_top_level(mut self, name: &str) -> Self {
        self.root.remove(name);
        self
    }

    /// Sets the top-level `title`.
    #[must_use]
    pub fn title(self, title: impl Into<String>) -> Self {
        self.top_level("title", Value::String(title.into()))
    }

    /// Sets the top-level `titleVerb`.
    #[must_use]
    pub fn title_verb(self, verb: impl Into<String>) -> Self {
        self.top_level("titleVerb", Value::String(verb.into()))
    }

    /// Builds the payload.
    pub fn build(self) -> Value {
        let mut root = self.root;
        if let Some(version) = self.current_version {
            root.insert("currentVersion".to_string(), Value::Object(version));
        }
        Value::Object(root)
    }

    /// Builds the payload as the bytes a sender would put on the wire.
    pub fn build_bytes(self) -> Vec<u8> {
        self.build().to_string().into_bytes()
    }
}

/// Factory functions for common test scenarios.
pub mod scenarios {
    use serde_json::Value;

    use super::FlagPayloadBuilder;

    /// A payload that passes every schema.
    pub fn valid_flag() -> Value {
        FlagPayloadBuilder::with_defaults().build()
    }

    /// A flag whose name lacks the required prefix.
    pub fn unprefixed_name() -> Value {
        FlagPayloadBuilder::with_defaults().name("myflag").build()
    }

    /// A flag with no tags.
    pub fn empty_tags() -> Value {
        FlagPayloadBuilder::with_defaults().tags(Vec::<String>::new()).build()
    }

    /// A payload without the access list.
    pub fn missing_accesses() -> Value {
        FlagPayloadBuilder::with_defaults().without_top_level("accesses").build()
    }

    /// A flag breaking several rules at once.
    pub fn many_violations() -> Value {
        FlagPayloadBuilder::with_defaults()
            .name("checkout")
            .key("checkout")
            .kind("toggle")
            .tags(["ok!"])
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_include_every_section() {
        let payload = scenarios::valid_flag();

        assert_eq!(payload["accesses"][0]["action"], "createFlag");
        assert_eq!(payload["currentVersion"]["name"], "ff_new_checkout");
        assert_eq!(payload["currentVersion"]["tags"], json!(["checkout", "team-payments"]));
        assert!(payload["currentVersion"]["_maintainer"]["_links"].is_object());
        assert_eq!(payload["title"], "Jane Doe");
    }

    #[test]
    fn setters_override_and_remove() {
        let payload = FlagPayloadBuilder::with_defaults()
            .without("kind")
            .access("createFlag", "second")
            .build();

        assert!(payload["currentVersion"].get("kind").is_none());
        assert_eq!(payload["accesses"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn bare_builder_produces_empty_object() {
        assert_eq!(FlagPayloadBuilder::new().build(), json!({}));
        assert_eq!(
            FlagPayloadBuilder::with_defaults().without_current_version().build().get("currentVersion"),
            None
        );
    }
}
