//! Best-effort extraction of flag and maintainer details from a payload.
//!
//! Runs on the failure path, where the payload is already suspect, so every
//! lookup degrades to "absent" instead of failing.

use serde_json::{Map, Value};

use crate::models::{FlagSummary, PayloadContext};

/// Key holding the flag definition under change.
const CURRENT_VERSION: &str = "currentVersion";

/// Key holding the maintainer inside `currentVersion`.
const MAINTAINER: &str = "_maintainer";

/// Internal hypermedia links on the maintainer; never echoed back.
const LINKS: &str = "_links";

/// Extracts the maintainer and flag summary from a payload.
///
/// Returns an empty context when the payload is absent or when
/// `currentVersion` is missing or not an object. The maintainer is a copy
/// with `_links` removed; the payload itself is left untouched.
pub fn extract_context(payload: Option<&Value>) -> PayloadContext {
    let Some(root) = payload.and_then(Value::as_object) else {
        return PayloadContext::empty();
    };
    let Some(current_version) = root.get(CURRENT_VERSION).and_then(Value::as_object) else {
        return PayloadContext::empty();
    };

    let maintainer = current_version.get(MAINTAINER).and_then(Value::as_object).map(strip_links);

    let flag = FlagSummary {
        name: current_version.get("name").cloned(),
        kind: current_version.get("kind").cloned(),
        key: current_version.get("key").cloned(),
        title: root.get("title").cloned(),
        title_verb: root.get("titleVerb").cloned(),
        creation_date: current_version.get("creationDate").cloned(),
    };

    PayloadContext { maintainer, flag: Some(flag) }
}

fn strip_links(maintainer: &Map<String, Value>) -> Map<String, Value> {
    maintainer
        .iter()
        .filter(|(key, _)| key.as_str() != LINKS)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn absent_payload_yields_empty_context() {
        assert!(extract_context(None).is_empty());
        assert!(extract_context(Some(&Value::Null)).is_empty());
    }

    #[test]
    fn payload_without_current_version_yields_empty_context() {
        assert!(extract_context(Some(&json!({}))).is_empty());
        assert!(extract_context(Some(&json!({"title": "t"}))).is_empty());
        assert!(extract_context(Some(&json!({"currentVersion": "ff_x"}))).is_empty());
        assert!(extract_context(Some(&json!([1, 2, 3]))).is_empty());
    }

    #[test]
    fn maintainer_links_are_stripped_from_copy() {
        let payload = json!({
            "currentVersion": {
                "name": "ff_checkout",
                "_maintainer": {
                    "email": "dev@example.com",
                    "_links": {"self": {"href": "/api/v2/members/1"}}
                }
            }
        });

        let context = extract_context(Some(&payload));
        let maintainer = context.maintainer.unwrap();

        assert_eq!(maintainer.get("email"), Some(&json!("dev@example.com")));
        assert!(!maintainer.contains_key("_links"));
        assert!(payload["currentVersion"]["_maintainer"].get("_links").is_some());
    }

    #[test]
    fn flag_summary_collects_nested_and_top_level_fields() {
        let payload = json!({
            "title": "Jane created the flag",
            "titleVerb": "created the flag",
            "currentVersion": {
                "name": "ff_checkout",
                "key": "ff_checkout",
                "kind": "boolean",
                "creationDate": 1_700_000_000_000_u64,
                "tags": ["payments"]
            }
        });

        let flag = extract_context(Some(&payload)).flag.unwrap();

        assert_eq!(flag.name, Some(json!("ff_checkout")));
        assert_eq!(flag.key, Some(json!("ff_checkout")));
        assert_eq!(flag.kind, Some(json!("boolean")));
        assert_eq!(flag.title, Some(json!("Jane created the flag")));
        assert_eq!(flag.title_verb, Some(json!("created the flag")));
        assert_eq!(flag.creation_date, Some(json!(1_700_000_000_000_u64)));
    }

    #[test]
    fn non_object_maintainer_is_omitted() {
        let payload = json!({"currentVersion": {"name": "ff_x", "_maintainer": "someone"}});

        let context = extract_context(Some(&payload));

        assert!(context.maintainer.is_none());
        assert!(context.flag.is_some());
    }

    proptest::proptest! {
        #[test]
        fn stripping_links_keeps_every_other_key(
            fields in proptest::collection::btree_map("[a-z_]{1,10}", "[a-z0-9]{0,8}", 0..8),
        ) {
            let mut maintainer: Map<String, Value> =
                fields.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
            maintainer.insert(LINKS.to_string(), json!({"self": {"href": "/x"}}));
            let payload = json!({"currentVersion": {"_maintainer": maintainer}});

            let stripped = extract_context(Some(&payload)).maintainer.unwrap();

            proptest::prop_assert!(!stripped.contains_key(LINKS));
            let expected = fields.keys().filter(|k| k.as_str() != LINKS).count();
            proptest::prop_assert_eq!(stripped.len(), expected);
        }
    }
}
