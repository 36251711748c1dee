//! Request model handed to the validation pipeline.

use axum::http::{HeaderMap, HeaderName};
use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::debug;

/// An inbound webhook call.
///
/// `raw_body` holds the exact bytes received and is the only input to
/// signature verification. `body` is the parsed payload used by the
/// schemas. An empty or whitespace-only body parses as `{}`; a body that
/// is not valid JSON parses as `None`.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    headers: HeaderMap,
    raw_body: Bytes,
    body: Option<Value>,
}

/// Outcome of reading a header as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderText<'a> {
    /// The header is absent.
    Missing,
    /// The header holds visible ASCII.
    Present(&'a str),
    /// The header holds bytes that are not visible ASCII.
    Opaque,
}

impl WebhookRequest {
    /// Builds a request, parsing the body as JSON.
    pub fn new(headers: HeaderMap, raw_body: Bytes) -> Self {
        let body = if raw_body.iter().all(u8::is_ascii_whitespace) {
            Some(Value::Object(Map::new()))
        } else {
            match serde_json::from_slice(&raw_body) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!(error = %e, body_len = raw_body.len(), "Request body is not valid JSON");
                    None
                },
            }
        };

        Self { headers, raw_body, body }
    }

    /// The request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The body exactly as received.
    pub fn raw_body(&self) -> &[u8] {
        &self.raw_body
    }

    /// The parsed payload, if the body was JSON.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Consumes the request, returning the parsed payload.
    pub fn into_body(self) -> Option<Value> {
        self.body
    }

    /// Reads a header as text.
    pub fn header_text(&self, name: &HeaderName) -> HeaderText<'_> {
        match self.headers.get(name) {
            None => HeaderText::Missing,
            Some(value) => value.to_str().map_or(HeaderText::Opaque, HeaderText::Present),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use serde_json::json;

    use super::*;

    #[test]
    fn json_body_is_parsed_and_raw_bytes_kept() {
        let raw = Bytes::from_static(br#"{"b": 1,   "a": 2}"#);
        let request = WebhookRequest::new(HeaderMap::new(), raw.clone());

        assert_eq!(request.body(), Some(&json!({"a": 2, "b": 1})));
        assert_eq!(request.raw_body(), raw.as_ref());
    }

    #[test]
    fn empty_body_parses_as_empty_object() {
        let empty = WebhookRequest::new(HeaderMap::new(), Bytes::new());
        assert_eq!(empty.body(), Some(&json!({})));
        assert!(empty.raw_body().is_empty());

        let blank = WebhookRequest::new(HeaderMap::new(), Bytes::from_static(b" \n"));
        assert_eq!(blank.body(), Some(&json!({})));
    }

    #[test]
    fn invalid_body_parses_to_none() {
        assert!(WebhookRequest::new(HeaderMap::new(), Bytes::from_static(b"{nope")).body().is_none());
    }

    #[test]
    fn header_text_distinguishes_missing_and_opaque() {
        let name = HeaderName::from_static("x-ld-signature");
        let mut headers = HeaderMap::new();

        let request = WebhookRequest::new(headers.clone(), Bytes::new());
        assert_eq!(request.header_text(&name), HeaderText::Missing);

        headers.insert(name.clone(), HeaderValue::from_static("abcd"));
        let request = WebhookRequest::new(headers.clone(), Bytes::new());
        assert_eq!(request.header_text(&name), HeaderText::Present("abcd"));

        headers.insert(name.clone(), HeaderValue::from_bytes(&[0xfa, 0xfb]).unwrap());
        let request = WebhookRequest::new(headers, Bytes::new());
        assert_eq!(request.header_text(&name), HeaderText::Opaque);
    }
}
