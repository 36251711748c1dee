#![no_main]

//! Fuzz target for payload validation and error formatting.
//!
//! Runs arbitrary bodies through the full pipeline with a valid signature so
//! every body reaches the schema stages and the context extractor.

use std::sync::OnceLock;

use axum::{
    body::Bytes,
    http::{HeaderMap, HeaderValue, StatusCode},
};
use flaggate_api::{
    crypto::compute_signature, GateSettings, ValidationPipeline, Verdict, WebhookRequest,
};
use libfuzzer_sys::fuzz_target;

const SECRET: &str = "fuzz-secret";
const HEADER: &str = "x-ld-signature";

fn pipeline() -> &'static ValidationPipeline {
    static PIPELINE: OnceLock<ValidationPipeline> = OnceLock::new();
    PIPELINE.get_or_init(|| {
        ValidationPipeline::flag_gate(&GateSettings::new(SECRET, HEADER))
            .expect("flag gate builds")
    })
}

fuzz_target!(|data: &[u8]| {
    let Ok(signature) = compute_signature(data, SECRET) else {
        return;
    };
    let Ok(value) = HeaderValue::from_str(&signature) else {
        return;
    };

    let mut headers = HeaderMap::new();
    headers.insert(HEADER, value);
    let request = WebhookRequest::new(headers, Bytes::copy_from_slice(data));

    match pipeline().run(&request) {
        Verdict::Accepted => {},
        Verdict::Rejected { status, response, .. } => {
            assert_ne!(status, StatusCode::UNAUTHORIZED);
            assert_ne!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(!response.errors.is_empty());
            if let Some(maintainer) = &response.maintainer {
                assert!(!maintainer.contains_key("_links"));
            }
            let _ = serde_json::to_vec(&response);
        },
    }
});
