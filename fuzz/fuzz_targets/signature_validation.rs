#![no_main]

//! Fuzz target for webhook signature verification.
//!
//! Feeds arbitrary payloads, secrets and header values through the verifier
//! to ensure it never panics and only accepts the exact digest.

use flaggate_api::crypto::{compute_signature, verify_signature, SignatureError};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    fuzz_signature_validation(data);
});

fn fuzz_signature_validation(data: &[u8]) {
    let split = data.first().map_or(0, |&b| usize::from(b)).min(data.len());
    let (head, payload) = data.split_at(split);
    let secret = String::from_utf8_lossy(head);
    let secret = if secret.is_empty() { "fuzz-secret".into() } else { secret };

    // Arbitrary bytes as the header value.
    let provided = String::from_utf8_lossy(payload);
    let result = verify_signature(payload, Some(&provided), &secret);
    assert_ne!(result, Err(SignatureError::MissingSignature));

    let Ok(signature) = compute_signature(payload, &secret) else {
        return;
    };

    assert_eq!(verify_signature(payload, Some(&signature), &secret), Ok(()));
    assert_eq!(
        verify_signature(payload, Some(&format!("sha256={signature}")), &secret),
        Ok(())
    );

    // Flipping any nibble must fail.
    if let Some(first) = signature.chars().next() {
        let flipped = if first == '0' { '1' } else { '0' };
        let tampered = format!("{flipped}{}", &signature[1..]);
        assert_eq!(
            verify_signature(payload, Some(&tampered), &secret),
            Err(SignatureError::InvalidSignature)
        );
    }

    assert_eq!(verify_signature(payload, None, &secret), Err(SignatureError::MissingSignature));
}
