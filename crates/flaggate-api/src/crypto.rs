//! Cryptographic utilities for webhook signature verification.
//!
//! Webhook senders sign the raw request body with HMAC-SHA256 using the
//! shared secret and send the hex digest in a configurable header. This
//! module recomputes that digest over the exact bytes received and compares
//! it in constant time.

use flaggate_core::GateError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Length of an HMAC-SHA256 digest in bytes.
pub const SIGNATURE_LEN: usize = 32;

/// Signature verification failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The signature header is absent.
    #[error("signature header missing")]
    MissingSignature,
    /// The signature is not hex or decodes to the wrong length.
    #[error("malformed signature")]
    MalformedSignature,
    /// The signature does not match the payload.
    #[error("signature mismatch")]
    InvalidSignature,
    /// The secret could not be used as an HMAC key.
    #[error("invalid secret key")]
    InvalidSecret,
}

impl SignatureError {
    /// Converts into the gate error taxonomy, naming the header involved.
    pub fn into_gate_error(self, header: &str) -> GateError {
        match self {
            Self::MissingSignature => GateError::MissingSignatureHeader { header: header.to_string() },
            Self::MalformedSignature => GateError::MalformedSignature,
            Self::InvalidSignature => GateError::InvalidSignature,
            Self::InvalidSecret => GateError::Internal(self.to_string()),
        }
    }
}

/// Generates the HMAC-SHA256 signature of `payload` as lowercase hex.
///
/// # Errors
///
/// Returns `SignatureError::InvalidSecret` if the secret is rejected as a key.
///
/// # Example
///
/// ```
/// use flaggate_api::crypto::compute_signature;
///
/// let signature = compute_signature(b"{}", "secret").unwrap();
/// assert_eq!(signature.len(), 64);
/// ```
pub fn compute_signature(payload: &[u8], secret: &str) -> Result<String, SignatureError> {
    digest(payload, secret).map(hex::encode)
}

fn digest(payload: &[u8], secret: &str) -> Result<[u8; SIGNATURE_LEN], SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(payload);

    let mut out = [0u8; SIGNATURE_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Verifies a webhook signature over the raw request body.
///
/// `provided` is the raw header value, if the header was present. Accepts
/// the bare hex digest or the `sha256=<hex>` form; surrounding whitespace
/// and hex case are ignored.
///
/// # Errors
///
/// - `MissingSignature` if `provided` is `None`.
/// - `MalformedSignature` if the value is not hex or is not a 32-byte
///   digest. Checked before any comparison takes place.
/// - `InvalidSignature` if the digest does not match. The comparison
///   inspects every byte regardless of where a mismatch occurs.
pub fn verify_signature(
    payload: &[u8],
    provided: Option<&str>,
    secret: &str,
) -> Result<(), SignatureError> {
    let provided = provided.ok_or(SignatureError::MissingSignature)?;
    let provided = decode_signature(provided)?;

    let expected = digest(payload, secret)?;

    if bool::from(expected.ct_eq(&provided)) {
        Ok(())
    } else {
        Err(SignatureError::InvalidSignature)
    }
}

/// Strips the optional prefix and decodes the hex digest.
fn decode_signature(signature: &str) -> Result<[u8; SIGNATURE_LEN], SignatureError> {
    let trimmed = signature.trim();
    let hex_digest = trimmed.strip_prefix("sha256=").unwrap_or(trimmed);

    let bytes = hex::decode(hex_digest).map_err(|_| SignatureError::MalformedSignature)?;
    <[u8; SIGNATURE_LEN]>::try_from(bytes.as_slice()).map_err(|_| SignatureError::MalformedSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_signature_success() {
        let payload = b"test payload";
        let secret = "test_secret";
        let signature = compute_signature(payload, secret).unwrap();

        assert_eq!(verify_signature(payload, Some(&signature), secret), Ok(()));
    }

    #[test]
    fn verify_signature_accepts_prefix_case_and_whitespace() {
        let payload = b"test payload";
        let secret = "test_secret";
        let signature = compute_signature(payload, secret).unwrap();

        let prefixed = format!("sha256={signature}");
        let upper = signature.to_uppercase();
        let padded = format!("  {signature}\t");

        assert_eq!(verify_signature(payload, Some(&prefixed), secret), Ok(()));
        assert_eq!(verify_signature(payload, Some(&upper), secret), Ok(()));
        assert_eq!(verify_signature(payload, Some(&padded), secret), Ok(()));
    }

    #[test]
    fn verify_signature_missing() {
        assert_eq!(verify_signature(b"x", None, "s"), Err(SignatureError::MissingSignature));
    }

    #[test]
    fn verify_signature_rejects_other_payload() {
        let secret = "test_secret";
        let signature = compute_signature(b"original", secret).unwrap();

        assert_eq!(
            verify_signature(b"tampered", Some(&signature), secret),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn verify_signature_rejects_other_secret() {
        let signature = compute_signature(b"payload", "right").unwrap();

        assert_eq!(
            verify_signature(b"payload", Some(&signature), "wrong"),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn odd_length_hex_is_malformed() {
        assert_eq!(verify_signature(b"x", Some("abc"), "s"), Err(SignatureError::MalformedSignature));
    }

    #[test]
    fn non_hex_is_malformed() {
        let signature = "z".repeat(64);
        assert_eq!(
            verify_signature(b"x", Some(&signature), "s"),
            Err(SignatureError::MalformedSignature)
        );
    }

    #[test]
    fn wrong_digest_length_is_malformed() {
        let short = "ab".repeat(16);
        let long = "ab".repeat(33);

        assert_eq!(verify_signature(b"x", Some(&short), "s"), Err(SignatureError::MalformedSignature));
        assert_eq!(verify_signature(b"x", Some(&long), "s"), Err(SignatureError::MalformedSignature));
    }

    #[test]
    fn empty_value_is_malformed_not_missing() {
        assert_eq!(verify_signature(b"x", Some(""), "s"), Err(SignatureError::MalformedSignature));
    }

    #[test]
    fn compute_signature_is_consistent() {
        let first = compute_signature(b"payload", "secret").unwrap();
        let second = compute_signature(b"payload", "secret").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn compute_signature_matches_known_vector() {
        // RFC 4231 test case 2
        let signature = compute_signature(b"what do ya want for nothing?", "Jefe").unwrap();
        assert_eq!(signature, "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843");
    }

    #[test]
    fn errors_map_onto_gate_taxonomy() {
        let missing = SignatureError::MissingSignature.into_gate_error("X-LD-Signature");
        assert_eq!(missing.code(), "E1001");
        assert_eq!(SignatureError::MalformedSignature.into_gate_error("h").code(), "E1002");
        assert_eq!(SignatureError::InvalidSignature.into_gate_error("h").code(), "E1003");
    }
}
