//! Webhook authenticity and envelope parsing.
//!
//! Every delivery is authenticated with an HMAC-SHA256 over the exact raw
//! body before any event is parsed; unverified payloads never reach the
//! processors.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::error::{CustodyError, CustodyResult};
use super::types::WebhookEnvelope;

/// Header carrying the hex-encoded HMAC of the request body
pub const SIGNATURE_HEADER: &str = "x-custody-signature";

type HmacSha256 = Hmac<Sha256>;

/// Verify the HMAC-SHA256 signature over the raw request body.
pub fn verify_signature(payload: &[u8], secret: &str, signature: &str) -> bool {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(v) => v,
        Err(_) => return false,
    };
    mac.update(payload);
    let computed = hex::encode(mac.finalize().into_bytes());
    secure_eq(computed.as_bytes(), signature.trim().as_bytes())
}

/// Constant-time byte comparison
fn secure_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0_u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Parse a verified webhook body into its envelope.
pub fn parse_envelope(payload: &[u8]) -> CustodyResult<WebhookEnvelope> {
    serde_json::from_slice(payload).map_err(|e| CustodyError::InvalidResponse {
        message: format!("malformed webhook envelope: {}", e),
    })
}

/// Compute the signature for a body, used by tests and local tooling.
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_signature_round_trip() {
        let payload = br#"{"id":"evt_1","kind":"wallet.transfer.confirmed"}"#;
        let signature = sign_payload(payload, "whsec_test");
        assert!(verify_signature(payload, "whsec_test", &signature));
    }

    #[test]
    fn test_invalid_signature_rejected() {
        let payload = br#"{"id":"evt_1"}"#;
        assert!(!verify_signature(payload, "whsec_test", "deadbeef"));

        let signature = sign_payload(payload, "whsec_test");
        assert!(!verify_signature(payload, "other_secret", &signature));
        assert!(!verify_signature(b"tampered", "whsec_test", &signature));
    }

    #[test]
    fn test_signature_whitespace_tolerated() {
        let payload = b"body";
        let signature = sign_payload(payload, "s");
        assert!(verify_signature(payload, "s", &format!(" {signature}\n")));
    }

    #[test]
    fn test_secure_eq() {
        assert!(secure_eq(b"abc", b"abc"));
        assert!(!secure_eq(b"abc", b"abd"));
        assert!(!secure_eq(b"abc", b"ab"));
    }
}
