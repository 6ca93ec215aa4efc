//! Webhook signature verification.
//!
//! The tracker signs each delivery with HMAC-SHA256 over the raw body using
//! the webhook secret, hex-encoded in the `X-Signature` header.

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-signature";

type HmacSha256 = Hmac<Sha256>;

/// Returns the hex signature of `body`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Checks `signature` against `body` in constant time. Empty or non-hex
/// signatures never verify.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    if expected.is_empty() {
        return false;
    }
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_then_verify() {
        let body = br#"{"event":"taskCreated"}"#;
        let signature = sign("secret", body);
        assert_eq!(signature.len(), 64);
        assert!(verify_signature("secret", body, &signature));
        assert!(verify_signature("secret", body, &signature.to_uppercase()));
    }

    #[test]
    fn test_rejects_wrong_secret_or_body() {
        let body = b"payload";
        let signature = sign("secret", body);
        assert!(!verify_signature("other", body, &signature));
        assert!(!verify_signature("secret", b"payload2", &signature));
    }

    #[test]
    fn test_rejects_empty_and_garbage() {
        assert!(!verify_signature("secret", b"x", ""));
        assert!(!verify_signature("secret", b"x", "not-hex"));
    }
}
