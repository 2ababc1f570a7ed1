//! HMAC-SHA256 signature schemes used by the payment gateway.
//!
//! Two schemes, two secrets:
//! - **Order signature** (checkout success callback): `HMAC(key_secret, "{order_id}|{payment_id}")`
//! - **Webhook signature** (server-to-server): `HMAC(webhook_secret, raw_body)`
//!
//! Both are lowercase hex and compared in constant time. A missing secret or
//! a missing signature is a rejection, never a pass.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Why a signature was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signing secret is not configured")]
    MissingSecret,

    #[error("signature is missing")]
    MissingSignature,

    #[error("signature does not match")]
    Mismatch,
}

/// Holds the gateway secrets. Built once at startup and shared by reference.
#[derive(Clone)]
pub struct SignatureVerifier {
    key_secret: Option<String>,
    webhook_secret: Option<String>,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("key_secret", &self.key_secret.as_ref().map(|_| "<redacted>"))
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl SignatureVerifier {
    /// Empty strings count as "not configured".
    pub fn new(key_secret: impl Into<String>, webhook_secret: Option<String>) -> Self {
        Self {
            key_secret: non_empty(key_secret.into()),
            webhook_secret: webhook_secret.and_then(non_empty),
        }
    }

    pub fn has_webhook_secret(&self) -> bool {
        self.webhook_secret.is_some()
    }

    /// Checks the signature the checkout modal hands back to the browser.
    pub fn verify_order_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), SignatureError> {
        let secret = self
            .key_secret
            .as_deref()
            .ok_or(SignatureError::MissingSecret)?;
        if signature.is_empty() {
            return Err(SignatureError::MissingSignature);
        }

        let expected = order_signature(secret, order_id, payment_id);
        check(&expected, signature)
    }

    /// Checks a webhook delivery against the literal bytes received.
    pub fn verify_webhook_signature(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<(), SignatureError> {
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or(SignatureError::MissingSecret)?;
        let signature = signature
            .filter(|s| !s.is_empty())
            .ok_or(SignatureError::MissingSignature)?;

        let expected = sign(secret, body);
        check(&expected, signature)
    }
}

/// Hex-encoded HMAC-SHA256 of `message` under `secret`.
pub fn sign(secret: &str, message: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Signature the gateway produces for a completed checkout.
pub fn order_signature(secret: &str, order_id: &str, payment_id: &str) -> String {
    sign(secret, format!("{order_id}|{payment_id}").as_bytes())
}

fn check(expected: &str, provided: &str) -> Result<(), SignatureError> {
    // Slices of different length compare unequal
    if bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new("key_secret", Some("webhook_secret".to_string()))
    }

    #[test]
    fn test_order_signature_accepts_gateway_signature() {
        let signature = order_signature("key_secret", "order_123", "pay_456");

        assert_eq!(
            verifier().verify_order_signature("order_123", "pay_456", &signature),
            Ok(())
        );
    }

    #[test]
    fn test_order_signature_rejects_every_single_character_mutation() {
        let signature = order_signature("key_secret", "order_123", "pay_456");

        for position in 0..signature.len() {
            let mut mutated = signature.clone().into_bytes();
            mutated[position] = if mutated[position] == b'0' { b'1' } else { b'0' };
            let mutated = String::from_utf8(mutated).unwrap();

            assert_eq!(
                verifier().verify_order_signature("order_123", "pay_456", &mutated),
                Err(SignatureError::Mismatch),
                "mutation at {position} was accepted"
            );
        }
    }

    #[test]
    fn test_order_signature_binds_both_ids() {
        let signature = order_signature("key_secret", "order_123", "pay_456");

        assert!(
            verifier()
                .verify_order_signature("order_999", "pay_456", &signature)
                .is_err()
        );
        assert!(
            verifier()
                .verify_order_signature("order_123", "pay_999", &signature)
                .is_err()
        );
    }

    #[test]
    fn test_order_signature_uses_key_secret_not_webhook_secret() {
        let signature = order_signature("webhook_secret", "order_123", "pay_456");

        assert_eq!(
            verifier().verify_order_signature("order_123", "pay_456", &signature),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_truncated_signature_is_rejected() {
        let signature = order_signature("key_secret", "order_123", "pay_456");

        assert_eq!(
            verifier().verify_order_signature("order_123", "pay_456", &signature[..63]),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_webhook_signature_covers_raw_bytes() {
        let compact = br#"{"event":"payment.captured","payload":{}}"#;
        let spaced = br#"{ "event": "payment.captured", "payload": {} }"#;
        let reordered = br#"{"payload":{},"event":"payment.captured"}"#;
        let signature = sign("webhook_secret", compact);

        assert_eq!(
            verifier().verify_webhook_signature(compact, Some(&signature)),
            Ok(())
        );
        assert_eq!(
            verifier().verify_webhook_signature(spaced, Some(&signature)),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verifier().verify_webhook_signature(reordered, Some(&signature)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_missing_material_fails_closed() {
        let body = b"{}";
        let signature = sign("webhook_secret", body);
        let unconfigured = SignatureVerifier::new("", None);

        assert_eq!(
            verifier().verify_webhook_signature(body, None),
            Err(SignatureError::MissingSignature)
        );
        assert_eq!(
            verifier().verify_webhook_signature(body, Some("")),
            Err(SignatureError::MissingSignature)
        );
        assert_eq!(
            unconfigured.verify_webhook_signature(body, Some(&signature)),
            Err(SignatureError::MissingSecret)
        );
        assert_eq!(
            unconfigured.verify_order_signature("order_1", "pay_1", "abc"),
            Err(SignatureError::MissingSecret)
        );
        assert_eq!(
            verifier().verify_order_signature("order_1", "pay_1", ""),
            Err(SignatureError::MissingSignature)
        );
    }

    #[test]
    fn test_empty_webhook_secret_counts_as_missing() {
        let verifier = SignatureVerifier::new("key_secret", Some(String::new()));

        assert!(!verifier.has_webhook_secret());
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let verifier = SignatureVerifier::new("s3cr3t-key", Some("s3cr3t-hook".to_string()));
        let rendered = format!("{verifier:?}");

        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("<redacted>"));
    }
}
