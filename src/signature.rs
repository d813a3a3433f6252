//! Payment callback signature verification.
//!
//! The gateway signs successful checkouts with HMAC-SHA256 over
//! `orderId|paymentId` using the account's key secret. We recompute the MAC
//! and compare constant-time against the hex signature from the callback.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub struct SignatureVerifier {
    secret: Option<String>,
}

impl SignatureVerifier {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Verify a callback signature.
    ///
    /// Fails closed: with no secret configured every signature is rejected.
    pub fn verify(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let Some(secret) = &self.secret else {
            tracing::warn!("No signing secret configured; rejecting payment signature");
            return false;
        };

        let Ok(provided) = hex::decode(signature) else {
            return false;
        };

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        let expected = mac.finalize().into_bytes();

        expected.as_slice().ct_eq(provided.as_slice()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(order_id: &str, payment_id: &str, secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_correct_signature_verifies() {
        let verifier = SignatureVerifier::new(Some("secret".to_string()));
        let sig = sign("order_abc", "pay_xyz", "secret");
        assert!(verifier.verify("order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn test_mutated_signature_fails() {
        let verifier = SignatureVerifier::new(Some("secret".to_string()));
        let sig = sign("order_abc", "pay_xyz", "secret");

        // Flip each nibble in turn; no mutation may verify
        for i in 0..sig.len() {
            let mut bytes = sig.clone().into_bytes();
            bytes[i] = if bytes[i] == b'0' { b'1' } else { b'0' };
            let mutated = String::from_utf8(bytes).unwrap();
            if mutated == sig {
                continue;
            }
            assert!(
                !verifier.verify("order_abc", "pay_xyz", &mutated),
                "mutated signature at position {} verified",
                i
            );
        }
    }

    #[test]
    fn test_wrong_payload_fails() {
        let verifier = SignatureVerifier::new(Some("secret".to_string()));
        let sig = sign("order_abc", "pay_xyz", "secret");
        assert!(!verifier.verify("order_abc", "pay_other", &sig));
        assert!(!verifier.verify("order_other", "pay_xyz", &sig));
    }

    #[test]
    fn test_unconfigured_secret_fails_closed() {
        let verifier = SignatureVerifier::new(None);
        let sig = sign("order_abc", "pay_xyz", "secret");
        assert!(!verifier.verify("order_abc", "pay_xyz", &sig));
        assert!(!verifier.is_configured());

        // An empty secret counts as unconfigured too
        let verifier = SignatureVerifier::new(Some(String::new()));
        assert!(!verifier.verify("order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn test_non_hex_signature_fails() {
        let verifier = SignatureVerifier::new(Some("secret".to_string()));
        assert!(!verifier.verify("order_abc", "pay_xyz", "not-hex!"));
        assert!(!verifier.verify("order_abc", "pay_xyz", ""));
    }
}
