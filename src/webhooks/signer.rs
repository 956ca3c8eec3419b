// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! HMAC-SHA256 webhook signatures.
//!
//! The signature covers the exact bytes sent on the wire, which are the
//! canonical `serde_json` serialization of the payload. Partners verify by
//! recomputing the HMAC over the received body with their shared secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex HMAC-SHA256 of `body` under `secret`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time verification of a received signature.
pub fn verify(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let body = br#"{"event":"deposit.detected","transaction_id":"txn_1"}"#;
        let signature = sign("whsec_test", body);
        assert!(verify("whsec_test", body, &signature));
    }

    #[test]
    fn any_body_mutation_invalidates_the_signature() {
        let body = br#"{"event":"payout.settled","utr":"UTR20260826000000000001"}"#;
        let signature = sign("whsec_test", body);

        let mut tampered = body.to_vec();
        tampered[10] ^= 1;
        assert!(!verify("whsec_test", &tampered, &signature));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let body = b"{}";
        let signature = sign("whsec_a", body);
        assert!(!verify("whsec_b", body, &signature));
    }

    #[test]
    fn malformed_hex_is_rejected_not_panicked() {
        assert!(!verify("whsec_test", b"{}", "not-hex!"));
    }

    #[test]
    fn signature_is_lowercase_hex_of_sha256_width() {
        let signature = sign("whsec_test", b"{}");
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
