// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! Surepass client: aadhaar, PAN and face-liveness verification.
//!
//! Surepass expects a client ID header plus an HMAC-SHA256 signature of the
//! exact request body, hex-encoded, in `X-Signature`.

use std::time::Duration;

use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;

use super::{classify_response, required_field, ProviderError, VerificationOutcome, VerificationRequest};

const DEFAULT_BASE_URL: &str = "https://kyc-api.surepass.io";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct SurepassClient {
    base_url: String,
    client_id: String,
    signing_secret: String,
    http: reqwest::Client,
}

impl SurepassClient {
    pub fn from_env() -> Result<Self, ProviderError> {
        let base_url = env_or_default("SUREPASS_BASE_URL", DEFAULT_BASE_URL);
        let client_id = env_required("SUREPASS_CLIENT_ID")?;
        let signing_secret = env_required("SUREPASS_SIGNING_SECRET")?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            client_id,
            signing_secret,
            http,
        })
    }

    pub async fn verify_aadhaar(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationOutcome, ProviderError> {
        let aadhaar_number = required_field(&request.document_number, "document_number")?;
        let body = json!({ "id_number": aadhaar_number });
        let response = self.signed_post("/api/v1/aadhaar-validation", &body).await?;
        Ok(map_document_outcome(&response))
    }

    pub async fn verify_pan(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationOutcome, ProviderError> {
        let pan_number = required_field(&request.document_number, "document_number")?;
        let body = json!({ "id_number": pan_number });
        let response = self.signed_post("/api/v1/pan-comprehensive", &body).await?;
        Ok(map_document_outcome(&response))
    }

    pub async fn verify_face(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationOutcome, ProviderError> {
        let image = required_field(&request.face_image_base64, "face_image_base64")?;
        let body = json!({ "image": image });
        let response = self.signed_post("/api/v1/face-liveness", &body).await?;
        Ok(map_face_outcome(&response))
    }

    async fn signed_post(&self, path: &str, payload: &Value) -> Result<Value, ProviderError> {
        let body = serde_json::to_string(payload)
            .map_err(|e| ProviderError::Request(format!("serialize body failed: {e}")))?;
        let signature = sign_body(&self.signing_secret, &body);

        let response = self
            .http
            .post(format!("{}{}", self.base_url.trim_end_matches('/'), path))
            .header("X-Client-Id", &self.client_id)
            .header("X-Signature", signature)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ProviderError::Request(format!("POST {path} failed: {e}")))?;

        classify_response("surepass", path, response).await
    }
}

/// Hex HMAC-SHA256 over the exact serialized body.
fn sign_body(secret: &str, body: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Aadhaar/PAN responses: `{"success": bool, "data": {"client_id", "full_name", "status"}}`.
/// A well-formed negative verdict maps to `verified = false`, not an error.
fn map_document_outcome(response: &Value) -> VerificationOutcome {
    let success = response
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let status_valid = response
        .pointer("/data/status")
        .and_then(Value::as_str)
        .map(|status| status.eq_ignore_ascii_case("valid"))
        .unwrap_or(false);
    let verified = success && status_valid;

    VerificationOutcome {
        verified,
        name: response
            .pointer("/data/full_name")
            .and_then(Value::as_str)
            .map(str::to_string),
        reference_id: extract_reference(response),
        raw: response.clone(),
    }
}

/// Face-liveness responses: `{"success": bool, "data": {"client_id", "live": bool, "confidence"}}`.
fn map_face_outcome(response: &Value) -> VerificationOutcome {
    let success = response
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let live = response
        .pointer("/data/live")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    VerificationOutcome {
        verified: success && live,
        name: None,
        reference_id: extract_reference(response),
        raw: response.clone(),
    }
}

fn extract_reference(response: &Value) -> String {
    response
        .pointer("/data/client_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("sp_{}", uuid::Uuid::new_v4().simple()))
}

fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_required(name: &str) -> Result<String, ProviderError> {
    env_optional(name).ok_or_else(|| ProviderError::MissingConfig(name.to_string()))
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_stable_hex_hmac() {
        let first = sign_body("secret", r#"{"id_number":"ABCDE1234F"}"#);
        let second = sign_body("secret", r#"{"id_number":"ABCDE1234F"}"#);
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));

        let different = sign_body("other-secret", r#"{"id_number":"ABCDE1234F"}"#);
        assert_ne!(first, different);
    }

    #[test]
    fn document_outcome_maps_valid_response() {
        let response = json!({
            "success": true,
            "data": {
                "client_id": "aadhaar_123",
                "full_name": "RAVI KUMAR",
                "status": "valid"
            }
        });
        let outcome = map_document_outcome(&response);
        assert!(outcome.verified);
        assert_eq!(outcome.name.as_deref(), Some("RAVI KUMAR"));
        assert_eq!(outcome.reference_id, "aadhaar_123");
    }

    #[test]
    fn document_outcome_treats_negative_verdict_as_unverified() {
        let response = json!({
            "success": true,
            "data": { "client_id": "pan_9", "status": "invalid" }
        });
        let outcome = map_document_outcome(&response);
        assert!(!outcome.verified);
    }

    #[test]
    fn face_outcome_requires_liveness_flag() {
        let live = json!({ "success": true, "data": { "client_id": "f1", "live": true } });
        assert!(map_face_outcome(&live).verified);

        let spoof = json!({ "success": true, "data": { "client_id": "f2", "live": false } });
        assert!(!map_face_outcome(&spoof).verified);
    }

    #[test]
    fn missing_reference_generates_one() {
        let outcome = map_document_outcome(&json!({ "success": false }));
        assert!(outcome.reference_id.starts_with("sp_"));
    }
}
