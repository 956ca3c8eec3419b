// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! Cashfree client: UPI VPA and bank-account verification.
//!
//! Cashfree issues short-lived bearer tokens from an authorize endpoint;
//! every verification call carries `Authorization: Bearer <token>`.

use std::time::Duration;

use serde_json::{json, Value};

use super::{classify_response, required_field, ProviderError, VerificationOutcome, VerificationRequest};

const DEFAULT_BASE_URL: &str = "https://payout-api.cashfree.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct CashfreeClient {
    base_url: String,
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

impl CashfreeClient {
    pub fn from_env() -> Result<Self, ProviderError> {
        let base_url = env_or_default("CASHFREE_BASE_URL", DEFAULT_BASE_URL);
        let client_id = env_required("CASHFREE_CLIENT_ID")?;
        let client_secret = env_required("CASHFREE_CLIENT_SECRET")?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            client_id,
            client_secret,
            http,
        })
    }

    pub async fn verify_upi(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationOutcome, ProviderError> {
        let vpa = required_field(&request.vpa, "vpa")?;
        let name = required_field(&request.holder_name, "holder_name")?;
        let body = json!({ "vpa": vpa, "name": name });
        let response = self.bearer_post("/payout/v1/validation/upiDetails", &body).await?;
        Ok(map_upi_outcome(&response))
    }

    pub async fn verify_bank(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationOutcome, ProviderError> {
        let account = required_field(&request.account_number, "account_number")?;
        let ifsc = required_field(&request.ifsc, "ifsc")?;
        let name = required_field(&request.holder_name, "holder_name")?;
        let body = json!({ "bankAccount": account, "ifsc": ifsc, "name": name });
        let response = self
            .bearer_post("/payout/v1/validation/bankDetails", &body)
            .await?;
        Ok(map_bank_outcome(&response))
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(format!(
                "{}/payout/v1/authorize",
                self.base_url.trim_end_matches('/')
            ))
            .header("X-Client-Id", &self.client_id)
            .header("X-Client-Secret", &self.client_secret)
            .send()
            .await
            .map_err(|e| ProviderError::Auth(format!("authorize request failed: {e}")))?;

        let body = classify_response("cashfree", "/payout/v1/authorize", response)
            .await
            .map_err(|e| match e {
                ProviderError::Request(message) => ProviderError::Auth(message),
                other => other,
            })?;

        body.pointer("/data/token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::Auth("authorize response did not include a token".to_string())
            })
    }

    async fn bearer_post(&self, path: &str, payload: &Value) -> Result<Value, ProviderError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(format!("{}{}", self.base_url.trim_end_matches('/'), path))
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| ProviderError::Request(format!("POST {path} failed: {e}")))?;

        classify_response("cashfree", path, response).await
    }
}

/// UPI validation: `{"status": "SUCCESS", "data": {"accountExists": "YES", "nameAtBank": ...}}`.
fn map_upi_outcome(response: &Value) -> VerificationOutcome {
    let success = response
        .get("status")
        .and_then(Value::as_str)
        .map(|status| status.eq_ignore_ascii_case("success"))
        .unwrap_or(false);
    let exists = response
        .pointer("/data/accountExists")
        .and_then(Value::as_str)
        .map(|flag| flag.eq_ignore_ascii_case("yes"))
        .unwrap_or(false);

    VerificationOutcome {
        verified: success && exists,
        name: name_at_bank(response),
        reference_id: extract_reference(response),
        raw: response.clone(),
    }
}

/// Bank validation: `{"status": "SUCCESS", "data": {"accountStatus": "VALID", "nameAtBank": ...}}`.
fn map_bank_outcome(response: &Value) -> VerificationOutcome {
    let success = response
        .get("status")
        .and_then(Value::as_str)
        .map(|status| status.eq_ignore_ascii_case("success"))
        .unwrap_or(false);
    let valid = response
        .pointer("/data/accountStatus")
        .and_then(Value::as_str)
        .map(|status| status.eq_ignore_ascii_case("valid"))
        .unwrap_or(false);

    VerificationOutcome {
        verified: success && valid,
        name: name_at_bank(response),
        reference_id: extract_reference(response),
        raw: response.clone(),
    }
}

fn name_at_bank(response: &Value) -> Option<String> {
    response
        .pointer("/data/nameAtBank")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn extract_reference(response: &Value) -> String {
    response
        .pointer("/data/referenceId")
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| format!("cf_{}", uuid::Uuid::new_v4().simple()))
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
    fn upi_outcome_requires_success_and_existing_account() {
        let exists = json!({
            "status": "SUCCESS",
            "data": { "accountExists": "YES", "nameAtBank": "RAVI KUMAR", "referenceId": 184 }
        });
        let outcome = map_upi_outcome(&exists);
        assert!(outcome.verified);
        assert_eq!(outcome.name.as_deref(), Some("RAVI KUMAR"));
        assert_eq!(outcome.reference_id, "184");

        let missing = json!({
            "status": "SUCCESS",
            "data": { "accountExists": "NO" }
        });
        assert!(!map_upi_outcome(&missing).verified);
    }

    #[test]
    fn bank_outcome_requires_valid_account_status() {
        let valid = json!({
            "status": "SUCCESS",
            "data": { "accountStatus": "VALID", "nameAtBank": "RAVI KUMAR" }
        });
        assert!(map_bank_outcome(&valid).verified);

        let invalid = json!({
            "status": "SUCCESS",
            "data": { "accountStatus": "INVALID" }
        });
        assert!(!map_bank_outcome(&invalid).verified);
    }

    #[test]
    fn error_status_maps_to_unverified() {
        let failed = json!({ "status": "ERROR", "subCode": "422" });
        assert!(!map_upi_outcome(&failed).verified);
        assert!(!map_bank_outcome(&failed).verified);
    }

    #[test]
    fn reference_generated_when_absent() {
        let outcome = map_bank_outcome(&json!({ "status": "SUCCESS" }));
        assert!(outcome.reference_id.starts_with("cf_"));
    }
}
