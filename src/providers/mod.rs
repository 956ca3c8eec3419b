// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! # KYC Verification Gateway
//!
//! Thin adapters over the two external KYC providers, normalized into one
//! internal result shape. Which implementation runs (live clients vs the
//! simulator) is decided once at startup and injected through
//! [`KycVerifier`]; handlers never branch on an environment flag.
//!
//! Routing: aadhaar / pan / face-liveness → Surepass (signed-request API);
//! upi / bank → Cashfree (bearer-token API). Name-match is a local
//! computation over already-verified names and never reaches a provider.
//!
//! Classification contract:
//! - non-2xx or a non-JSON (HTML) body is a transport-level failure,
//!   surfaced as [`ProviderError`] — typically credentials or IP
//!   whitelisting, so the message stays actionable;
//! - a well-formed response with a negative verdict is a *business*
//!   rejection: `Ok(outcome)` with `verified = false`, never an error.

pub mod cashfree;
pub mod surepass;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::models::KycMethod;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider configuration missing: {0}")]
    MissingConfig(String),

    #[error("provider auth failed: {0}")]
    Auth(String),

    #[error("provider request failed: {0}")]
    Request(String),

    /// The provider answered with something other than JSON (usually an
    /// HTML error page from a gateway or WAF). Distinct from `Request` so
    /// callers can surface credential/whitelisting guidance.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Normalized result of one external verification call.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub verified: bool,
    /// Holder name as reported by the provider, when available.
    pub name: Option<String>,
    /// Provider-side reference for audit and support.
    pub reference_id: String,
    /// Raw provider response, persisted for dispute handling.
    pub raw: Value,
}

/// Normalized input for any verification method. Method-specific fields are
/// optional; each adapter validates the ones it needs.
#[derive(Debug, Clone, Default)]
pub struct VerificationRequest {
    pub document_number: Option<String>,
    pub holder_name: Option<String>,
    pub vpa: Option<String>,
    pub account_number: Option<String>,
    pub ifsc: Option<String>,
    pub face_image_base64: Option<String>,
}

#[async_trait]
pub trait KycVerifier: Send + Sync {
    async fn verify(
        &self,
        method: KycMethod,
        request: &VerificationRequest,
    ) -> Result<VerificationOutcome, ProviderError>;
}

/// Live gateway routing each method to its provider client.
pub struct KycGateway {
    surepass: surepass::SurepassClient,
    cashfree: cashfree::CashfreeClient,
}

impl KycGateway {
    pub fn from_env() -> Result<Self, ProviderError> {
        Ok(Self {
            surepass: surepass::SurepassClient::from_env()?,
            cashfree: cashfree::CashfreeClient::from_env()?,
        })
    }
}

#[async_trait]
impl KycVerifier for KycGateway {
    async fn verify(
        &self,
        method: KycMethod,
        request: &VerificationRequest,
    ) -> Result<VerificationOutcome, ProviderError> {
        match method {
            KycMethod::Aadhaar => self.surepass.verify_aadhaar(request).await,
            KycMethod::Pan => self.surepass.verify_pan(request).await,
            KycMethod::Face => self.surepass.verify_face(request).await,
            KycMethod::Upi => self.cashfree.verify_upi(request).await,
            KycMethod::Bank => self.cashfree.verify_bank(request).await,
            KycMethod::NameMatch => Err(ProviderError::Request(
                "name_match is computed locally, not via a provider".to_string(),
            )),
        }
    }
}

/// Deterministic in-process stand-in for sandbox mode and tests.
///
/// Verifies everything except document numbers ending in `0000`, which are
/// rejected on business grounds (exercises the `verified = false` path).
pub struct SimulatedKycGateway;

fn simulated_rejected(request: &VerificationRequest) -> bool {
    request
        .document_number
        .as_deref()
        .map(|number| number.ends_with("0000"))
        .unwrap_or(false)
}

#[async_trait]
impl KycVerifier for SimulatedKycGateway {
    async fn verify(
        &self,
        method: KycMethod,
        request: &VerificationRequest,
    ) -> Result<VerificationOutcome, ProviderError> {
        if method == KycMethod::NameMatch {
            return Err(ProviderError::Request(
                "name_match is computed locally, not via a provider".to_string(),
            ));
        }

        let verified = !simulated_rejected(request);
        let name = request
            .holder_name
            .clone()
            .filter(|_| verified)
            .or_else(|| verified.then(|| "Simulated Holder".to_string()));
        let reference_id = format!("sim_{}", Uuid::new_v4().simple());

        Ok(VerificationOutcome {
            verified,
            name,
            raw: serde_json::json!({
                "simulated": true,
                "method": method.tag(),
                "reference_id": reference_id,
                "verified": verified,
            }),
            reference_id,
        })
    }
}

/// Shared classification for provider response bodies: non-2xx and non-JSON
/// bodies become errors; valid JSON is handed back for field mapping.
pub(crate) async fn classify_response(
    provider: &str,
    path: &str,
    response: reqwest::Response,
) -> Result<Value, ProviderError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::Request(format!("{provider} {path}: read body failed: {e}")))?;

    let trimmed = body.trim_start();
    if trimmed.starts_with('<') {
        // HTML instead of JSON: gateway/WAF page, credentials or whitelisting.
        return Err(ProviderError::Unavailable(format!(
            "{provider} {path} returned HTML ({status}); check API credentials and IP whitelisting"
        )));
    }

    if !status.is_success() {
        return Err(ProviderError::Request(format!(
            "{provider} {path} returned {status}: {body}"
        )));
    }

    serde_json::from_str(&body).map_err(|e| {
        ProviderError::Unavailable(format!("{provider} {path} returned non-JSON body: {e}"))
    })
}

pub(crate) fn required_field<'a>(
    value: &'a Option<String>,
    field: &str,
) -> Result<&'a str, ProviderError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProviderError::Request(format!("missing required field `{field}`")))
}
