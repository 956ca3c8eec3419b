// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! KYC session creation and the six verification endpoints.
//!
//! Each `POST /v1/kyc/{method}/verify` drives one verification method
//! through the gateway (or, for name-match, a local comparison) and merges
//! the outcome into the KYC session under the store lock. A provider
//! answering `verified = false` is a 200 with `verified: false`, not an
//! error; transport and credential failures map to `provider_unavailable`.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::auth::{require_active_session, Auth};
use crate::error::ApiError;
use crate::kyc::{apply_success, note_rejection, KycFieldUpdate};
use crate::matching::match_names;
use crate::models::{KycMethod, KycSession, KycStatus, Partner};
use crate::providers::{ProviderError, VerificationRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateKycSessionRequest {
    pub session_id: String,
    pub user_id: String,
    /// Primary document type, e.g. `aadhaar` or `pan`.
    pub document_type: String,
    pub document_number: String,
    pub holder_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateKycSessionResponse {
    pub kyc_session_id: String,
    pub status: KycStatus,
    /// All verification methods the gateway supports.
    pub verification_methods: Vec<&'static str>,
    /// Methods that must all succeed for this session to complete.
    pub required_methods: Vec<&'static str>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyRequest {
    pub kyc_session_id: String,
    /// Aadhaar or PAN number, method-dependent.
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub holder_name: Option<String>,
    /// UPI virtual payment address.
    #[serde(default)]
    pub vpa: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub ifsc: Option<String>,
    #[serde(default)]
    pub face_image_base64: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyResponse {
    pub kyc_session_id: String,
    pub method: &'static str,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub reference_id: String,
    /// Session status after this update.
    pub kyc_status: KycStatus,
    /// Extra method-specific fields (e.g. name-match similarity).
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct KycSessionView {
    pub kyc_session_id: String,
    pub session_id: String,
    pub user_id: String,
    pub status: KycStatus,
    pub verified_methods: Vec<&'static str>,
    pub required_methods: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_name: Option<String>,
}

fn method_tags(methods: impl IntoIterator<Item = KycMethod>) -> Vec<&'static str> {
    methods.into_iter().map(|m| m.tag()).collect()
}

fn load_owned_kyc(
    state: &AppState,
    partner: &Partner,
    kyc_session_id: &str,
) -> Result<KycSession, ApiError> {
    let kyc = state
        .store
        .kyc_session(kyc_session_id)
        .map_err(|_| ApiError::not_found(format!("KYC session {kyc_session_id} not found")))?;
    if kyc.partner_id != partner.partner_id {
        return Err(ApiError::not_found(format!(
            "KYC session {kyc_session_id} not found"
        )));
    }
    Ok(kyc)
}

/// Start identity verification for a user inside an active session.
#[utoipa::path(
    post,
    path = "/v1/kyc/session/create",
    tag = "KYC",
    request_body = CreateKycSessionRequest,
    responses(
        (status = 200, description = "KYC session created", body = CreateKycSessionResponse),
        (status = 400, description = "Missing required fields"),
        (status = 401, description = "Invalid API key or expired session"),
        (status = 404, description = "Unknown session")
    ),
    security(("api_key" = []))
)]
pub async fn create_kyc_session(
    Auth(partner): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateKycSessionRequest>,
) -> Result<Json<CreateKycSessionResponse>, ApiError> {
    let session = require_active_session(&*state.store, &partner, &request.session_id)?;

    for (value, field) in [
        (&request.user_id, "user_id"),
        (&request.document_type, "document_type"),
        (&request.document_number, "document_number"),
        (&request.holder_name, "holder_name"),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::validation(format!("{field} must not be empty")));
        }
    }

    let kyc = KycSession::new(
        session.session_id,
        partner.partner_id.clone(),
        request.user_id,
        request.document_type.trim().to_lowercase(),
        request.document_number.trim().to_string(),
        request.holder_name.trim().to_string(),
    );
    state
        .store
        .insert_kyc_session(kyc.clone())
        .map_err(|e| ApiError::internal(format!("failed to persist KYC session: {e}")))?;

    tracing::info!(
        partner_id = %partner.partner_id,
        kyc_session_id = %kyc.kyc_session_id,
        "KYC session created"
    );

    Ok(Json(CreateKycSessionResponse {
        kyc_session_id: kyc.kyc_session_id,
        status: kyc.status,
        verification_methods: method_tags(KycMethod::ALL),
        required_methods: method_tags(state.config.kyc_required_methods.iter().copied()),
    }))
}

/// Run one verification method against the gateway and merge the result.
#[utoipa::path(
    post,
    path = "/v1/kyc/{method}/verify",
    tag = "KYC",
    params(("method" = String, Path, description = "aadhaar | pan | face | upi | bank | name-match")),
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Verification outcome", body = VerifyResponse),
        (status = 400, description = "Unknown method or missing fields"),
        (status = 404, description = "Unknown KYC session"),
        (status = 409, description = "KYC session already failed"),
        (status = 422, description = "Provider refused the request"),
        (status = 503, description = "Provider unavailable")
    ),
    security(("api_key" = []))
)]
pub async fn verify_method(
    Auth(partner): Auth,
    State(state): State<AppState>,
    Path(method): Path<String>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let method = KycMethod::from_tag(&method)
        .ok_or_else(|| ApiError::validation(format!("unknown verification method `{method}`")))?;

    let kyc = load_owned_kyc(&state, &partner, &request.kyc_session_id)?;
    if kyc.status == KycStatus::Failed {
        return Err(ApiError::state_conflict("KYC session has already failed"));
    }

    if method == KycMethod::NameMatch {
        return verify_name_match(&state, kyc).await;
    }

    let verification = build_verification_request(method, &request, &kyc)?;
    let outcome = state
        .kyc_gateway
        .verify(method, &verification)
        .await
        .map_err(map_provider_error)?;

    let required = state.config.kyc_required_methods.clone();
    let updated = if outcome.verified {
        let update = KycFieldUpdate {
            method,
            verified_name: outcome.name.clone(),
            raw: Some(outcome.raw.clone()),
        };
        state
            .store
            .update_kyc_session(&kyc.kyc_session_id, &mut |session| {
                apply_success(session, update.clone(), &required);
            })
    } else {
        state
            .store
            .update_kyc_session(&kyc.kyc_session_id, &mut |session| note_rejection(session))
    }
    .map_err(|e| ApiError::internal(format!("failed to update KYC session: {e}")))?;

    tracing::info!(
        kyc_session_id = %updated.kyc_session_id,
        method = method.tag(),
        verified = outcome.verified,
        kyc_status = ?updated.status,
        "verification recorded"
    );

    Ok(Json(VerifyResponse {
        kyc_session_id: updated.kyc_session_id,
        method: method.tag(),
        verified: outcome.verified,
        name: outcome.name,
        reference_id: outcome.reference_id,
        kyc_status: updated.status,
        details: None,
    }))
}

/// Compare two provider-verified names locally; no external call.
async fn verify_name_match(
    state: &AppState,
    kyc: KycSession,
) -> Result<Json<VerifyResponse>, ApiError> {
    let names: Vec<&String> = [&kyc.aadhaar_name, &kyc.pan_name, &kyc.bank_name, &kyc.upi_name]
        .into_iter()
        .flatten()
        .collect();
    let [left, right, ..] = names.as_slice() else {
        return Err(ApiError::state_conflict(
            "name-match needs at least two provider-verified names; verify aadhaar/pan/bank/upi first",
        ));
    };

    let result = match_names(left.as_str(), right.as_str());
    let details = json!({
        "similarity": result.similarity,
        "high_confidence": result.high_confidence,
        "compared": [left, right],
    });

    let required = state.config.kyc_required_methods.clone();
    let reference_id = format!("nm_{}", uuid::Uuid::new_v4().simple());
    let updated = if result.matched {
        let update = KycFieldUpdate {
            method: KycMethod::NameMatch,
            verified_name: None,
            raw: Some(details.clone()),
        };
        state
            .store
            .update_kyc_session(&kyc.kyc_session_id, &mut |session| {
                apply_success(session, update.clone(), &required);
            })
    } else {
        state
            .store
            .update_kyc_session(&kyc.kyc_session_id, &mut |session| note_rejection(session))
    }
    .map_err(|e| ApiError::internal(format!("failed to update KYC session: {e}")))?;

    Ok(Json(VerifyResponse {
        kyc_session_id: updated.kyc_session_id,
        method: KycMethod::NameMatch.tag(),
        verified: result.matched,
        name: None,
        reference_id,
        kyc_status: updated.status,
        details: Some(details),
    }))
}

fn build_verification_request(
    method: KycMethod,
    request: &VerifyRequest,
    kyc: &KycSession,
) -> Result<VerificationRequest, ApiError> {
    let require = |value: &Option<String>, field: &str| -> Result<String, ApiError> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::validation(format!("{field} is required for {}", method.tag())))
    };

    let holder_name = request
        .holder_name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| kyc.holder_name.clone());

    let mut verification = VerificationRequest {
        holder_name: Some(holder_name),
        ..Default::default()
    };
    match method {
        KycMethod::Aadhaar | KycMethod::Pan => {
            verification.document_number = Some(
                request
                    .document_number
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| kyc.document_number.clone()),
            );
        }
        KycMethod::Face => {
            verification.face_image_base64 = Some(require(&request.face_image_base64, "face_image_base64")?);
        }
        KycMethod::Upi => {
            verification.vpa = Some(require(&request.vpa, "vpa")?);
        }
        KycMethod::Bank => {
            verification.account_number = Some(require(&request.account_number, "account_number")?);
            verification.ifsc = Some(require(&request.ifsc, "ifsc")?);
        }
        KycMethod::NameMatch => unreachable!("name-match is handled locally"),
    }
    Ok(verification)
}

/// Transport and credential failures read as the provider being unavailable;
/// a non-2xx answer means the provider processed and refused the request.
fn map_provider_error(err: ProviderError) -> ApiError {
    match err {
        ProviderError::MissingConfig(msg) => ApiError::internal(msg),
        ProviderError::Auth(msg) | ProviderError::Unavailable(msg) => {
            ApiError::provider_unavailable(msg)
        }
        ProviderError::Request(msg) => ApiError::provider_rejected(msg),
    }
}

/// Current verification progress for a KYC session.
#[utoipa::path(
    get,
    path = "/v1/kyc/session/{kyc_session_id}",
    tag = "KYC",
    params(("kyc_session_id" = String, Path, description = "KYC session ID")),
    responses(
        (status = 200, description = "KYC session state", body = KycSessionView),
        (status = 404, description = "Unknown KYC session")
    ),
    security(("api_key" = []))
)]
pub async fn get_kyc_session(
    Auth(partner): Auth,
    State(state): State<AppState>,
    Path(kyc_session_id): Path<String>,
) -> Result<Json<KycSessionView>, ApiError> {
    let kyc = load_owned_kyc(&state, &partner, &kyc_session_id)?;
    let verified_methods = method_tags(kyc.verified_methods());
    Ok(Json(KycSessionView {
        kyc_session_id: kyc.kyc_session_id,
        session_id: kyc.session_id,
        user_id: kyc.user_id,
        status: kyc.status,
        verified_methods,
        required_methods: method_tags(state.config.kyc_required_methods.iter().copied()),
        verified_name: kyc.verified_name,
    }))
}
