// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Session, SessionStatus};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Partner callback URL for this flow; must be a valid absolute URL.
    #[serde(default)]
    pub callback_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub session_id: String,
    /// Short-lived token identifying this flow attempt.
    pub token: String,
    pub status: SessionStatus,
    pub expires_at: DateTime<Utc>,
}

/// Start a new off-ramp flow for the authenticated partner.
#[utoipa::path(
    post,
    path = "/v1/session/create",
    tag = "Sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session created", body = SessionResponse),
        (status = 400, description = "Invalid callback URL"),
        (status = 401, description = "Invalid API key")
    ),
    security(("api_key" = []))
)]
pub async fn create_session(
    Auth(partner): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    if let Some(callback_url) = &request.callback_url {
        url::Url::parse(callback_url)
            .map_err(|_| ApiError::validation("callback_url must be a valid absolute URL"))?;
    }

    let session = Session::new(partner.partner_id.clone(), request.callback_url);
    state
        .store
        .insert_session(session.clone())
        .map_err(|e| ApiError::internal(format!("failed to persist session: {e}")))?;

    tracing::info!(
        partner_id = %partner.partner_id,
        session_id = %session.session_id,
        "session created"
    );

    Ok(Json(SessionResponse {
        session_id: session.session_id,
        token: session.token,
        status: session.status,
        expires_at: session.expires_at,
    }))
}
