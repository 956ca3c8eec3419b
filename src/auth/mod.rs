// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! Partner authentication.
//!
//! Every partner-facing endpoint requires `Authorization: Bearer <api_key>`.
//! The key resolves to an onboarded partner, which must be active. Use the
//! `Auth` extractor in handlers:
//!
//! ```rust,ignore
//! async fn create_session(Auth(partner): Auth, ...) -> Result<..., ApiError> {
//!     // partner is the authenticated Partner record
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;

use crate::error::ApiError;
use crate::models::{Partner, PartnerStatus, Session, SessionStatus};
use crate::state::AppState;
use crate::storage::GatewayStore;

/// Extractor yielding the authenticated partner.
#[derive(Debug)]
pub struct Auth(pub Partner);

impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| ApiError::auth("missing Authorization header"))?
            .to_str()
            .map_err(|_| ApiError::auth("malformed Authorization header"))?;

        let api_key = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::auth("Authorization header must be `Bearer <api_key>`"))?;

        let partner = state
            .store
            .partner_by_api_key(api_key)
            .map_err(|_| ApiError::auth("invalid API key"))?;

        if partner.status != PartnerStatus::Active {
            return Err(ApiError::auth("partner account is suspended"));
        }

        Ok(Auth(partner))
    }
}

/// Load a session, enforce ownership and lazy expiry.
pub fn require_active_session(
    store: &dyn GatewayStore,
    partner: &Partner,
    session_id: &str,
) -> Result<Session, ApiError> {
    let session = store
        .session(session_id)
        .map_err(|_| ApiError::not_found(format!("session {session_id} not found")))?;

    if session.partner_id != partner.partner_id {
        // Do not reveal other partners' session IDs.
        return Err(ApiError::not_found(format!("session {session_id} not found")));
    }

    match session.effective_status(Utc::now()) {
        SessionStatus::Active => Ok(session),
        SessionStatus::Expired => Err(ApiError::auth("session has expired")),
        SessionStatus::Completed => Err(ApiError::state_conflict("session is already completed")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use chrono::Duration;

    fn seeded_state() -> (AppState, Partner) {
        let state = AppState::for_tests();
        let partner = Partner::new(
            "key_live_test".into(),
            "https://partner.example/hook".into(),
            "whsec_test".into(),
        );
        state.store.insert_partner(partner.clone()).unwrap();
        (state, partner)
    }

    fn parts_with_header(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/v1/session/create");
        if let Some(value) = value {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn valid_api_key_resolves_partner() {
        let (state, partner) = seeded_state();
        let mut parts = parts_with_header(Some("Bearer key_live_test"));
        let Auth(resolved) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(resolved.partner_id, partner.partner_id);
    }

    #[tokio::test]
    async fn missing_header_is_auth_error() {
        let (state, _) = seeded_state();
        let mut parts = parts_with_header(None);
        let err = Auth::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.code, "auth_error");
    }

    #[tokio::test]
    async fn unknown_key_is_rejected() {
        let (state, _) = seeded_state();
        let mut parts = parts_with_header(Some("Bearer key_unknown"));
        let err = Auth::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.code, "auth_error");
    }

    #[tokio::test]
    async fn suspended_partner_is_rejected() {
        let state = AppState::for_tests();
        let mut partner = Partner::new(
            "key_suspended".into(),
            "https://partner.example/hook".into(),
            "whsec_test".into(),
        );
        partner.status = PartnerStatus::Suspended;
        state.store.insert_partner(partner).unwrap();

        let mut parts = parts_with_header(Some("Bearer key_suspended"));
        let err = Auth::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.code, "auth_error");
    }

    #[test]
    fn expired_session_is_auth_error() {
        let (state, partner) = seeded_state();
        let mut session = Session::new(partner.partner_id.clone(), None);
        session.expires_at = Utc::now() - Duration::minutes(1);
        let id = session.session_id.clone();
        state.store.insert_session(session).unwrap();

        let err = require_active_session(&*state.store, &partner, &id).unwrap_err();
        assert_eq!(err.code, "auth_error");
    }

    #[test]
    fn foreign_session_reads_as_not_found() {
        let (state, partner) = seeded_state();
        let session = Session::new("ptn_other".into(), None);
        let id = session.session_id.clone();
        state.store.insert_session(session).unwrap();

        let err = require_active_session(&*state.store, &partner, &id).unwrap_err();
        assert_eq!(err.code, "not_found");
    }
}
