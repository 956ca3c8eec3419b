// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! API error taxonomy and JSON error envelope.
//!
//! Every error surfaced to a partner uses the same envelope:
//!
//! ```json
//! { "success": false, "error": "state_conflict", "message": "...", "details": { } }
//! ```
//!
//! Internal failures are reported with a generic message; provider and
//! storage error details never leak into responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attach a structured details object to the envelope.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Missing or malformed request fields. Local, never retried.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    /// Invalid or inactive API key, or expired session token.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "auth_error", message)
    }

    /// Unknown session/quote/KYC session/transaction ID.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    /// Operation invalid for the entity's current state. Never coerced.
    pub fn state_conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "state_conflict", message)
    }

    /// External provider unreachable or returned a non-JSON body.
    pub fn provider_unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "provider_unavailable",
            message,
        )
    }

    /// Provider processed the request and refused it (non-2xx answer).
    /// Distinct from a business-level `verified = false`, which is a 200.
    pub fn provider_rejected(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "provider_rejected",
            message,
        )
    }

    /// Internal failure. The cause is logged; the response stays generic.
    pub fn internal(message: impl Into<String>) -> Self {
        tracing::error!(error = %message.into(), "internal error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "An internal error occurred",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            success: false,
            error: self.code,
            message: self.message,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::json;

    #[test]
    fn constructors_set_status_and_code() {
        assert_eq!(ApiError::validation("x").status, StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::auth("x").status, StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::not_found("x").status, StatusCode::NOT_FOUND);
        assert_eq!(ApiError::state_conflict("x").status, StatusCode::CONFLICT);
        assert_eq!(
            ApiError::provider_unavailable("x").status,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::provider_rejected("x").status,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::state_conflict("x").code, "state_conflict");
    }

    #[test]
    fn internal_error_hides_cause() {
        let err = ApiError::internal("secret backend failure");
        assert_eq!(err.message, "An internal error occurred");
    }

    #[tokio::test]
    async fn into_response_uses_envelope() {
        let response = ApiError::state_conflict("quote expired")
            .with_details(json!({"quote_reference": "qt_1"}))
            .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "state_conflict");
        assert_eq!(body["message"], "quote expired");
        assert_eq!(body["details"]["quote_reference"], "qt_1");
    }
}
