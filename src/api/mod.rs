// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

pub mod health;
pub mod kyc;
pub mod quotes;
pub mod sessions;
pub mod transactions;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/session/create", post(sessions::create_session))
        .route("/quotes", get(quotes::get_quote))
        .route("/kyc/session/create", post(kyc::create_kyc_session))
        .route("/kyc/session/{kyc_session_id}", get(kyc::get_kyc_session))
        .route("/kyc/{method}/verify", post(kyc::verify_method))
        .route("/transaction/create", post(transactions::create_transaction))
        .route(
            "/transaction/{transaction_id}",
            get(transactions::get_transaction),
        )
        .route("/simulate/deposit", post(transactions::simulate_deposit))
        .route("/payout/initiate", post(transactions::initiate_payout))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        sessions::create_session,
        quotes::get_quote,
        kyc::create_kyc_session,
        kyc::verify_method,
        kyc::get_kyc_session,
        transactions::create_transaction,
        transactions::get_transaction,
        transactions::simulate_deposit,
        transactions::initiate_payout,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            sessions::CreateSessionRequest,
            sessions::SessionResponse,
            quotes::FeeBreakdownResponse,
            quotes::QuoteResponse,
            kyc::CreateKycSessionRequest,
            kyc::CreateKycSessionResponse,
            kyc::VerifyRequest,
            kyc::VerifyResponse,
            kyc::KycSessionView,
            transactions::CreateTransactionRequest,
            transactions::TransactionResponse,
            transactions::TransactionView,
            transactions::SimulateDepositRequest,
            transactions::InitiatePayoutRequest,
            transactions::PayoutResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Sessions", description = "Off-ramp flow sessions"),
        (name = "Quotes", description = "FX quotes and fee breakdowns"),
        (name = "KYC", description = "Identity verification orchestration"),
        (name = "Transactions", description = "Deposit and payout lifecycle"),
        (name = "Health", description = "Service health probes")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some("Partner API key"))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(AppState::for_tests());
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[test]
    fn openapi_document_includes_the_partner_surface() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/v1/quotes"));
        assert!(paths.iter().any(|p| p.as_str() == "/v1/payout/initiate"));
        assert!(paths.iter().any(|p| p.as_str() == "/health"));
    }
}
