// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{require_active_session, Auth};
use crate::error::ApiError;
use crate::fees::quote_breakdown;
use crate::models::{Asset, Quote, QuoteStatus};
use crate::state::AppState;

/// Confirmations required before a deposit counts as detected.
const MIN_CONFIRMATIONS: u32 = 12;

const DEFAULT_NETWORK: &str = "polygon";

#[derive(Debug, Deserialize, IntoParams)]
pub struct QuoteQuery {
    pub session_id: String,
    /// `USDC` or `USDT`.
    pub asset: String,
    #[serde(default)]
    pub network: Option<String>,
    /// USD amount to convert; must be positive.
    #[param(value_type = String)]
    pub amount_usd: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeeBreakdownResponse {
    #[schema(value_type = String)]
    pub gross_inr: Decimal,
    #[schema(value_type = String)]
    pub tds: Decimal,
    #[schema(value_type = String)]
    pub platform_fee: Decimal,
    #[schema(value_type = String)]
    pub gst: Decimal,
    #[schema(value_type = String)]
    pub net_inr: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuoteResponse {
    pub quote_reference: String,
    pub asset: Asset,
    pub network: String,
    #[schema(value_type = String)]
    pub amount_usd: Decimal,
    #[schema(value_type = String)]
    pub fx_rate: Decimal,
    pub breakdown: FeeBreakdownResponse,
    pub deposit_address: String,
    pub min_confirmations: u32,
    pub expires_at: DateTime<Utc>,
}

/// Synthetic EVM-style deposit address; real address derivation belongs to
/// the custody integration, which sits outside this gateway.
fn generate_deposit_address() -> String {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let mut bytes = [0u8; 20];
    bytes[..16].copy_from_slice(a.as_bytes());
    bytes[16..].copy_from_slice(&b.as_bytes()[..4]);
    format!("0x{}", hex::encode(bytes))
}

/// Price a conversion and persist the resulting quote.
///
/// Financial fields are fixed at creation; the quote expires 15 minutes
/// later and a transaction must consume it before then.
#[utoipa::path(
    get,
    path = "/v1/quotes",
    tag = "Quotes",
    params(QuoteQuery),
    responses(
        (status = 200, description = "Quote created", body = QuoteResponse),
        (status = 400, description = "Invalid amount or asset"),
        (status = 401, description = "Invalid API key or expired session"),
        (status = 404, description = "Unknown session")
    ),
    security(("api_key" = []))
)]
pub async fn get_quote(
    Auth(partner): Auth,
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let session = require_active_session(&*state.store, &partner, &query.session_id)?;

    if query.amount_usd <= Decimal::ZERO {
        return Err(ApiError::validation("amount_usd must be positive"));
    }
    let asset = Asset::from_symbol(&query.asset)
        .ok_or_else(|| ApiError::validation("asset must be USDC or USDT"))?;
    let network = query
        .network
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_NETWORK.to_string());

    let fx_rate = state.rates.usd_inr().await;
    let breakdown = quote_breakdown(query.amount_usd, fx_rate);

    let now = Utc::now();
    let quote = Quote {
        quote_reference: format!("qt_{}", Uuid::new_v4().simple()),
        session_id: session.session_id,
        asset,
        network: network.clone(),
        amount_usd: query.amount_usd,
        fx_rate,
        gross_inr: breakdown.gross_inr,
        platform_fee: breakdown.platform_fee,
        gst_amount: breakdown.gst,
        tds_amount: breakdown.tds,
        estimated_inr: breakdown.net_inr,
        deposit_address: generate_deposit_address(),
        min_confirmations: MIN_CONFIRMATIONS,
        status: QuoteStatus::Active,
        created_at: now,
        expires_at: now + Quote::expiry_window(),
    };

    state
        .store
        .insert_quote(quote.clone())
        .map_err(|e| ApiError::internal(format!("failed to persist quote: {e}")))?;

    tracing::info!(
        quote_reference = %quote.quote_reference,
        amount_usd = %quote.amount_usd,
        fx_rate = %fx_rate,
        "quote created"
    );

    Ok(Json(QuoteResponse {
        quote_reference: quote.quote_reference,
        asset: quote.asset,
        network,
        amount_usd: quote.amount_usd,
        fx_rate,
        breakdown: FeeBreakdownResponse {
            gross_inr: breakdown.gross_inr,
            tds: breakdown.tds,
            platform_fee: breakdown.platform_fee,
            gst: breakdown.gst,
            net_inr: breakdown.net_inr,
        },
        deposit_address: quote.deposit_address,
        min_confirmations: quote.min_confirmations,
        expires_at: quote.expires_at,
    }))
}
