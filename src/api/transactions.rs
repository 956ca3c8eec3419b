// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! Transaction creation, deposit reporting, and payout initiation.
//!
//! Creation consumes the quote (compare-and-swap `active → used`), so two
//! concurrent creations against one quote cannot both succeed. Deposit and
//! payout transitions go through the same compare-and-swap, and each
//! successful transition enqueues its webhook before the response returns;
//! delivery itself is the poller's job.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{require_active_session, Auth};
use crate::error::ApiError;
use crate::lifecycle::{check_creation, deposit_within_tolerance, generate_utr, CreationDenied};
use crate::models::{Partner, QuoteStatus, Transaction, TransactionStatus, WebhookEventType};
use crate::state::AppState;
use crate::storage::StorageError;
use crate::webhooks::transaction_event;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTransactionRequest {
    pub session_id: String,
    pub quote_reference: String,
    pub kyc_session_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionResponse {
    pub transaction_id: String,
    pub status: TransactionStatus,
    pub deposit_address: String,
    #[schema(value_type = String)]
    pub expected_amount: Decimal,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionView {
    pub transaction_id: String,
    pub session_id: String,
    pub quote_reference: String,
    pub status: TransactionStatus,
    pub deposit_address: String,
    #[schema(value_type = String)]
    pub expected_amount: Decimal,
    #[schema(value_type = String)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposited_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_tx_hash: Option<String>,
    #[schema(value_type = String)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout_amount_inr: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SimulateDepositRequest {
    pub transaction_id: String,
    /// USD amount observed on-chain.
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[serde(default)]
    pub tx_hash: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InitiatePayoutRequest {
    pub transaction_id: String,
    /// Payout rail, e.g. `imps` or `upi`. Informational in sandbox.
    #[serde(default)]
    pub channel: Option<String>,
    /// Destination account or VPA. Informational in sandbox.
    #[serde(default)]
    pub destination: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PayoutResponse {
    pub transaction_id: String,
    pub status: TransactionStatus,
    pub utr: String,
    #[schema(value_type = String)]
    pub payout_amount_inr: Decimal,
    pub completed_at: DateTime<Utc>,
}

fn view(transaction: Transaction, now: DateTime<Utc>) -> TransactionView {
    let status = transaction.effective_status(now);
    TransactionView {
        transaction_id: transaction.transaction_id,
        session_id: transaction.session_id,
        quote_reference: transaction.quote_reference,
        status,
        deposit_address: transaction.deposit_address,
        expected_amount: transaction.expected_amount,
        deposited_amount: transaction.deposited_amount,
        deposit_tx_hash: transaction.deposit_tx_hash,
        payout_amount_inr: transaction.payout_amount,
        utr: transaction.payout_utr,
        failure_reason: transaction.failure_reason,
        completed_at: transaction.completed_at,
        expires_at: transaction.expires_at,
    }
}

fn load_owned_transaction(
    state: &AppState,
    partner: &Partner,
    transaction_id: &str,
) -> Result<Transaction, ApiError> {
    let transaction = state
        .store
        .transaction(transaction_id)
        .map_err(|_| ApiError::not_found(format!("transaction {transaction_id} not found")))?;
    let owned = state
        .store
        .session(&transaction.session_id)
        .map(|session| session.partner_id == partner.partner_id)
        .unwrap_or(false);
    if !owned {
        return Err(ApiError::not_found(format!(
            "transaction {transaction_id} not found"
        )));
    }
    Ok(transaction)
}

fn enqueue_webhook(
    state: &AppState,
    partner: &Partner,
    event_type: WebhookEventType,
    transaction: &Transaction,
) {
    let event = transaction_event(
        event_type,
        transaction,
        partner.partner_id.clone(),
        partner.webhook_url.clone(),
        state.config.webhook_max_attempts,
    );
    if let Err(err) = state.store.insert_webhook_event(event) {
        // The transition already happened; delivery failure is partner-support work.
        tracing::error!(
            transaction_id = %transaction.transaction_id,
            event = event_type.name(),
            error = %err,
            "failed to enqueue webhook event"
        );
    }
}

/// Create a transaction against a quote and a completed KYC session.
#[utoipa::path(
    post,
    path = "/v1/transaction/create",
    tag = "Transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 200, description = "Transaction created", body = TransactionResponse),
        (status = 401, description = "Invalid API key or expired session"),
        (status = 404, description = "Unknown session, quote, or KYC session"),
        (status = 409, description = "Expired/used quote or incomplete KYC")
    ),
    security(("api_key" = []))
)]
pub async fn create_transaction(
    Auth(partner): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let session = require_active_session(&*state.store, &partner, &request.session_id)?;

    let quote = state
        .store
        .quote(&request.quote_reference)
        .map_err(|_| ApiError::not_found(format!("quote {} not found", request.quote_reference)))?;
    if quote.session_id != session.session_id {
        return Err(ApiError::not_found(format!(
            "quote {} not found",
            request.quote_reference
        )));
    }

    let kyc = state.store.kyc_session(&request.kyc_session_id).map_err(|_| {
        ApiError::not_found(format!("KYC session {} not found", request.kyc_session_id))
    })?;
    if kyc.session_id != session.session_id {
        return Err(ApiError::not_found(format!(
            "KYC session {} not found",
            request.kyc_session_id
        )));
    }

    check_creation(&session, &quote, &kyc, Utc::now()).map_err(|denied| {
        let message = denied.to_string();
        match denied {
            CreationDenied::SessionInactive(_)
            | CreationDenied::QuoteExpired
            | CreationDenied::QuoteUsed => ApiError::state_conflict(message),
            CreationDenied::KycIncomplete(status) => ApiError::state_conflict(message)
                .with_details(json!({ "kyc_status": status })),
        }
    })?;

    // Consume the quote; a concurrent creation loses here.
    state
        .store
        .set_quote_status(&quote.quote_reference, QuoteStatus::Active, QuoteStatus::Used)
        .map_err(|err| match err {
            StorageError::Conflict { .. } => {
                ApiError::state_conflict("quote has already been used by another transaction")
            }
            other => ApiError::internal(format!("failed to consume quote: {other}")),
        })?;

    let transaction = Transaction::new(
        session.session_id,
        quote.quote_reference,
        kyc.kyc_session_id,
        kyc.user_id,
        quote.deposit_address,
        quote.amount_usd,
    );
    state
        .store
        .insert_transaction(transaction.clone())
        .map_err(|e| ApiError::internal(format!("failed to persist transaction: {e}")))?;

    tracing::info!(
        transaction_id = %transaction.transaction_id,
        quote_reference = %transaction.quote_reference,
        "transaction created"
    );

    Ok(Json(TransactionResponse {
        transaction_id: transaction.transaction_id,
        status: transaction.status,
        deposit_address: transaction.deposit_address,
        expected_amount: transaction.expected_amount,
        expires_at: transaction.expires_at,
    }))
}

/// Current transaction state, with lazy expiry applied.
#[utoipa::path(
    get,
    path = "/v1/transaction/{transaction_id}",
    tag = "Transactions",
    params(("transaction_id" = String, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction state", body = TransactionView),
        (status = 404, description = "Unknown transaction")
    ),
    security(("api_key" = []))
)]
pub async fn get_transaction(
    Auth(partner): Auth,
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<TransactionView>, ApiError> {
    let transaction = load_owned_transaction(&state, &partner, &transaction_id)?;
    Ok(Json(view(transaction, Utc::now())))
}

/// Report a deposit against a pending transaction.
///
/// In sandbox this is the only deposit source; in live deployments a chain
/// listener would call the same transition. The reported amount must
/// reconcile against the quoted amount within the configured tolerance, or
/// the transaction fails with `mismatched_amount`.
#[utoipa::path(
    post,
    path = "/v1/simulate/deposit",
    tag = "Transactions",
    request_body = SimulateDepositRequest,
    responses(
        (status = 200, description = "Deposit recorded", body = TransactionView),
        (status = 400, description = "Non-positive amount"),
        (status = 404, description = "Unknown transaction"),
        (status = 409, description = "Transaction not awaiting a deposit, or amount mismatch")
    ),
    security(("api_key" = []))
)]
pub async fn simulate_deposit(
    Auth(partner): Auth,
    State(state): State<AppState>,
    Json(request): Json<SimulateDepositRequest>,
) -> Result<Json<TransactionView>, ApiError> {
    if request.amount <= Decimal::ZERO {
        return Err(ApiError::validation("amount must be positive"));
    }

    let transaction = load_owned_transaction(&state, &partner, &request.transaction_id)?;
    let now = Utc::now();
    match transaction.effective_status(now) {
        TransactionStatus::PendingDeposit => {}
        TransactionStatus::Expired => {
            return Err(ApiError::state_conflict("transaction deposit window has expired"));
        }
        other => {
            return Err(ApiError::state_conflict(format!(
                "deposit already recorded; transaction is {other:?}"
            )));
        }
    }

    let tx_hash = request
        .tx_hash
        .clone()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| format!("sim_{}", Uuid::new_v4().simple()));

    let within_tolerance = deposit_within_tolerance(
        transaction.expected_amount,
        request.amount,
        state.config.deposit_tolerance_bps,
    );

    if !within_tolerance {
        let failed = state
            .store
            .transition_transaction(
                &request.transaction_id,
                TransactionStatus::PendingDeposit,
                &mut |tx| {
                    tx.status = TransactionStatus::Failed;
                    tx.deposited_amount = Some(request.amount);
                    tx.deposit_tx_hash = Some(tx_hash.clone());
                    tx.failure_reason = Some("mismatched_amount".to_string());
                },
            )
            .map_err(map_transition_error)?;

        tracing::warn!(
            transaction_id = %failed.transaction_id,
            expected = %failed.expected_amount,
            deposited = %request.amount,
            "deposit outside tolerance; transaction failed"
        );
        return Err(ApiError::state_conflict(
            "deposited amount does not reconcile against the quoted amount",
        )
        .with_details(json!({
            "failure_reason": "mismatched_amount",
            "expected_amount": failed.expected_amount,
            "deposited_amount": request.amount,
            "tolerance_bps": state.config.deposit_tolerance_bps,
        })));
    }

    let confirmed = state
        .store
        .transition_transaction(
            &request.transaction_id,
            TransactionStatus::PendingDeposit,
            &mut |tx| {
                tx.status = TransactionStatus::DepositConfirmed;
                tx.deposited_amount = Some(request.amount);
                tx.deposit_tx_hash = Some(tx_hash.clone());
            },
        )
        .map_err(map_transition_error)?;

    enqueue_webhook(&state, &partner, WebhookEventType::DepositDetected, &confirmed);
    tracing::info!(
        transaction_id = %confirmed.transaction_id,
        amount = %request.amount,
        "deposit confirmed"
    );

    Ok(Json(view(confirmed, now)))
}

/// Settle the INR payout for a deposit-confirmed transaction.
#[utoipa::path(
    post,
    path = "/v1/payout/initiate",
    tag = "Transactions",
    request_body = InitiatePayoutRequest,
    responses(
        (status = 200, description = "Payout settled", body = PayoutResponse),
        (status = 404, description = "Unknown transaction"),
        (status = 409, description = "Transaction is not deposit-confirmed")
    ),
    security(("api_key" = []))
)]
pub async fn initiate_payout(
    Auth(partner): Auth,
    State(state): State<AppState>,
    Json(request): Json<InitiatePayoutRequest>,
) -> Result<Json<PayoutResponse>, ApiError> {
    let transaction = load_owned_transaction(&state, &partner, &request.transaction_id)?;
    if transaction.status != TransactionStatus::DepositConfirmed {
        return Err(ApiError::state_conflict(format!(
            "payout requires a deposit-confirmed transaction; current status is {:?}",
            transaction.status
        )));
    }

    let quote = state
        .store
        .quote(&transaction.quote_reference)
        .map_err(|e| ApiError::internal(format!("quote lookup failed for payout: {e}")))?;
    let payout_amount = quote.estimated_inr;

    // Two-step settle; the first CAS is the concurrency gate.
    state
        .store
        .transition_transaction(
            &request.transaction_id,
            TransactionStatus::DepositConfirmed,
            &mut |tx| tx.status = TransactionStatus::Processing,
        )
        .map_err(map_transition_error)?;

    let now = Utc::now();
    let utr = generate_utr(now);
    let completed = state
        .store
        .transition_transaction(
            &request.transaction_id,
            TransactionStatus::Processing,
            &mut |tx| {
                tx.status = TransactionStatus::Completed;
                tx.payout_amount = Some(payout_amount);
                tx.payout_utr = Some(utr.clone());
                tx.completed_at = Some(now);
            },
        )
        .map_err(map_transition_error)?;

    enqueue_webhook(&state, &partner, WebhookEventType::PayoutSettled, &completed);
    tracing::info!(
        transaction_id = %completed.transaction_id,
        utr = %utr,
        channel = request.channel.as_deref().unwrap_or("imps"),
        "payout settled"
    );

    Ok(Json(PayoutResponse {
        transaction_id: completed.transaction_id,
        status: completed.status,
        utr,
        payout_amount_inr: payout_amount,
        completed_at: now,
    }))
}

fn map_transition_error(err: StorageError) -> ApiError {
    match err {
        StorageError::Conflict { .. } => {
            ApiError::state_conflict("transaction state changed concurrently; re-read and retry")
        }
        StorageError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
        other => ApiError::internal(format!("transaction transition failed: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Asset, KycSession, KycStatus, Partner, Quote, Session, WebhookDeliveryStatus,
    };
    use chrono::Duration;
    use std::str::FromStr;

    fn dec(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    struct Fixture {
        state: AppState,
        partner: Partner,
        session: Session,
        quote_reference: String,
        kyc_session_id: String,
    }

    fn fixture() -> Fixture {
        let state = AppState::for_tests();
        let partner = Partner::new(
            "key_live_test".into(),
            "https://partner.example/hook".into(),
            "whsec_test".into(),
        );
        state.store.insert_partner(partner.clone()).unwrap();

        let session = Session::new(partner.partner_id.clone(), None);
        state.store.insert_session(session.clone()).unwrap();

        let now = Utc::now();
        let quote = Quote {
            quote_reference: "qt_fix".into(),
            session_id: session.session_id.clone(),
            asset: Asset::Usdc,
            network: "polygon".into(),
            amount_usd: dec("100"),
            fx_rate: dec("83.65"),
            gross_inr: dec("8365.00"),
            platform_fee: dec("58.555"),
            gst_amount: dec("10.5399"),
            tds_amount: dec("83.65"),
            estimated_inr: dec("8212.2551"),
            deposit_address: "0xdeposit".into(),
            min_confirmations: 12,
            status: QuoteStatus::Active,
            created_at: now,
            expires_at: now + Quote::expiry_window(),
        };
        state.store.insert_quote(quote.clone()).unwrap();

        let mut kyc = KycSession::new(
            session.session_id.clone(),
            partner.partner_id.clone(),
            "user_1".into(),
            "aadhaar".into(),
            "999912345678".into(),
            "Ravi Kumar".into(),
        );
        kyc.status = KycStatus::Completed;
        let kyc_session_id = kyc.kyc_session_id.clone();
        state.store.insert_kyc_session(kyc).unwrap();

        Fixture {
            state,
            partner,
            session,
            quote_reference: quote.quote_reference,
            kyc_session_id,
        }
    }

    async fn created(f: &Fixture) -> TransactionResponse {
        create_transaction(
            Auth(f.partner.clone()),
            State(f.state.clone()),
            Json(CreateTransactionRequest {
                session_id: f.session.session_id.clone(),
                quote_reference: f.quote_reference.clone(),
                kyc_session_id: f.kyc_session_id.clone(),
            }),
        )
        .await
        .unwrap()
        .0
    }

    #[tokio::test]
    async fn creation_consumes_the_quote() {
        let f = fixture();
        let response = created(&f).await;
        assert_eq!(response.status, TransactionStatus::PendingDeposit);
        assert_eq!(response.deposit_address, "0xdeposit");
        assert_eq!(
            f.state.store.quote(&f.quote_reference).unwrap().status,
            QuoteStatus::Used
        );
    }

    #[tokio::test]
    async fn second_creation_against_the_same_quote_conflicts() {
        let f = fixture();
        created(&f).await;
        let err = create_transaction(
            Auth(f.partner.clone()),
            State(f.state.clone()),
            Json(CreateTransactionRequest {
                session_id: f.session.session_id.clone(),
                quote_reference: f.quote_reference.clone(),
                kyc_session_id: f.kyc_session_id.clone(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, "state_conflict");
    }

    #[tokio::test]
    async fn sixteen_minute_old_quote_is_a_state_conflict() {
        let f = fixture();
        let mut stale = f.state.store.quote(&f.quote_reference).unwrap();
        stale.quote_reference = "qt_stale".into();
        stale.created_at = Utc::now() - Duration::minutes(16);
        stale.expires_at = Utc::now() - Duration::minutes(1);
        f.state.store.insert_quote(stale).unwrap();

        let err = create_transaction(
            Auth(f.partner.clone()),
            State(f.state.clone()),
            Json(CreateTransactionRequest {
                session_id: f.session.session_id.clone(),
                quote_reference: "qt_stale".into(),
                kyc_session_id: f.kyc_session_id.clone(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, "state_conflict");
        assert!(err.message.contains("expired"));
    }

    #[tokio::test]
    async fn incomplete_kyc_is_a_state_conflict_with_details() {
        let f = fixture();
        f.state
            .store
            .update_kyc_session(&f.kyc_session_id, &mut |kyc| {
                kyc.status = KycStatus::InProgress;
            })
            .unwrap();

        let err = create_transaction(
            Auth(f.partner.clone()),
            State(f.state.clone()),
            Json(CreateTransactionRequest {
                session_id: f.session.session_id.clone(),
                quote_reference: f.quote_reference.clone(),
                kyc_session_id: f.kyc_session_id.clone(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, "state_conflict");
        assert!(err.details.is_some());
    }

    #[tokio::test]
    async fn deposit_within_tolerance_confirms_and_enqueues_webhook() {
        let f = fixture();
        let tx = created(&f).await;

        let response = simulate_deposit(
            Auth(f.partner.clone()),
            State(f.state.clone()),
            Json(SimulateDepositRequest {
                transaction_id: tx.transaction_id.clone(),
                amount: dec("100.3"),
                tx_hash: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.status, TransactionStatus::DepositConfirmed);
        assert_eq!(response.deposited_amount, Some(dec("100.3")));

        let due = f.state.store.due_webhook_events(Utc::now()).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].event_type, WebhookEventType::DepositDetected);
        assert_eq!(due[0].status, WebhookDeliveryStatus::Pending);
    }

    #[tokio::test]
    async fn mismatched_deposit_fails_the_transaction() {
        let f = fixture();
        let tx = created(&f).await;

        let err = simulate_deposit(
            Auth(f.partner.clone()),
            State(f.state.clone()),
            Json(SimulateDepositRequest {
                transaction_id: tx.transaction_id.clone(),
                amount: dec("90"),
                tx_hash: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, "state_conflict");
        assert_eq!(err.details.as_ref().unwrap()["failure_reason"], "mismatched_amount");

        let stored = f.state.store.transaction(&tx.transaction_id).unwrap();
        assert_eq!(stored.status, TransactionStatus::Failed);
        assert_eq!(stored.failure_reason.as_deref(), Some("mismatched_amount"));
        // No webhook for a failed reconciliation.
        assert!(f.state.store.due_webhook_events(Utc::now()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_deposit_report_is_rejected_not_double_counted() {
        let f = fixture();
        let tx = created(&f).await;
        let deposit = |amount: &str| {
            simulate_deposit(
                Auth(f.partner.clone()),
                State(f.state.clone()),
                Json(SimulateDepositRequest {
                    transaction_id: tx.transaction_id.clone(),
                    amount: dec(amount),
                    tx_hash: None,
                }),
            )
        };

        deposit("100").await.unwrap();
        let err = deposit("100").await.unwrap_err();
        assert_eq!(err.code, "state_conflict");
        assert_eq!(
            f.state
                .store
                .transaction(&tx.transaction_id)
                .unwrap()
                .deposited_amount,
            Some(dec("100"))
        );
    }

    #[tokio::test]
    async fn payout_before_deposit_is_a_state_conflict() {
        let f = fixture();
        let tx = created(&f).await;

        let err = initiate_payout(
            Auth(f.partner.clone()),
            State(f.state.clone()),
            Json(InitiatePayoutRequest {
                transaction_id: tx.transaction_id,
                channel: None,
                destination: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, "state_conflict");
    }

    #[tokio::test]
    async fn payout_settles_with_utr_and_webhook() {
        let f = fixture();
        let tx = created(&f).await;
        simulate_deposit(
            Auth(f.partner.clone()),
            State(f.state.clone()),
            Json(SimulateDepositRequest {
                transaction_id: tx.transaction_id.clone(),
                amount: dec("100"),
                tx_hash: Some("0xhash".into()),
            }),
        )
        .await
        .unwrap();

        let response = initiate_payout(
            Auth(f.partner.clone()),
            State(f.state.clone()),
            Json(InitiatePayoutRequest {
                transaction_id: tx.transaction_id.clone(),
                channel: Some("imps".into()),
                destination: Some("ravi@upi".into()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.status, TransactionStatus::Completed);
        assert!(response.utr.starts_with("UTR"));
        assert_eq!(response.payout_amount_inr, dec("8212.2551"));

        let events = f.state.store.due_webhook_events(Utc::now()).unwrap();
        let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert!(types.contains(&WebhookEventType::PayoutSettled));
    }

    #[tokio::test]
    async fn expired_transaction_reads_as_expired() {
        let f = fixture();
        let tx = created(&f).await;
        // Force the deposit window into the past, keeping the status.
        f.state
            .store
            .transition_transaction(
                &tx.transaction_id,
                TransactionStatus::PendingDeposit,
                &mut |t| t.expires_at = Utc::now() - Duration::minutes(1),
            )
            .unwrap();

        let view = get_transaction(
            Auth(f.partner.clone()),
            State(f.state.clone()),
            Path(tx.transaction_id.clone()),
        )
        .await
        .unwrap();
        assert_eq!(view.status, TransactionStatus::Expired);

        let err = simulate_deposit(
            Auth(f.partner.clone()),
            State(f.state.clone()),
            Json(SimulateDepositRequest {
                transaction_id: tx.transaction_id,
                amount: dec("100"),
                tx_hash: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, "state_conflict");
        assert!(err.message.contains("expired"));
    }
}
