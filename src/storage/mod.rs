// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! # Gateway Storage
//!
//! One explicit trait over all persisted entities, with the backend chosen
//! at startup: [`MemoryStore`] for tests and ephemeral deployments,
//! [`FileStore`] for durable JSON documents under a data directory.
//! Business logic never branches on backend identity.
//!
//! Two operations carry the concurrency contract:
//! - [`GatewayStore::transition_transaction`] is a compare-and-swap on the
//!   expected current status, so simultaneous double-transitions (e.g. two
//!   deposit-detection calls) lose deterministically;
//! - [`GatewayStore::update_kyc_session`] is a read-modify-write under the
//!   store lock, so concurrent updates to different verification flags
//!   merge field-by-field instead of clobbering whole records.

pub mod file;
pub mod memory;

pub use file::{FileStore, StorePaths};
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};

use crate::models::{
    KycSession, Partner, Quote, QuoteStatus, Session, Transaction, TransactionStatus, WebhookEvent,
};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A compare-and-swap precondition no longer holds.
    #[error("state conflict on {entity}: expected {expected}, found {actual}")]
    Conflict {
        entity: String,
        expected: String,
        actual: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

pub trait GatewayStore: Send + Sync {
    // ========== Partners ==========
    fn insert_partner(&self, partner: Partner) -> StorageResult<()>;
    fn partner(&self, partner_id: &str) -> StorageResult<Partner>;
    fn partner_by_api_key(&self, api_key: &str) -> StorageResult<Partner>;

    // ========== Sessions ==========
    fn insert_session(&self, session: Session) -> StorageResult<()>;
    fn session(&self, session_id: &str) -> StorageResult<Session>;

    // ========== Quotes ==========
    fn insert_quote(&self, quote: Quote) -> StorageResult<()>;
    fn quote(&self, quote_reference: &str) -> StorageResult<Quote>;
    /// Compare-and-swap on quote status (e.g. `active → used` at
    /// transaction creation). Fails with `Conflict` when the stored status
    /// no longer matches `expected`.
    fn set_quote_status(
        &self,
        quote_reference: &str,
        expected: QuoteStatus,
        next: QuoteStatus,
    ) -> StorageResult<Quote>;

    // ========== KYC Sessions ==========
    fn insert_kyc_session(&self, kyc: KycSession) -> StorageResult<()>;
    fn kyc_session(&self, kyc_session_id: &str) -> StorageResult<KycSession>;
    /// Read-modify-write under the store lock; `mutate` sees the freshest
    /// record so per-method updates merge instead of overwriting.
    fn update_kyc_session(
        &self,
        kyc_session_id: &str,
        mutate: &mut dyn FnMut(&mut KycSession),
    ) -> StorageResult<KycSession>;

    // ========== Transactions ==========
    fn insert_transaction(&self, transaction: Transaction) -> StorageResult<()>;
    fn transaction(&self, transaction_id: &str) -> StorageResult<Transaction>;
    /// Compare-and-swap: applies `mutate` (which must set the new status)
    /// only while the stored status equals `expected`.
    fn transition_transaction(
        &self,
        transaction_id: &str,
        expected: TransactionStatus,
        mutate: &mut dyn FnMut(&mut Transaction),
    ) -> StorageResult<Transaction>;

    // ========== Webhook Events ==========
    fn insert_webhook_event(&self, event: WebhookEvent) -> StorageResult<()>;
    fn webhook_event(&self, event_id: &str) -> StorageResult<WebhookEvent>;
    /// Events in `pending`/`retrying` whose `next_retry_at` is due.
    fn due_webhook_events(&self, now: DateTime<Utc>) -> StorageResult<Vec<WebhookEvent>>;
    fn update_webhook_event(&self, event: &WebhookEvent) -> StorageResult<()>;
}

#[cfg(test)]
pub(crate) mod contract_tests {
    //! Behavioural checks run against every backend.

    use super::*;
    use crate::models::{Asset, WebhookDeliveryStatus, WebhookEventType};
    use chrono::Duration;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    pub fn sample_quote(session_id: &str) -> Quote {
        let now = Utc::now();
        Quote {
            quote_reference: format!("qt_{}", uuid::Uuid::new_v4().simple()),
            session_id: session_id.to_string(),
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
        }
    }

    pub fn sample_transaction(session_id: &str, quote_reference: &str) -> Transaction {
        Transaction::new(
            session_id.to_string(),
            quote_reference.to_string(),
            "kyc_1".into(),
            "user_1".into(),
            "0xdeposit".into(),
            dec("100"),
        )
    }

    pub fn run_all(store: &dyn GatewayStore) {
        partner_round_trip(store);
        quote_cas(store);
        transaction_cas_rejects_stale_transition(store);
        kyc_update_merges_fields(store);
        webhook_due_query(store);
    }

    fn partner_round_trip(store: &dyn GatewayStore) {
        let partner = Partner::new(
            "key_live_1".into(),
            "https://partner.example/hook".into(),
            "whsec_1".into(),
        );
        let id = partner.partner_id.clone();
        store.insert_partner(partner).unwrap();

        assert_eq!(store.partner(&id).unwrap().partner_id, id);
        assert_eq!(
            store.partner_by_api_key("key_live_1").unwrap().partner_id,
            id
        );
        assert!(matches!(
            store.partner_by_api_key("unknown"),
            Err(StorageError::NotFound(_))
        ));
    }

    fn quote_cas(store: &dyn GatewayStore) {
        let session = Session::new("ptn_1".into(), None);
        store.insert_session(session.clone()).unwrap();
        let quote = sample_quote(&session.session_id);
        let reference = quote.quote_reference.clone();
        store.insert_quote(quote).unwrap();

        let used = store
            .set_quote_status(&reference, QuoteStatus::Active, QuoteStatus::Used)
            .unwrap();
        assert_eq!(used.status, QuoteStatus::Used);

        // Second consume attempt fails: precondition no longer holds.
        assert!(matches!(
            store.set_quote_status(&reference, QuoteStatus::Active, QuoteStatus::Used),
            Err(StorageError::Conflict { .. })
        ));
    }

    fn transaction_cas_rejects_stale_transition(store: &dyn GatewayStore) {
        let tx = sample_transaction("ses_cas", "qt_cas");
        let id = tx.transaction_id.clone();
        store.insert_transaction(tx).unwrap();

        let confirmed = store
            .transition_transaction(&id, TransactionStatus::PendingDeposit, &mut |tx| {
                tx.status = TransactionStatus::DepositConfirmed;
                tx.deposited_amount = Some(dec("100"));
            })
            .unwrap();
        assert_eq!(confirmed.status, TransactionStatus::DepositConfirmed);

        // A second deposit-detection call expecting pending_deposit loses.
        let err = store
            .transition_transaction(&id, TransactionStatus::PendingDeposit, &mut |tx| {
                tx.status = TransactionStatus::DepositConfirmed;
                tx.deposited_amount = Some(dec("200"));
            })
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));

        // The first write was not double-counted.
        assert_eq!(
            store.transaction(&id).unwrap().deposited_amount,
            Some(dec("100"))
        );
    }

    fn kyc_update_merges_fields(store: &dyn GatewayStore) {
        let kyc = KycSession::new(
            "ses_1".into(),
            "ptn_1".into(),
            "user_1".into(),
            "aadhaar".into(),
            "999912345678".into(),
            "Ravi Kumar".into(),
        );
        let id = kyc.kyc_session_id.clone();
        store.insert_kyc_session(kyc).unwrap();

        store
            .update_kyc_session(&id, &mut |kyc| {
                kyc.aadhaar_verified = true;
                kyc.aadhaar_name = Some("RAVI KUMAR".into());
            })
            .unwrap();
        let after = store
            .update_kyc_session(&id, &mut |kyc| {
                kyc.pan_verified = true;
                kyc.pan_name = Some("RAVI KUMAR".into());
            })
            .unwrap();

        // Both updates landed; the second did not clobber the first.
        assert!(after.aadhaar_verified);
        assert!(after.pan_verified);
        assert_eq!(after.aadhaar_name.as_deref(), Some("RAVI KUMAR"));
    }

    fn webhook_due_query(store: &dyn GatewayStore) {
        let now = Utc::now();

        let mut due = WebhookEvent::new(
            WebhookEventType::DepositDetected,
            "ptn_1".into(),
            "https://partner.example/hook".into(),
            serde_json::json!({"event": "deposit.detected"}),
            5,
        );
        due.next_retry_at = Some(now);
        let due_id = due.event_id.clone();

        let mut future = WebhookEvent::new(
            WebhookEventType::PayoutSettled,
            "ptn_1".into(),
            "https://partner.example/hook".into(),
            serde_json::json!({"event": "payout.settled"}),
            5,
        );
        future.next_retry_at = Some(now + Duration::minutes(10));

        let mut delivered = WebhookEvent::new(
            WebhookEventType::PayoutSettled,
            "ptn_1".into(),
            "https://partner.example/hook".into(),
            serde_json::json!({"event": "payout.settled"}),
            5,
        );
        delivered.status = WebhookDeliveryStatus::Delivered;
        delivered.next_retry_at = None;

        store.insert_webhook_event(due).unwrap();
        store.insert_webhook_event(future).unwrap();
        store.insert_webhook_event(delivered).unwrap();

        let due_now = store.due_webhook_events(now).unwrap();
        let ids: Vec<&str> = due_now.iter().map(|e| e.event_id.as_str()).collect();
        assert!(ids.contains(&due_id.as_str()));
        assert_eq!(due_now.len(), 1);

        // Mark delivered and verify it drops out of the due set.
        let mut event = store.webhook_event(&due_id).unwrap();
        event.status = WebhookDeliveryStatus::Delivered;
        event.next_retry_at = None;
        store.update_webhook_event(&event).unwrap();
        assert!(store.due_webhook_events(now).unwrap().is_empty());
    }
}
