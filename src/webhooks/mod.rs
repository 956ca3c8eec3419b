// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! # Webhook Delivery
//!
//! Outbound partner notifications for `deposit.detected` and
//! `payout.settled`. Events are written to storage first and delivered by a
//! background poller, so a crash between state transition and delivery
//! loses nothing. Each POST carries an HMAC-SHA256 signature over the
//! canonical JSON body.

pub mod dispatcher;
pub mod poller;
pub mod signer;

pub use dispatcher::WebhookDispatcher;
pub use poller::spawn_webhook_poller;

use chrono::Utc;
use serde_json::json;

use crate::models::{Transaction, WebhookEvent, WebhookEventType};

/// Build the canonical event payload for a transaction status change.
pub fn event_payload(event_type: WebhookEventType, transaction: &Transaction) -> serde_json::Value {
    let mut body = json!({
        "event": event_type.name(),
        "transaction_id": transaction.transaction_id,
        "session_id": transaction.session_id,
        "quote_reference": transaction.quote_reference,
        "status": transaction.status,
        "timestamp": Utc::now().to_rfc3339(),
    });

    let fields = body.as_object_mut().expect("payload is an object");
    match event_type {
        WebhookEventType::DepositDetected => {
            if let Some(amount) = transaction.deposited_amount {
                fields.insert("deposited_amount".into(), json!(amount));
            }
            if let Some(hash) = &transaction.deposit_tx_hash {
                fields.insert("deposit_tx_hash".into(), json!(hash));
            }
        }
        WebhookEventType::PayoutSettled => {
            if let Some(amount) = transaction.payout_amount {
                fields.insert("payout_amount_inr".into(), json!(amount));
            }
            if let Some(utr) = &transaction.payout_utr {
                fields.insert("utr".into(), json!(utr));
            }
        }
    }

    body
}

/// Create a delivery-ready event for a transaction, addressed to the
/// partner's webhook URL.
pub fn transaction_event(
    event_type: WebhookEventType,
    transaction: &Transaction,
    partner_id: String,
    webhook_url: String,
    max_attempts: u32,
) -> WebhookEvent {
    WebhookEvent::new(
        event_type,
        partner_id,
        webhook_url,
        event_payload(event_type, transaction),
        max_attempts,
    )
}
