// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! # Transaction Lifecycle
//!
//! `pending_deposit → deposit_confirmed → processing → completed`, with
//! `expired` only from `pending_deposit` after the deposit window, and
//! `failed` from any non-terminal state (cancellation, amount mismatch).
//!
//! Creation is guarded against the session, quote and KYC session it
//! references; each guard failure carries its specific reason so partners
//! can react correctly. Status transitions themselves are enforced by the
//! storage layer's compare-and-swap; this module owns the legality table
//! and the reconciliation policy.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{
    KycSession, KycStatus, Quote, QuoteStatus, Session, SessionStatus, TransactionStatus,
};

/// Specific reason a transaction could not be created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CreationDenied {
    #[error("session is not active (status: {0:?})")]
    SessionInactive(SessionStatus),

    #[error("quote has expired")]
    QuoteExpired,

    #[error("quote has already been used by another transaction")]
    QuoteUsed,

    #[error("KYC session is not completed (status: {0:?})")]
    KycIncomplete(KycStatus),
}

/// Check every creation precondition, reporting the first violation.
pub fn check_creation(
    session: &Session,
    quote: &Quote,
    kyc: &KycSession,
    now: DateTime<Utc>,
) -> Result<(), CreationDenied> {
    let session_status = session.effective_status(now);
    if session_status != SessionStatus::Active {
        return Err(CreationDenied::SessionInactive(session_status));
    }

    match quote.effective_status(now) {
        QuoteStatus::Active => {}
        QuoteStatus::Expired => return Err(CreationDenied::QuoteExpired),
        QuoteStatus::Used => return Err(CreationDenied::QuoteUsed),
    }

    if kyc.status != KycStatus::Completed {
        return Err(CreationDenied::KycIncomplete(kyc.status));
    }

    Ok(())
}

/// Legal forward transitions. Anything else is a state conflict.
pub fn can_transition(from: TransactionStatus, to: TransactionStatus) -> bool {
    use TransactionStatus::*;
    matches!(
        (from, to),
        (PendingDeposit, DepositConfirmed)
            | (DepositConfirmed, Processing)
            | (Processing, Completed)
            | (PendingDeposit, Expired)
            | (PendingDeposit, Failed)
            | (DepositConfirmed, Failed)
            | (Processing, Failed)
    )
}

/// Whether a reported deposit reconciles against the quoted amount within
/// `tolerance_bps` basis points. A breach takes the `mismatched_amount`
/// failure path instead of being accepted.
pub fn deposit_within_tolerance(
    expected: Decimal,
    deposited: Decimal,
    tolerance_bps: u32,
) -> bool {
    if deposited <= Decimal::ZERO {
        return false;
    }
    let tolerance = expected * Decimal::from(tolerance_bps) / Decimal::from(10_000u32);
    let deviation = (deposited - expected).abs();
    deviation <= tolerance
}

/// Bank-style settlement reference for a completed payout.
pub fn generate_utr(now: DateTime<Utc>) -> String {
    let serial = uuid::Uuid::new_v4().as_u128() % 1_000_000_000_000;
    format!("UTR{}{:012}", now.format("%Y%m%d"), serial)
}
