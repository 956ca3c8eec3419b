// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! # KYC Session State Machine
//!
//! `initiated → in_progress → completed`, with `failed` reachable from any
//! non-terminal state. Verification flags are monotonic: a successful
//! gateway call is the only way a flag becomes true, and no later update
//! may flip it back.
//!
//! Completion is a pure predicate over the flags — the configured required
//! set must be a subset of the verified set — re-evaluated after every
//! update. No single method is privileged.

use std::collections::BTreeSet;

use chrono::Utc;
use serde_json::Value;

use crate::models::{KycMethod, KycSession, KycStatus};

/// Rejected attempts allowed before the session fails outright.
pub const MAX_REJECTED_ATTEMPTS: u32 = 5;

/// Field-level update produced by one successful verification call.
///
/// Carries only the fields of its own method so concurrent updates to
/// different methods merge instead of clobbering each other.
#[derive(Debug, Clone)]
pub struct KycFieldUpdate {
    pub method: KycMethod,
    pub verified_name: Option<String>,
    pub raw: Option<Value>,
}

/// Whether the required method set is satisfied by the session's flags.
pub fn completion_satisfied(session: &KycSession, required: &BTreeSet<KycMethod>) -> bool {
    required.iter().all(|method| session.is_verified(*method))
}

/// Record that a verification attempt happened, whatever its outcome.
/// The first attempt of any kind moves `initiated → in_progress`.
pub fn note_attempt(session: &mut KycSession) {
    if session.status == KycStatus::Initiated {
        session.status = KycStatus::InProgress;
        session.updated_at = Utc::now();
    }
}

/// Record a rejected verification attempt. Counts against
/// [`MAX_REJECTED_ATTEMPTS`]; reaching the limit fails the session, after
/// which no further verification is accepted.
pub fn note_rejection(session: &mut KycSession) {
    note_attempt(session);
    session.rejection_count += 1;
    session.updated_at = Utc::now();
    if session.rejection_count >= MAX_REJECTED_ATTEMPTS {
        mark_failed(session);
    }
}

/// Apply one successful verification to the session.
///
/// Sets the method's flag (idempotent re-confirmation of its own field is
/// allowed; unrelated flags are untouched), records the provider name, and
/// re-evaluates completion against `required`. Returns `true` when this
/// update newly completed the session.
pub fn apply_success(
    session: &mut KycSession,
    update: KycFieldUpdate,
    required: &BTreeSet<KycMethod>,
) -> bool {
    debug_assert!(
        session.status != KycStatus::Failed,
        "updates must not land on failed sessions"
    );

    note_attempt(session);

    match update.method {
        KycMethod::Aadhaar => {
            session.aadhaar_verified = true;
            if update.verified_name.is_some() {
                session.aadhaar_name = update.verified_name.clone();
            }
        }
        KycMethod::Pan => {
            session.pan_verified = true;
            if update.verified_name.is_some() {
                session.pan_name = update.verified_name.clone();
            }
        }
        KycMethod::Face => {
            session.face_verified = true;
        }
        KycMethod::Upi => {
            session.upi_verified = true;
            if update.verified_name.is_some() {
                session.upi_name = update.verified_name.clone();
            }
        }
        KycMethod::Bank => {
            session.bank_verified = true;
            if update.verified_name.is_some() {
                session.bank_name = update.verified_name.clone();
            }
        }
        KycMethod::NameMatch => {
            session.name_match_verified = true;
        }
    }

    if session.verified_name.is_none() {
        session.verified_name = update.verified_name.clone();
    }

    if let Some(raw) = update.raw {
        session
            .verification_data
            .insert(update.method.tag().to_string(), raw);
    }

    let was_completed = session.status == KycStatus::Completed;
    if completion_satisfied(session, required) {
        session.status = KycStatus::Completed;
    }
    session.updated_at = Utc::now();

    session.status == KycStatus::Completed && !was_completed
}

/// Move the session to `failed` from any non-terminal state.
pub fn mark_failed(session: &mut KycSession) {
    if matches!(session.status, KycStatus::Initiated | KycStatus::InProgress) {
        session.status = KycStatus::Failed;
        session.updated_at = Utc::now();
    }
}
