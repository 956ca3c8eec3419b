// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! # Domain Models
//!
//! Core entities of the off-ramp flow. Ownership runs partner → session →
//! (quotes, KYC sessions, transactions) by string ID; every entity is
//! independently addressable in storage by its own key.
//!
//! Request/response DTOs live next to their handlers under `api/`.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{QUOTE_TTL_MINUTES, SESSION_TTL_MINUTES, TRANSACTION_TTL_MINUTES};

// =============================================================================
// Partner
// =============================================================================

/// Partner account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PartnerStatus {
    Active,
    Suspended,
}

/// A regulated fintech partner onboarded to the gateway.
///
/// Immutable after onboarding except `status` and `webhook_url`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Partner {
    pub partner_id: String,
    /// Bearer credential presented on every API call.
    pub api_key: String,
    /// Callback URL for `deposit.detected` / `payout.settled` events.
    pub webhook_url: String,
    /// Shared secret for webhook HMAC signatures.
    pub webhook_secret: String,
    pub status: PartnerStatus,
}

impl Partner {
    pub fn new(api_key: String, webhook_url: String, webhook_secret: String) -> Self {
        Self {
            partner_id: format!("ptn_{}", Uuid::new_v4()),
            api_key,
            webhook_url,
            webhook_secret,
            status: PartnerStatus::Active,
        }
    }
}

// =============================================================================
// Session
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Expired,
}

/// One off-ramp flow attempt. Gates quote, KYC and transaction creation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Session {
    pub session_id: String,
    pub partner_id: String,
    /// Short-lived token returned to the partner at creation.
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(partner_id: String, callback_url: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: format!("ses_{}", Uuid::new_v4()),
            partner_id,
            token: format!("tok_{}", Uuid::new_v4().simple()),
            callback_url,
            status: SessionStatus::Active,
            created_at: now,
            expires_at: now + Duration::minutes(SESSION_TTL_MINUTES),
        }
    }

    /// Effective status with lazy expiry: a session past `expires_at` is
    /// expired even if no background job flipped the stored value.
    pub fn effective_status(&self, now: DateTime<Utc>) -> SessionStatus {
        if self.status == SessionStatus::Active && now > self.expires_at {
            SessionStatus::Expired
        } else {
            self.status
        }
    }
}

// =============================================================================
// Quote
// =============================================================================

/// Stablecoin asset accepted for deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Asset {
    #[serde(rename = "USDC")]
    Usdc,
    #[serde(rename = "USDT")]
    Usdt,
}

impl Asset {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol.trim().to_ascii_uppercase().as_str() {
            "USDC" => Some(Asset::Usdc),
            "USDT" => Some(Asset::Usdt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Active,
    Expired,
    Used,
}

/// A priced conversion offer. Financial fields are immutable once created;
/// only `status` may change.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Quote {
    pub quote_reference: String,
    pub session_id: String,
    pub asset: Asset,
    pub network: String,
    #[schema(value_type = String)]
    pub amount_usd: Decimal,
    #[schema(value_type = String)]
    pub fx_rate: Decimal,
    #[schema(value_type = String)]
    pub gross_inr: Decimal,
    /// Platform commission (0.7% of gross).
    #[schema(value_type = String)]
    pub platform_fee: Decimal,
    /// GST levied on the platform fee, not on gross.
    #[schema(value_type = String)]
    pub gst_amount: Decimal,
    /// 1% TDS withheld on gross.
    #[schema(value_type = String)]
    pub tds_amount: Decimal,
    /// Net INR the user receives.
    #[schema(value_type = String)]
    pub estimated_inr: Decimal,
    pub deposit_address: String,
    pub min_confirmations: u32,
    pub status: QuoteStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Quote {
    pub fn effective_status(&self, now: DateTime<Utc>) -> QuoteStatus {
        if self.status == QuoteStatus::Active && now > self.expires_at {
            QuoteStatus::Expired
        } else {
            self.status
        }
    }

    pub fn expiry_window() -> Duration {
        Duration::minutes(QUOTE_TTL_MINUTES)
    }
}

// =============================================================================
// KYC Session
// =============================================================================

/// Independent verification methods tracked per KYC session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum KycMethod {
    Aadhaar,
    Pan,
    Face,
    Upi,
    Bank,
    NameMatch,
}

impl KycMethod {
    pub const ALL: [KycMethod; 6] = [
        KycMethod::Aadhaar,
        KycMethod::Pan,
        KycMethod::Face,
        KycMethod::Upi,
        KycMethod::Bank,
        KycMethod::NameMatch,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            KycMethod::Aadhaar => "aadhaar",
            KycMethod::Pan => "pan",
            KycMethod::Face => "face",
            KycMethod::Upi => "upi",
            KycMethod::Bank => "bank",
            KycMethod::NameMatch => "name_match",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "aadhaar" => Some(KycMethod::Aadhaar),
            "pan" => Some(KycMethod::Pan),
            "face" => Some(KycMethod::Face),
            "upi" => Some(KycMethod::Upi),
            "bank" => Some(KycMethod::Bank),
            "name_match" => Some(KycMethod::NameMatch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    Initiated,
    InProgress,
    Completed,
    Failed,
}

/// Per-user verification progress across the six methods.
///
/// Flags only ever move false→true; a method's verified name is recorded
/// alongside its flag. Overall status is derived from the configured
/// required-method set, never from a single hard-coded method.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KycSession {
    pub kyc_session_id: String,
    pub session_id: String,
    pub partner_id: String,
    pub user_id: String,
    pub document_type: String,
    pub document_number: String,
    pub holder_name: String,
    pub status: KycStatus,
    /// Rejected verification attempts so far. The session fails once this
    /// crosses the configured limit.
    #[serde(default)]
    pub rejection_count: u32,
    pub aadhaar_verified: bool,
    pub pan_verified: bool,
    pub face_verified: bool,
    pub upi_verified: bool,
    pub bank_verified: bool,
    pub name_match_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aadhaar_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pan_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upi_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    /// Consolidated provider-reported name once any method has verified one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_name: Option<String>,
    /// Raw provider payloads keyed by method tag.
    #[serde(default)]
    pub verification_data: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KycSession {
    pub fn new(
        session_id: String,
        partner_id: String,
        user_id: String,
        document_type: String,
        document_number: String,
        holder_name: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            kyc_session_id: format!("kyc_{}", Uuid::new_v4()),
            session_id,
            partner_id,
            user_id,
            document_type,
            document_number,
            holder_name,
            status: KycStatus::Initiated,
            rejection_count: 0,
            aadhaar_verified: false,
            pan_verified: false,
            face_verified: false,
            upi_verified: false,
            bank_verified: false,
            name_match_verified: false,
            aadhaar_name: None,
            pan_name: None,
            upi_name: None,
            bank_name: None,
            verified_name: None,
            verification_data: serde_json::Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_verified(&self, method: KycMethod) -> bool {
        match method {
            KycMethod::Aadhaar => self.aadhaar_verified,
            KycMethod::Pan => self.pan_verified,
            KycMethod::Face => self.face_verified,
            KycMethod::Upi => self.upi_verified,
            KycMethod::Bank => self.bank_verified,
            KycMethod::NameMatch => self.name_match_verified,
        }
    }

    /// Methods currently verified, in declaration order.
    pub fn verified_methods(&self) -> Vec<KycMethod> {
        KycMethod::ALL
            .into_iter()
            .filter(|method| self.is_verified(*method))
            .collect()
    }
}

// =============================================================================
// Transaction
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    PendingDeposit,
    DepositConfirmed,
    Processing,
    Completed,
    Failed,
    Expired,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Completed | TransactionStatus::Failed | TransactionStatus::Expired
        )
    }
}

/// A deposit→payout pipeline tied to one quote and one KYC session.
///
/// Status only moves forward; `failed` is reachable from any non-terminal
/// state on cancellation or amount mismatch.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    pub transaction_id: String,
    pub session_id: String,
    pub quote_reference: String,
    pub kyc_session_id: String,
    pub user_id: String,
    pub status: TransactionStatus,
    pub deposit_address: String,
    /// USD amount the quote was priced for.
    #[schema(value_type = String)]
    pub expected_amount: Decimal,
    #[schema(value_type = String)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposited_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_tx_hash: Option<String>,
    #[schema(value_type = String)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout_amount: Option<Decimal>,
    /// Bank settlement reference (UTR) once the payout settles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout_utr: Option<String>,
    /// Populated when a transaction fails (cancellation, amount mismatch).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        session_id: String,
        quote_reference: String,
        kyc_session_id: String,
        user_id: String,
        deposit_address: String,
        expected_amount: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            transaction_id: format!("txn_{}", Uuid::new_v4()),
            session_id,
            quote_reference,
            kyc_session_id,
            user_id,
            status: TransactionStatus::PendingDeposit,
            deposit_address,
            expected_amount,
            deposited_amount: None,
            deposit_tx_hash: None,
            payout_amount: None,
            payout_utr: None,
            failure_reason: None,
            completed_at: None,
            created_at: now,
            expires_at: now + Duration::minutes(TRANSACTION_TTL_MINUTES),
        }
    }

    /// Effective status with lazy expiry from `pending_deposit` only.
    pub fn effective_status(&self, now: DateTime<Utc>) -> TransactionStatus {
        if self.status == TransactionStatus::PendingDeposit && now > self.expires_at {
            TransactionStatus::Expired
        } else {
            self.status
        }
    }
}

// =============================================================================
// Webhook Events
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    #[serde(rename = "deposit.detected")]
    DepositDetected,
    #[serde(rename = "payout.settled")]
    PayoutSettled,
}

impl WebhookEventType {
    pub fn name(&self) -> &'static str {
        match self {
            WebhookEventType::DepositDetected => "deposit.detected",
            WebhookEventType::PayoutSettled => "payout.settled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WebhookDeliveryStatus {
    Pending,
    Delivered,
    Retrying,
    Failed,
}

/// One outbound event with its delivery bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookEvent {
    pub event_id: String,
    pub event_type: WebhookEventType,
    /// Partner whose secret signs the delivery.
    pub partner_id: String,
    pub webhook_url: String,
    /// Canonical JSON body that gets signed and POSTed.
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    pub status: WebhookDeliveryStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_retry_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl WebhookEvent {
    pub fn new(
        event_type: WebhookEventType,
        partner_id: String,
        webhook_url: String,
        payload: serde_json::Value,
        max_attempts: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            event_id: format!("evt_{}", Uuid::new_v4()),
            event_type,
            partner_id,
            webhook_url,
            payload,
            status: WebhookDeliveryStatus::Pending,
            attempts: 0,
            max_attempts,
            last_attempt_at: None,
            next_retry_at: Some(now),
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn asset_parses_case_insensitively() {
        assert_eq!(Asset::from_symbol("usdc"), Some(Asset::Usdc));
        assert_eq!(Asset::from_symbol(" USDT "), Some(Asset::Usdt));
        assert_eq!(Asset::from_symbol("DAI"), None);
    }

    #[test]
    fn kyc_method_tags_round_trip() {
        for method in KycMethod::ALL {
            assert_eq!(KycMethod::from_tag(method.tag()), Some(method));
        }
        assert_eq!(KycMethod::from_tag("name-match"), Some(KycMethod::NameMatch));
        assert_eq!(KycMethod::from_tag("iris"), None);
    }

    #[test]
    fn session_expires_lazily() {
        let mut session = Session::new("ptn_1".into(), None);
        let now = Utc::now();
        assert_eq!(session.effective_status(now), SessionStatus::Active);

        session.expires_at = now - Duration::minutes(1);
        assert_eq!(session.effective_status(now), SessionStatus::Expired);

        // A completed session is not re-labelled expired.
        session.status = SessionStatus::Completed;
        assert_eq!(session.effective_status(now), SessionStatus::Completed);
    }

    #[test]
    fn transaction_expires_only_from_pending_deposit() {
        let mut tx = Transaction::new(
            "ses_1".into(),
            "qt_1".into(),
            "kyc_1".into(),
            "user_1".into(),
            "0xdeposit".into(),
            Decimal::from_str("100").unwrap(),
        );
        let now = Utc::now();
        tx.expires_at = now - Duration::minutes(1);
        assert_eq!(tx.effective_status(now), TransactionStatus::Expired);

        tx.status = TransactionStatus::DepositConfirmed;
        assert_eq!(tx.effective_status(now), TransactionStatus::DepositConfirmed);
    }

    #[test]
    fn webhook_event_type_names_match_wire_format() {
        assert_eq!(WebhookEventType::DepositDetected.name(), "deposit.detected");
        assert_eq!(WebhookEventType::PayoutSettled.name(), "payout.settled");
        assert_eq!(
            serde_json::to_string(&WebhookEventType::DepositDetected).unwrap(),
            "\"deposit.detected\""
        );
    }
}
