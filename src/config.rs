// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! # Runtime Configuration
//!
//! All configuration is read from the environment once at startup into a
//! single [`GatewayConfig`]. Provider selection (live vs simulated) happens
//! here and nowhere else; request handlers never consult environment state.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `GATEWAY_MODE` | `live` or `sandbox` (simulated providers) | `sandbox` |
//! | `DATA_DIR` | If set, persist to JSON files under this directory | unset (in-memory) |
//! | `FX_RATE_URL` | FX endpoint returning a USD→INR rate | exchangerate-api |
//! | `FX_FALLBACK_RATE` | Rate used when the FX provider fails | `83.50` |
//! | `KYC_REQUIRED_METHODS` | Methods required for KYC completion | `aadhaar,pan` |
//! | `DEPOSIT_TOLERANCE_BPS` | Deposit reconciliation tolerance (basis points) | `50` |
//! | `WEBHOOK_MAX_ATTEMPTS` | Delivery attempts before marking failed | `5` |
//! | `WEBHOOK_RETRY_BASE_SECS` | Exponential backoff base | `30` |
//! | `SEED_PARTNER_API_KEY` | Partner key seeded at startup | unset |
//! | `SEED_PARTNER_WEBHOOK_URL` | Seeded partner's callback URL | unset |
//! | `SEED_PARTNER_WEBHOOK_SECRET` | Seeded partner's webhook secret | unset |
//! | `LOG_FORMAT` | `json` or `pretty` | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |
//!
//! Provider credentials (`SUREPASS_*`, `CASHFREE_*`) are read by the
//! respective clients in `providers/` and are required only in live mode.

use std::collections::BTreeSet;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::models::KycMethod;

/// Session validity window.
pub const SESSION_TTL_MINUTES: i64 = 30;

/// Quote validity window.
pub const QUOTE_TTL_MINUTES: i64 = 15;

/// Transaction deposit window.
pub const TRANSACTION_TTL_MINUTES: i64 = 60;

/// USD→INR rate used when the FX provider is unreachable.
pub const DEFAULT_FALLBACK_USD_INR: &str = "83.50";

const DEFAULT_FX_RATE_URL: &str = "https://api.exchangerate-api.com/v4/latest/USD";

/// Which provider implementations to wire at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMode {
    /// Real FX and KYC provider calls.
    Live,
    /// Simulated providers; no outbound calls except webhooks.
    Sandbox,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub mode: GatewayMode,
    pub data_dir: Option<String>,
    pub fx_rate_url: String,
    pub fx_fallback_rate: Decimal,
    /// Verification methods that must all succeed before a KYC session is
    /// considered complete.
    pub kyc_required_methods: BTreeSet<KycMethod>,
    /// Allowed deviation between the quoted USD amount and a reported
    /// deposit, in basis points.
    pub deposit_tolerance_bps: u32,
    pub webhook_max_attempts: u32,
    pub webhook_retry_base_secs: u64,
    pub seed_partner: Option<SeedPartner>,
}

/// Partner credentials seeded into the store at startup.
#[derive(Debug, Clone)]
pub struct SeedPartner {
    pub api_key: String,
    pub webhook_url: String,
    pub webhook_secret: String,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let mode = match env_or_default("GATEWAY_MODE", "sandbox").to_ascii_lowercase().as_str() {
            "live" => GatewayMode::Live,
            _ => GatewayMode::Sandbox,
        };

        let fx_fallback_rate = env_optional("FX_FALLBACK_RATE")
            .and_then(|raw| Decimal::from_str(&raw).ok())
            .filter(|rate| rate > &Decimal::ZERO)
            .unwrap_or_else(|| {
                Decimal::from_str(DEFAULT_FALLBACK_USD_INR).expect("valid fallback constant")
            });

        let kyc_required_methods = env_optional("KYC_REQUIRED_METHODS")
            .map(|raw| parse_required_methods(&raw))
            .unwrap_or_else(default_required_methods);

        let seed_partner = match (
            env_optional("SEED_PARTNER_API_KEY"),
            env_optional("SEED_PARTNER_WEBHOOK_URL"),
            env_optional("SEED_PARTNER_WEBHOOK_SECRET"),
        ) {
            (Some(api_key), Some(webhook_url), Some(webhook_secret)) => Some(SeedPartner {
                api_key,
                webhook_url,
                webhook_secret,
            }),
            _ => None,
        };

        Self {
            host: env_or_default("HOST", "0.0.0.0"),
            port: env_or_default("PORT", "8080").parse().unwrap_or(8080),
            mode,
            data_dir: env_optional("DATA_DIR"),
            fx_rate_url: env_or_default("FX_RATE_URL", DEFAULT_FX_RATE_URL),
            fx_fallback_rate,
            kyc_required_methods,
            deposit_tolerance_bps: env_or_default("DEPOSIT_TOLERANCE_BPS", "50")
                .parse()
                .unwrap_or(50),
            webhook_max_attempts: env_or_default("WEBHOOK_MAX_ATTEMPTS", "5")
                .parse()
                .unwrap_or(5),
            webhook_retry_base_secs: env_or_default("WEBHOOK_RETRY_BASE_SECS", "30")
                .parse()
                .unwrap_or(30),
            seed_partner,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            mode: GatewayMode::Sandbox,
            data_dir: None,
            fx_rate_url: DEFAULT_FX_RATE_URL.to_string(),
            fx_fallback_rate: Decimal::from_str(DEFAULT_FALLBACK_USD_INR)
                .expect("valid fallback constant"),
            kyc_required_methods: default_required_methods(),
            deposit_tolerance_bps: 50,
            webhook_max_attempts: 5,
            webhook_retry_base_secs: 30,
            seed_partner: None,
        }
    }
}

fn default_required_methods() -> BTreeSet<KycMethod> {
    [KycMethod::Aadhaar, KycMethod::Pan].into_iter().collect()
}

fn parse_required_methods(raw: &str) -> BTreeSet<KycMethod> {
    let parsed: BTreeSet<KycMethod> = raw
        .split(',')
        .filter_map(|tag| KycMethod::from_tag(tag.trim()))
        .collect();
    if parsed.is_empty() {
        default_required_methods()
    } else {
        parsed
    }
}

fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}
