// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! Rampline - Stablecoin to INR Off-Ramp Partner Gateway
//!
//! This crate provides a partner-facing gateway that converts stablecoin
//! deposits (USDC/USDT) into INR payouts: quote calculation, third-party
//! KYC orchestration, the transaction lifecycle, and signed partner
//! webhooks.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Partner API-key authentication
//! - `fees` - Deterministic INR fee breakdown
//! - `kyc` - KYC session state machine
//! - `lifecycle` - Transaction state machine and reconciliation
//! - `matching` - Fuzzy holder-name comparison
//! - `providers` - Surepass/Cashfree KYC adapters and the sandbox simulator
//! - `rates` - USD→INR rate source with fallback
//! - `storage` - Storage trait with in-memory and file-backed backends
//! - `webhooks` - Signed outbound events with durable retry

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod fees;
pub mod kyc;
pub mod lifecycle;
pub mod matching;
pub mod models;
pub mod providers;
pub mod rates;
pub mod state;
pub mod storage;
pub mod webhooks;
