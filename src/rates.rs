// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! # Rate Provider
//!
//! USD→INR rate source behind a trait so the live client and a fixed-rate
//! stand-in are interchangeable at startup.
//!
//! The live provider never raises: any failure (network error, non-2xx,
//! malformed payload, timeout) degrades to the configured fallback rate with
//! a warning. Availability over accuracy is deliberate here — a quote at the
//! reference rate beats a hard failure of the whole quote endpoint.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::warn;

/// Bounded timeout for the FX endpoint.
const FX_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Current USD→INR rate. Infallible by contract; implementations degrade
    /// internally rather than surface errors to quote creation.
    async fn usd_inr(&self) -> Decimal;
}

/// Live FX client with fallback-on-failure.
pub struct LiveRateProvider {
    endpoint: String,
    fallback_rate: Decimal,
    http: reqwest::Client,
}

impl LiveRateProvider {
    pub fn new(endpoint: String, fallback_rate: Decimal) -> Self {
        let http = reqwest::Client::builder()
            .timeout(FX_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            endpoint,
            fallback_rate,
            http,
        }
    }

    async fn fetch_rate(&self) -> Result<Decimal, String> {
        let response = self
            .http
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| format!("FX request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("FX endpoint returned {}", response.status()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| format!("FX response was not JSON: {e}"))?;

        let rate = body
            .pointer("/rates/INR")
            .or_else(|| body.pointer("/conversion_rates/INR"))
            .or_else(|| body.get("rate"))
            .ok_or_else(|| "FX response missing INR rate".to_string())?;

        // Parse via the JSON token text to keep the exact decimal digits.
        let parsed = Decimal::from_str(&rate.to_string())
            .map_err(|e| format!("FX rate was not a number: {e}"))?;

        if parsed <= Decimal::ZERO {
            return Err(format!("FX rate was non-positive: {parsed}"));
        }
        Ok(parsed)
    }
}

#[async_trait]
impl RateProvider for LiveRateProvider {
    async fn usd_inr(&self) -> Decimal {
        match self.fetch_rate().await {
            Ok(rate) => rate,
            Err(reason) => {
                warn!(
                    fallback = %self.fallback_rate,
                    reason = %reason,
                    "FX provider degraded, using fallback rate"
                );
                self.fallback_rate
            }
        }
    }
}

/// Constant-rate provider for sandbox mode and tests.
pub struct FixedRateProvider {
    rate: Decimal,
}

impl FixedRateProvider {
    pub fn new(rate: Decimal) -> Self {
        Self { rate }
    }
}

#[async_trait]
impl RateProvider for FixedRateProvider {
    async fn usd_inr(&self) -> Decimal {
        self.rate
    }
}
