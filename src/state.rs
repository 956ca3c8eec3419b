// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! Shared application state handed to every handler.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::providers::KycVerifier;
use crate::rates::RateProvider;
use crate::storage::GatewayStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GatewayStore>,
    pub rates: Arc<dyn RateProvider>,
    pub kyc_gateway: Arc<dyn KycVerifier>,
    pub config: Arc<GatewayConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn GatewayStore>,
        rates: Arc<dyn RateProvider>,
        kyc_gateway: Arc<dyn KycVerifier>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            store,
            rates,
            kyc_gateway,
            config: Arc::new(config),
        }
    }

    /// In-memory state with simulated providers.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        use crate::providers::SimulatedKycGateway;
        use crate::rates::FixedRateProvider;
        use crate::storage::MemoryStore;
        use rust_decimal::Decimal;
        use std::str::FromStr;

        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FixedRateProvider::new(
                Decimal::from_str("83.65").expect("valid rate"),
            )),
            Arc::new(SimulatedKycGateway),
            GatewayConfig::default(),
        )
    }
}
