// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rampline_server::api::router;
use rampline_server::config::{GatewayConfig, GatewayMode};
use rampline_server::models::Partner;
use rampline_server::providers::{KycGateway, KycVerifier, SimulatedKycGateway};
use rampline_server::rates::{FixedRateProvider, LiveRateProvider, RateProvider};
use rampline_server::state::AppState;
use rampline_server::storage::{FileStore, GatewayStore, MemoryStore};
use rampline_server::webhooks::spawn_webhook_poller;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    if format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = GatewayConfig::from_env();

    let store: Arc<dyn GatewayStore> = match &config.data_dir {
        Some(dir) => {
            info!(data_dir = %dir, "using file-backed storage");
            Arc::new(FileStore::open(dir)?)
        }
        None => {
            info!("using in-memory storage");
            Arc::new(MemoryStore::new())
        }
    };

    let (rates, kyc_gateway): (Arc<dyn RateProvider>, Arc<dyn KycVerifier>) = match config.mode {
        GatewayMode::Live => {
            info!("live mode: real FX and KYC providers");
            (
                Arc::new(LiveRateProvider::new(
                    config.fx_rate_url.clone(),
                    config.fx_fallback_rate,
                )),
                Arc::new(KycGateway::from_env()?),
            )
        }
        GatewayMode::Sandbox => {
            info!("sandbox mode: simulated FX and KYC providers");
            (
                Arc::new(FixedRateProvider::new(config.fx_fallback_rate)),
                Arc::new(SimulatedKycGateway),
            )
        }
    };

    if let Some(seed) = &config.seed_partner {
        let partner = Partner::new(
            seed.api_key.clone(),
            seed.webhook_url.clone(),
            seed.webhook_secret.clone(),
        );
        match store.insert_partner(partner.clone()) {
            Ok(()) => info!(partner_id = %partner.partner_id, "seed partner created"),
            Err(err) => info!(error = %err, "seed partner not inserted"),
        }
    }

    let shutdown = CancellationToken::new();
    let poller = spawn_webhook_poller(
        store.clone(),
        config.webhook_retry_base_secs,
        shutdown.clone(),
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = AppState::new(store, rates, kyc_gateway, config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Rampline gateway listening (docs at /docs)");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_shutdown.cancel();
        })
        .await?;

    // The poller finishes its in-flight tick before the process exits.
    poller.await?;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}
