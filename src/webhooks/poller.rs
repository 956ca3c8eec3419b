// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! Background loop draining due webhook events from storage.
//!
//! Delivery is decoupled from the request handlers: handlers only enqueue
//! events, this task picks them up on the next tick. Shutdown is
//! cooperative via a cancellation token.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::WebhookDispatcher;
use crate::storage::GatewayStore;

const POLL_INTERVAL_SECS: u64 = 5;

/// Spawn the delivery loop. Returns the join handle; cancel `shutdown` to
/// stop it after the in-flight tick completes.
pub fn spawn_webhook_poller(
    store: Arc<dyn GatewayStore>,
    retry_base_secs: u64,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let dispatcher = WebhookDispatcher::new(store.clone(), retry_base_secs);
        let mut ticker = tokio::time::interval(Duration::from_secs(POLL_INTERVAL_SECS));
        info!("webhook poller started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("webhook poller stopping");
                    break;
                }
                _ = ticker.tick() => {
                    poll_step(&*store, &dispatcher).await;
                }
            }
        }
    })
}

async fn poll_step(store: &dyn GatewayStore, dispatcher: &WebhookDispatcher) {
    let due = match store.due_webhook_events(Utc::now()) {
        Ok(due) => due,
        Err(err) => {
            warn!(error = %err, "failed to query due webhook events");
            return;
        }
    };

    if due.is_empty() {
        return;
    }
    debug!(count = due.len(), "delivering due webhook events");

    for event in due {
        dispatcher.deliver(event).await;
    }
}
