// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rampline Labs

//! Delivers one webhook event and records the outcome.
//!
//! Retry policy: exponential backoff at `base * 2^attempts`, capped at one
//! hour, up to the event's `max_attempts`. Any 2xx response counts as
//! delivered; everything else (including transport errors) schedules a
//! retry or marks the event failed once attempts are exhausted.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use super::signer;
use crate::models::{WebhookDeliveryStatus, WebhookEvent};
use crate::storage::GatewayStore;

const DELIVERY_TIMEOUT_SECS: u64 = 10;
const MAX_BACKOFF_SECS: u64 = 3600;

pub struct WebhookDispatcher {
    store: Arc<dyn GatewayStore>,
    http: reqwest::Client,
    retry_base_secs: u64,
}

impl WebhookDispatcher {
    pub fn new(store: Arc<dyn GatewayStore>, retry_base_secs: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(DELIVERY_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            store,
            http,
            retry_base_secs,
        }
    }

    /// Attempt delivery of one event and persist the updated bookkeeping.
    pub async fn deliver(&self, mut event: WebhookEvent) {
        let secret = match self.store.partner(&event.partner_id) {
            Ok(partner) => partner.webhook_secret,
            Err(err) => {
                warn!(
                    event_id = %event.event_id,
                    partner_id = %event.partner_id,
                    error = %err,
                    "webhook partner lookup failed; marking event failed"
                );
                event.status = WebhookDeliveryStatus::Failed;
                event.next_retry_at = None;
                self.persist(&event);
                return;
            }
        };

        let delivered = self.post(&event, &secret).await;
        self.record_outcome(&mut event, delivered);
        self.persist(&event);
    }

    async fn post(&self, event: &WebhookEvent, secret: &str) -> bool {
        let body = match serde_json::to_vec(&event.payload) {
            Ok(body) => body,
            Err(err) => {
                warn!(event_id = %event.event_id, error = %err, "webhook payload serialization failed");
                return false;
            }
        };
        let signature = signer::sign(secret, &body);

        let response = self
            .http
            .post(&event.webhook_url)
            .header("Content-Type", "application/json")
            .header("X-Signature", signature)
            .header("X-Timestamp", Utc::now().timestamp().to_string())
            .header("X-Event", event.event_type.name())
            .body(body)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(
                    event_id = %event.event_id,
                    status = %response.status(),
                    "webhook endpoint returned non-success"
                );
                false
            }
            Err(err) => {
                warn!(event_id = %event.event_id, error = %err, "webhook delivery error");
                false
            }
        }
    }

    /// Update attempt counters and schedule the next retry (or finalize).
    pub fn record_outcome(&self, event: &mut WebhookEvent, delivered: bool) {
        let now = Utc::now();
        event.attempts += 1;
        event.last_attempt_at = Some(now);

        if delivered {
            event.status = WebhookDeliveryStatus::Delivered;
            event.next_retry_at = None;
            info!(
                event_id = %event.event_id,
                event_type = event.event_type.name(),
                attempts = event.attempts,
                "webhook delivered"
            );
        } else if event.attempts >= event.max_attempts {
            event.status = WebhookDeliveryStatus::Failed;
            event.next_retry_at = None;
            warn!(
                event_id = %event.event_id,
                attempts = event.attempts,
                "webhook delivery exhausted; giving up"
            );
        } else {
            event.status = WebhookDeliveryStatus::Retrying;
            event.next_retry_at = Some(now + Duration::seconds(self.backoff_secs(event.attempts) as i64));
        }
    }

    /// `base * 2^attempts`, capped at one hour. `attempts` is the count of
    /// attempts already made.
    fn backoff_secs(&self, attempts: u32) -> u64 {
        self.retry_base_secs
            .saturating_mul(1u64 << attempts.min(20))
            .min(MAX_BACKOFF_SECS)
    }

    fn persist(&self, event: &WebhookEvent) {
        if let Err(err) = self.store.update_webhook_event(event) {
            warn!(event_id = %event.event_id, error = %err, "failed to persist webhook state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WebhookEventType;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn dispatcher(base: u64) -> WebhookDispatcher {
        WebhookDispatcher::new(Arc::new(MemoryStore::new()), base)
    }

    fn event(max_attempts: u32) -> WebhookEvent {
        WebhookEvent::new(
            WebhookEventType::DepositDetected,
            "ptn_1".into(),
            "https://partner.example/hook".into(),
            json!({"event": "deposit.detected"}),
            max_attempts,
        )
    }

    #[test]
    fn backoff_doubles_per_attempt_and_caps_at_one_hour() {
        let d = dispatcher(30);
        assert_eq!(d.backoff_secs(1), 60);
        assert_eq!(d.backoff_secs(2), 120);
        assert_eq!(d.backoff_secs(3), 240);
        assert_eq!(d.backoff_secs(10), 3600);
        assert_eq!(d.backoff_secs(63), 3600);
    }

    #[test]
    fn success_marks_delivered_and_clears_retry() {
        let d = dispatcher(30);
        let mut e = event(5);
        d.record_outcome(&mut e, true);
        assert_eq!(e.status, WebhookDeliveryStatus::Delivered);
        assert_eq!(e.attempts, 1);
        assert!(e.next_retry_at.is_none());
    }

    #[test]
    fn failure_schedules_a_retry_until_attempts_exhaust() {
        let d = dispatcher(30);
        let mut e = event(3);

        d.record_outcome(&mut e, false);
        assert_eq!(e.status, WebhookDeliveryStatus::Retrying);
        assert!(e.next_retry_at.is_some());

        d.record_outcome(&mut e, false);
        assert_eq!(e.status, WebhookDeliveryStatus::Retrying);

        d.record_outcome(&mut e, false);
        assert_eq!(e.status, WebhookDeliveryStatus::Failed);
        assert!(e.next_retry_at.is_none());
        assert_eq!(e.attempts, 3);
    }

    #[test]
    fn later_retries_back_off_further() {
        let d = dispatcher(30);
        let mut e = event(5);

        d.record_outcome(&mut e, false);
        let first = e.next_retry_at.unwrap() - e.last_attempt_at.unwrap();
        d.record_outcome(&mut e, false);
        let second = e.next_retry_at.unwrap() - e.last_attempt_at.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn unknown_partner_marks_event_failed() {
        let store = Arc::new(MemoryStore::new());
        let d = WebhookDispatcher::new(store.clone(), 30);
        let e = event(5);
        let id = e.event_id.clone();
        store.insert_webhook_event(e.clone()).unwrap();

        d.deliver(e).await;
        let after = store.webhook_event(&id).unwrap();
        assert_eq!(after.status, WebhookDeliveryStatus::Failed);
    }
}
