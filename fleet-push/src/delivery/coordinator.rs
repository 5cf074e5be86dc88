//! Fan-out of one notification to every registered subscription.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE};
use tracing::{debug, info, warn};
use webpush::{MAX_PLAINTEXT_LEN, VapidAuthenticator};

use crate::config::{DEFAULT_CONCURRENCY, DEFAULT_TTL_SECS, WebPushConfig};
use crate::database::{NotificationLog, SubscriptionStore};
use crate::delivery::outcome::{DeliveryOutcome, DeliveryReport, SubscriberReport};
use crate::domain::{Notification, Subscription};
use crate::http_client::build_push_client;
use crate::{Error, Result};

/// Sends a notification to all subscriptions and reconciles the store.
///
/// Each subscription gets exactly one attempt per run. Store mutations are
/// applied only after every attempt has settled.
pub struct DeliveryCoordinator {
    store: Arc<dyn SubscriptionStore>,
    log: Arc<dyn NotificationLog>,
    vapid: Arc<VapidAuthenticator>,
    client: reqwest::Client,
    ttl_secs: u32,
    concurrency: usize,
}

impl DeliveryCoordinator {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        log: Arc<dyn NotificationLog>,
        vapid: VapidAuthenticator,
        client: reqwest::Client,
    ) -> Self {
        Self {
            store,
            log,
            vapid: Arc::new(vapid),
            client,
            ttl_secs: DEFAULT_TTL_SECS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Build a coordinator with its own HTTP client from configuration.
    pub fn from_config(
        store: Arc<dyn SubscriptionStore>,
        log: Arc<dyn NotificationLog>,
        config: &WebPushConfig,
    ) -> Result<Self> {
        let vapid = VapidAuthenticator::new(&config.keys, &config.subject);
        let client = build_push_client(config.request_timeout)?;
        Ok(Self::new(store, log, vapid, client)
            .with_ttl_secs(config.ttl_secs)
            .with_concurrency(config.concurrency))
    }

    pub fn with_ttl_secs(mut self, ttl_secs: u32) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// VAPID public key browsers need to subscribe.
    pub fn vapid_public_key(&self) -> &str {
        self.vapid.public_key_base64url()
    }

    /// Deliver `notification` to every subscription.
    ///
    /// A payload over the single-record limit fails the whole run before any
    /// push request or log row. Per-subscriber problems end up in the report.
    pub async fn run(&self, notification: &Notification) -> Result<DeliveryReport> {
        let payload = notification.to_payload()?;
        if payload.len() > MAX_PLAINTEXT_LEN {
            return Err(Error::validation(format!(
                "notification payload is {} bytes, the limit is {}",
                payload.len(),
                MAX_PLAINTEXT_LEN
            )));
        }
        let subscriptions = self.store.list_all().await?;

        if subscriptions.is_empty() {
            info!("No push subscriptions registered");
        } else {
            debug!(
                subscriptions = subscriptions.len(),
                concurrency = self.concurrency,
                "Starting push fan-out"
            );
        }

        let details: Vec<SubscriberReport> = stream::iter(subscriptions)
            .map(|sub| self.deliver(sub, &payload))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let report = DeliveryReport::from_reports(details);
        self.reconcile(&report).await;

        info!(
            sent = report.sent,
            failed = report.failed,
            expired = report.expired,
            "Push fan-out completed"
        );

        Ok(report)
    }

    async fn deliver(&self, sub: Subscription, payload: &[u8]) -> SubscriberReport {
        let (headers, body) = match self.prepare(&sub, payload) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(
                    endpoint = %sub.endpoint,
                    error = %e,
                    "Cannot prepare web push message"
                );
                return SubscriberReport::new(
                    sub.endpoint,
                    DeliveryOutcome::TransientFailure(e.to_string()),
                    None,
                );
            }
        };

        let response = self
            .client
            .post(&sub.endpoint)
            .header(AUTHORIZATION, headers.authorization)
            .header("Crypto-Key", headers.crypto_key)
            .header(CONTENT_ENCODING, "aes128gcm")
            .header(CONTENT_TYPE, "application/octet-stream")
            .header("TTL", self.ttl_secs.to_string())
            .header("Urgency", "high")
            .body(body)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    endpoint = %sub.endpoint,
                    error = %e,
                    "Web push request failed"
                );
                return SubscriberReport::new(
                    sub.endpoint,
                    DeliveryOutcome::TransientFailure(format!("request failed: {}", e)),
                    None,
                );
            }
        };

        let status = response.status().as_u16();
        let body = if matches!(status, 200 | 201) {
            String::new()
        } else {
            response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read response body>".to_string())
        };

        let outcome = DeliveryOutcome::from_status(status, &body);
        match &outcome {
            DeliveryOutcome::Sent => {
                debug!(endpoint = %sub.endpoint, status, "Web push delivered");
            }
            DeliveryOutcome::Invalidated(reason) => {
                info!(endpoint = %sub.endpoint, status, reason = %reason, "Web push subscription is gone");
            }
            DeliveryOutcome::TransientFailure(reason) => {
                warn!(endpoint = %sub.endpoint, status, reason = %reason, "Web push delivery failed");
            }
        }

        SubscriberReport::new(sub.endpoint, outcome, Some(status))
    }

    fn prepare(
        &self,
        sub: &Subscription,
        payload: &[u8],
    ) -> webpush::Result<(webpush::VapidHeaders, Vec<u8>)> {
        let keys = sub.keys()?;
        let headers = self.vapid.headers_for(&sub.endpoint)?;
        let record = webpush::encrypt(payload, &keys)?;
        Ok((headers, record.to_bytes()))
    }

    /// Apply the run's outcomes to the store and log. Failures here are
    /// logged; the report already reflects what the push services said.
    async fn reconcile(&self, report: &DeliveryReport) {
        for endpoint in report.sent_endpoints() {
            if let Err(e) = self.store.touch(endpoint).await {
                warn!(endpoint = %endpoint, error = %e, "Failed to update last_used_at");
            }
        }

        if !report.invalidated_endpoints.is_empty() {
            match self.store.delete_many(&report.invalidated_endpoints).await {
                Ok(deleted) => info!(deleted, "Removed expired push subscriptions"),
                Err(e) => warn!(
                    endpoints = report.invalidated_endpoints.len(),
                    error = %e,
                    "Failed to remove expired push subscriptions"
                ),
            }
        }

        if let Err(e) = self
            .log
            .append_summary(report.sent, report.failed, report.expired)
            .await
        {
            warn!(error = %e, "Failed to record push notification summary");
        }
    }
}
