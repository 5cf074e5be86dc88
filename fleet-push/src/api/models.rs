//! Request and response bodies of the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::delivery::{DeliveryReport, SubscriberReport};
use crate::domain::Subscription;

/// Summary returned by `POST /api/push/notify`.
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub success: bool,
    pub sent: usize,
    pub failed: usize,
    pub expired: usize,
    pub details: Vec<SubscriberReport>,
}

impl From<DeliveryReport> for TriggerResponse {
    fn from(report: DeliveryReport) -> Self {
        Self {
            success: true,
            sent: report.sent,
            failed: report.failed,
            expired: report.expired,
            details: report.details,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VapidPublicKeyResponse {
    pub public_key: String,
}

/// Keys block of a browser `PushSubscription.toJSON()`.
#[derive(Debug, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Body of `POST /api/push/subscriptions`.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
    pub user_agent: Option<String>,
}

/// Body of `DELETE /api/push/subscriptions`.
#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub endpoint: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(sub: Subscription) -> Self {
        Self {
            endpoint: sub.endpoint,
            user_agent: sub.user_agent,
            created_at: sub.created_at,
            last_used_at: sub.last_used_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}
