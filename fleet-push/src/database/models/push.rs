//! Push subscription and notification log rows.

use sqlx::FromRow;

use crate::database::time::{datetime_to_ms, ms_to_datetime};
use crate::domain::Subscription;

/// `push_subscriptions` row.
#[derive(Debug, Clone, FromRow)]
pub struct PushSubscriptionDbModel {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_agent: Option<String>,
    pub created_at: i64,
    pub last_used_at: Option<i64>,
}

impl From<PushSubscriptionDbModel> for Subscription {
    fn from(row: PushSubscriptionDbModel) -> Self {
        Self {
            endpoint: row.endpoint,
            p256dh: row.p256dh,
            auth: row.auth,
            user_agent: row.user_agent,
            created_at: ms_to_datetime(row.created_at),
            last_used_at: row.last_used_at.map(ms_to_datetime),
        }
    }
}

impl From<&Subscription> for PushSubscriptionDbModel {
    fn from(sub: &Subscription) -> Self {
        Self {
            endpoint: sub.endpoint.clone(),
            p256dh: sub.p256dh.clone(),
            auth: sub.auth.clone(),
            user_agent: sub.user_agent.clone(),
            created_at: datetime_to_ms(sub.created_at),
            last_used_at: sub.last_used_at.map(datetime_to_ms),
        }
    }
}

/// Status values of `push_notifications_log.status`.
pub const LOG_STATUS_PENDING: &str = "pending";
pub const LOG_STATUS_SENT: &str = "sent";

/// `push_notifications_log` row.
#[derive(Debug, Clone, FromRow)]
pub struct PushNotificationLogDbModel {
    pub id: i64,
    pub triggered_at: i64,
    pub status: String,
    /// Number of subscribers the message reached.
    pub affected_rows: Option<i64>,
    pub failed_count: Option<i64>,
    pub expired_count: Option<i64>,
    pub completed_at: Option<i64>,
}
