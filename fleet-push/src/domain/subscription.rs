//! Browser push subscription.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use webpush::SubscriberKeys;

/// A browser's push endpoint with the keys it handed out at subscribe time.
///
/// Identified by `endpoint`. `p256dh` and `auth` stay in their base64url form
/// until a delivery needs them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn new(
        endpoint: impl Into<String>,
        p256dh: impl Into<String>,
        auth: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            p256dh: p256dh.into(),
            auth: auth.into(),
            user_agent: None,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Decode and validate the subscriber's encryption keys.
    pub fn keys(&self) -> webpush::Result<SubscriberKeys> {
        SubscriberKeys::from_base64url(&self.p256dh, &self.auth)
    }
}
