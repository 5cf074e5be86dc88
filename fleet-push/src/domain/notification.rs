//! The notification shown by the service worker.

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_TITLE: &str = "Aviso";
pub const DEFAULT_BODY: &str = "Saldo de combustível atualizado pela GPM!";
pub const DEFAULT_ICON: &str = "/icons/icon-192.png";

/// Plaintext payload, serialized to JSON before encryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
}

impl Default for Notification {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            body: DEFAULT_BODY.to_string(),
            icon: DEFAULT_ICON.to_string(),
            badge: DEFAULT_ICON.to_string(),
        }
    }
}

impl Notification {
    /// Apply per-trigger overrides on top of this notification.
    pub fn merged(&self, overrides: NotificationOverrides) -> Self {
        Self {
            title: overrides.title.unwrap_or_else(|| self.title.clone()),
            body: overrides.body.unwrap_or_else(|| self.body.clone()),
            icon: overrides.icon.unwrap_or_else(|| self.icon.clone()),
            badge: overrides.badge.unwrap_or_else(|| self.badge.clone()),
        }
    }

    /// JSON bytes handed to the encryptor.
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Optional fields a trigger request may replace.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationOverrides {
    pub title: Option<String>,
    pub body: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
}
