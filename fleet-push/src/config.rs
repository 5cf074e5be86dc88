//! Process configuration loaded from environment variables.
//!
//! `main` loads `.env` through `dotenvy` before calling [`AppConfig::from_env`],
//! so every value can come from either source. Anything the delivery path
//! cannot run without is validated here, before the server binds.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use webpush::VapidKeyPair;

use crate::domain::Notification;
use crate::error::{Error, Result};

pub const DEFAULT_DATABASE_URL: &str = "sqlite:fleet-push.db?mode=rwc";
pub const DEFAULT_VAPID_SUBJECT: &str = "mailto:noreply@frotagpm.app";
pub const DEFAULT_TTL_SECS: u32 = 24 * 60 * 60;
pub const DEFAULT_CONCURRENCY: usize = 16;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_API_PORT: u16 = 12556;

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Answer CORS preflights for any origin.
    pub permissive_cors: bool,
    /// Largest accepted request body, in bytes.
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_API_PORT),
            permissive_cors: true,
            body_limit: 64 * 1024,
        }
    }
}

impl ServerConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let ip: IpAddr = parse_or(lookup, "API_BIND_ADDRESS", defaults.listen_addr.ip())?;
        let port: u16 = parse_or(lookup, "API_PORT", DEFAULT_API_PORT)?;
        Ok(Self {
            listen_addr: SocketAddr::new(ip, port),
            ..defaults
        })
    }
}

/// VAPID identity and delivery tuning.
#[derive(Debug, Clone)]
pub struct WebPushConfig {
    pub keys: VapidKeyPair,
    pub subject: String,
    /// Value of the `TTL` header, in seconds.
    pub ttl_secs: u32,
    /// Maximum number of push requests in flight.
    pub concurrency: usize,
    pub request_timeout: Duration,
}

impl WebPushConfig {
    pub fn new(keys: VapidKeyPair, subject: impl Into<String>) -> Self {
        Self {
            keys,
            subject: subject.into(),
            ttl_secs: DEFAULT_TTL_SECS,
            concurrency: DEFAULT_CONCURRENCY,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let public_key = require(lookup, "WEB_PUSH_VAPID_PUBLIC_KEY")?;
        let private_key = require(lookup, "WEB_PUSH_VAPID_PRIVATE_KEY")?;
        let keys = VapidKeyPair::from_base64url(&public_key, &private_key)
            .map_err(|e| Error::config(format!("Invalid VAPID key pair: {}", e)))?;

        let subject = non_empty(lookup, "WEB_PUSH_VAPID_SUBJECT")
            .unwrap_or_else(|| DEFAULT_VAPID_SUBJECT.to_string());

        let concurrency: usize = parse_or(lookup, "WEB_PUSH_CONCURRENCY", DEFAULT_CONCURRENCY)?;
        if concurrency == 0 {
            return Err(Error::config("WEB_PUSH_CONCURRENCY must be at least 1"));
        }

        Ok(Self {
            keys,
            subject,
            ttl_secs: parse_or(lookup, "WEB_PUSH_TTL_SECS", DEFAULT_TTL_SECS)?,
            concurrency,
            request_timeout: Duration::from_secs(parse_or(
                lookup,
                "WEB_PUSH_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
        })
    }
}

/// Everything the service needs at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub server: ServerConfig,
    pub web_push: WebPushConfig,
    /// Shared secret callers present as `Authorization: Bearer <secret>`.
    pub trigger_secret: String,
    /// Message sent when a trigger carries no overrides.
    pub notification: Notification,
    /// Directory for daily-rotated log files; console only when unset.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Notification::default();
        let notification = Notification {
            title: non_empty(&lookup, "NOTIFICATION_TITLE").unwrap_or(defaults.title),
            body: non_empty(&lookup, "NOTIFICATION_BODY").unwrap_or(defaults.body),
            icon: non_empty(&lookup, "NOTIFICATION_ICON").unwrap_or(defaults.icon),
            badge: non_empty(&lookup, "NOTIFICATION_BADGE").unwrap_or(defaults.badge),
        };

        Ok(Self {
            database_url: non_empty(&lookup, "DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            server: ServerConfig::from_lookup(&lookup)?,
            web_push: WebPushConfig::from_lookup(&lookup)?,
            trigger_secret: require(&lookup, "PUSH_TRIGGER_SECRET")?,
            notification,
            log_dir: non_empty(&lookup, "LOG_DIR").map(PathBuf::from),
        })
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    non_empty(lookup, key).ok_or_else(|| Error::config(format!("{} must be set", key)))
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::config(format!("Invalid {}: {}", key, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_with(extra: &[(&str, &str)]) -> HashMap<String, String> {
        let keys = VapidKeyPair::generate();
        let mut env = HashMap::from([
            (
                "WEB_PUSH_VAPID_PUBLIC_KEY".to_string(),
                keys.public_key_base64url(),
            ),
            (
                "WEB_PUSH_VAPID_PRIVATE_KEY".to_string(),
                keys.private_key_base64url(),
            ),
            ("PUSH_TRIGGER_SECRET".to_string(), "s3cret".to_string()),
        ]);
        for (k, v) in extra {
            env.insert(k.to_string(), v.to_string());
        }
        env
    }

    fn load(env: &HashMap<String, String>) -> Result<AppConfig> {
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&env_with(&[])).unwrap();

        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(
            config.server.listen_addr,
            "0.0.0.0:12556".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(config.web_push.subject, DEFAULT_VAPID_SUBJECT);
        assert_eq!(config.web_push.ttl_secs, 86_400);
        assert_eq!(config.web_push.concurrency, 16);
        assert_eq!(config.web_push.request_timeout, Duration::from_secs(15));
        assert_eq!(config.notification, Notification::default());
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&env_with(&[
            ("WEB_PUSH_TTL_SECS", "60"),
            ("WEB_PUSH_CONCURRENCY", "4"),
            ("NOTIFICATION_TITLE", "Alerta"),
            ("LOG_DIR", "/var/log/fleet-push"),
            ("API_BIND_ADDRESS", "127.0.0.1"),
            ("API_PORT", "8080"),
        ]))
        .unwrap();

        assert_eq!(
            config.server.listen_addr,
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );

        assert_eq!(config.web_push.ttl_secs, 60);
        assert_eq!(config.web_push.concurrency, 4);
        assert_eq!(config.notification.title, "Alerta");
        assert_eq!(config.notification.body, Notification::default().body);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/fleet-push")));
    }

    #[test]
    fn test_missing_trigger_secret_is_fatal() {
        let mut env = env_with(&[]);
        env.remove("PUSH_TRIGGER_SECRET");
        assert!(matches!(load(&env), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_missing_vapid_key_is_fatal() {
        let mut env = env_with(&[]);
        env.remove("WEB_PUSH_VAPID_PRIVATE_KEY");
        assert!(matches!(load(&env), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_mismatched_vapid_keys_are_fatal() {
        let other = VapidKeyPair::generate();
        let env = env_with(&[(
            "WEB_PUSH_VAPID_PRIVATE_KEY",
            other.private_key_base64url().as_str(),
        )]);
        assert!(matches!(load(&env), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let env = env_with(&[("WEB_PUSH_TIMEOUT_SECS", "soon")]);
        assert!(matches!(load(&env), Err(Error::Configuration(_))));

        let env = env_with(&[("WEB_PUSH_CONCURRENCY", "0")]);
        assert!(matches!(load(&env), Err(Error::Configuration(_))));

        let env = env_with(&[("API_PORT", "70000")]);
        assert!(matches!(load(&env), Err(Error::Configuration(_))));
    }
}
