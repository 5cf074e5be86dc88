//! VAPID (RFC 8292) authentication for push service requests.

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use crate::codec::{base64url_encode, der_signature_to_fixed_width};
use crate::error::{Result, WebPushError};
use crate::keys::{VapidKeyPair, VapidSigningKey};

/// Default token lifetime. RFC 8292 caps it at 24 hours.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 12 * 60 * 60;

/// Header values proving the sender's identity to one push service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VapidHeaders {
    /// `Authorization` value: `vapid t=<jwt>, k=<public key>`.
    pub authorization: String,
    /// `Crypto-Key` value: `p256ecdsa=<public key>`.
    pub crypto_key: String,
}

#[derive(Serialize)]
struct JwtHeader {
    typ: &'static str,
    alg: &'static str,
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    aud: &'a str,
    exp: i64,
    sub: &'a str,
}

/// Builds signed VAPID headers for each push endpoint.
///
/// The audience differs between push services, so headers are built per
/// delivery attempt rather than once per run.
#[derive(Debug, Clone)]
pub struct VapidAuthenticator {
    signing_key: VapidSigningKey,
    public_key: String,
    subject: String,
    token_ttl_secs: i64,
}

impl VapidAuthenticator {
    pub fn new(keys: &VapidKeyPair, subject: &str) -> Self {
        Self {
            signing_key: keys.signing_key().clone(),
            public_key: keys.public_key_base64url(),
            subject: normalize_subject(subject),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
        }
    }

    pub fn with_token_ttl_secs(mut self, secs: i64) -> Self {
        self.token_ttl_secs = secs;
        self
    }

    /// Contact URI placed in the `sub` claim.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn public_key_base64url(&self) -> &str {
        &self.public_key
    }

    /// Headers for a request to `endpoint`, valid from now.
    pub fn headers_for(&self, endpoint: &str) -> Result<VapidHeaders> {
        self.headers_at(endpoint, Utc::now())
    }

    pub fn headers_at(&self, endpoint: &str, now: DateTime<Utc>) -> Result<VapidHeaders> {
        let audience = push_service_audience(endpoint)?;
        let token = self.sign_token(&audience, now.timestamp() + self.token_ttl_secs)?;

        Ok(VapidHeaders {
            authorization: format!("vapid t={}, k={}", token, self.public_key),
            crypto_key: format!("p256ecdsa={}", self.public_key),
        })
    }

    fn sign_token(&self, audience: &str, exp: i64) -> Result<String> {
        let header = JwtHeader {
            typ: "JWT",
            alg: "ES256",
        };
        let claims = JwtClaims {
            aud: audience,
            exp,
            sub: &self.subject,
        };

        let signing_input = format!(
            "{}.{}",
            base64url_encode(serde_json::to_vec(&header)?),
            base64url_encode(serde_json::to_vec(&claims)?)
        );

        let signature = self.signing_key.sign(signing_input.as_bytes());
        let signature = der_signature_to_fixed_width(&signature)?;

        Ok(format!("{}.{}", signing_input, base64url_encode(signature)))
    }
}

/// Origin of a push endpoint: scheme, host and any explicit non-default port.
pub fn push_service_audience(endpoint: &str) -> Result<String> {
    let url = Url::parse(endpoint)
        .map_err(|e| WebPushError::InvalidEndpoint(format!("{endpoint}: {e}")))?;

    if !matches!(url.scheme(), "https" | "http") {
        return Err(WebPushError::InvalidEndpoint(format!(
            "unsupported scheme {}",
            url.scheme()
        )));
    }

    let host = url
        .host()
        .ok_or_else(|| WebPushError::InvalidEndpoint(format!("{endpoint}: missing host")))?;
    let host = match host {
        url::Host::Domain(d) => d.to_string(),
        url::Host::Ipv4(ip) => ip.to_string(),
        url::Host::Ipv6(ip) => format!("[{}]", ip),
    };

    // `Url::port` is `None` when the port is the scheme default.
    let audience = match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    };
    Ok(audience)
}

fn normalize_subject(subject: &str) -> String {
    let subject = subject.trim();
    if subject.starts_with("mailto:") || subject.starts_with("https:") {
        subject.to_string()
    } else {
        format!("mailto:{subject}")
    }
}
