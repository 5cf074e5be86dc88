//! Error types for Web Push authentication and payload encryption.

use thiserror::Error;

/// Result type alias for Web Push operations.
pub type Result<T> = std::result::Result<T, WebPushError>;

/// Errors that can occur while preparing a Web Push message.
#[derive(Error, Debug)]
pub enum WebPushError {
    /// Input was not valid base64url.
    #[error("invalid base64url input: {0}")]
    Decode(#[from] base64::DecodeError),

    /// An ECDSA signature could not be decoded.
    #[error("invalid signature encoding: {0}")]
    Signature(String),

    /// Server-side key material (VAPID) is malformed.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The subscriber's `p256dh` or `auth` value is malformed.
    #[error("invalid subscriber key: {0}")]
    InvalidSubscriberKey(String),

    /// The push endpoint cannot be used as a VAPID audience.
    #[error("invalid push endpoint: {0}")]
    InvalidEndpoint(String),

    /// Web Push messages must carry at least one byte of payload.
    #[error("web push payload cannot be empty")]
    EmptyPayload,

    /// Payload does not fit into a single aes128gcm record.
    #[error("payload too large: {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge {
        /// Plaintext length in bytes.
        len: usize,
        /// Maximum plaintext length.
        max: usize,
    },

    /// An encrypted record failed header validation.
    #[error("malformed aes128gcm record: {0}")]
    MalformedRecord(String),

    /// A cryptographic primitive failed.
    #[error("crypto failure: {0}")]
    Crypto(&'static str),

    /// JSON serialization of the VAPID token failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
