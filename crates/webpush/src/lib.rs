//! # webpush
//!
//! Protocol pieces for sending Web Push messages: VAPID request
//! authentication (RFC 8292) and `aes128gcm` message encryption (RFC 8291).
//!
//! The crate performs no I/O. Callers supply the subscription data, POST the
//! resulting body with the returned headers and interpret the push service's
//! response themselves.
//!
//! ```no_run
//! use webpush::{SubscriberKeys, VapidAuthenticator, VapidKeyPair, encrypt};
//!
//! # fn main() -> webpush::Result<()> {
//! let keys = VapidKeyPair::generate();
//! let vapid = VapidAuthenticator::new(&keys, "mailto:ops@example.com");
//!
//! let subscriber = SubscriberKeys::from_base64url("BCVx...", "BTBZ...")?;
//! let headers = vapid.headers_for("https://fcm.googleapis.com/fcm/send/abc")?;
//! let body = encrypt(br#"{"title":"hello"}"#, &subscriber)?.to_bytes();
//! # let _ = (headers, body);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod encryption;
pub mod error;
pub mod keys;
pub mod record;
pub mod vapid;

pub use codec::{base64url_decode, base64url_encode, der_signature_to_fixed_width};
pub use encryption::{
    ContentKeys, MAX_PLAINTEXT_LEN, SubscriberKeys, decrypt, derive_content_keys, encrypt,
};
pub use error::{Result, WebPushError};
pub use keys::{
    AgreementPrivateKey, AgreementPublicKey, VapidKeyPair, VapidSigningKey,
    generate_ephemeral_agreement_key_pair, import_agreement_public_key, import_signing_key,
};
pub use record::EncryptedRecord;
pub use vapid::{VapidAuthenticator, VapidHeaders, push_service_audience};
