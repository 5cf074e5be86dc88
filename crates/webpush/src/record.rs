//! The RFC 8188 `aes128gcm` record as sent in a Web Push request body.
//!
//! ```text
//! +-----------+--------+-----------+---------------+---------------------+
//! | salt (16) | rs (4) | idlen (1) | keyid (idlen) | ciphertext || tag   |
//! +-----------+--------+-----------+---------------+---------------------+
//! ```
//!
//! All integers are big-endian. Web Push always uses the sender's ephemeral
//! P-256 public key as the key id and a single record per message.

use crate::error::{Result, WebPushError};
use crate::keys::PUBLIC_KEY_LEN;

/// Length of the per-message HKDF salt.
pub const SALT_LEN: usize = 16;
/// Record size advertised in the header.
pub const RECORD_SIZE: u32 = 4096;
/// Length of the fixed header for a 65-byte key id.
pub const HEADER_LEN: usize = SALT_LEN + 4 + 1 + PUBLIC_KEY_LEN;
/// AES-GCM authentication tag length.
pub const TAG_LEN: usize = 16;

/// Smallest record size RFC 8188 permits.
const MIN_RECORD_SIZE: u32 = 18;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedRecord {
    pub salt: [u8; SALT_LEN],
    pub record_size: u32,
    /// The sender's ephemeral public key.
    pub key_id: [u8; PUBLIC_KEY_LEN],
    /// Ciphertext with the GCM tag appended.
    pub ciphertext: Vec<u8>,
}

impl EncryptedRecord {
    /// Serialize to the request body layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(self.encoded_len());
        body.extend_from_slice(&self.salt);
        body.extend_from_slice(&self.record_size.to_be_bytes());
        body.push(PUBLIC_KEY_LEN as u8);
        body.extend_from_slice(&self.key_id);
        body.extend_from_slice(&self.ciphertext);
        body
    }

    /// Parse and validate a single-record body.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN + TAG_LEN + 1 {
            return Err(WebPushError::MalformedRecord(format!(
                "record too short: {} bytes",
                bytes.len()
            )));
        }

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&bytes[..SALT_LEN]);

        let mut rs = [0u8; 4];
        rs.copy_from_slice(&bytes[SALT_LEN..SALT_LEN + 4]);
        let record_size = u32::from_be_bytes(rs);
        if record_size < MIN_RECORD_SIZE {
            return Err(WebPushError::MalformedRecord(format!(
                "record size {record_size} is below the minimum of {MIN_RECORD_SIZE}"
            )));
        }

        let idlen = bytes[SALT_LEN + 4] as usize;
        if idlen != PUBLIC_KEY_LEN {
            return Err(WebPushError::MalformedRecord(format!(
                "key id must be {PUBLIC_KEY_LEN} bytes, got {idlen}"
            )));
        }

        let mut key_id = [0u8; PUBLIC_KEY_LEN];
        key_id.copy_from_slice(&bytes[SALT_LEN + 5..HEADER_LEN]);

        let ciphertext = bytes[HEADER_LEN..].to_vec();
        if ciphertext.len() > record_size as usize {
            return Err(WebPushError::MalformedRecord(format!(
                "ciphertext of {} bytes spans more than one {}-byte record",
                ciphertext.len(),
                record_size
            )));
        }

        Ok(Self {
            salt,
            record_size,
            key_id,
            ciphertext,
        })
    }

    /// Total encoded length.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.ciphertext.len()
    }
}
