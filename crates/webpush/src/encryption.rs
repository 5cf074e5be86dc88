//! Message encryption for Web Push (RFC 8291) using the `aes128gcm` content
//! coding (RFC 8188).
//!
//! Every message gets its own ephemeral ECDH key pair and random salt, so two
//! encryptions of the same plaintext for the same subscriber never share key
//! material or ciphertext.

use std::fmt;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes128Gcm, KeyInit};
use hkdf::Hkdf;
use p256::elliptic_curve::rand_core::{OsRng, RngCore};
use sha2::Sha256;

use crate::codec::base64url_decode;
use crate::error::{Result, WebPushError};
use crate::keys::{
    AUTH_SECRET_LEN, AgreementPrivateKey, AgreementPublicKey, PUBLIC_KEY_LEN,
    generate_ephemeral_agreement_key_pair, import_agreement_public_key,
};
use crate::record::{EncryptedRecord, HEADER_LEN, RECORD_SIZE, SALT_LEN, TAG_LEN};

/// Largest plaintext that keeps the request body within the 4096 bytes every
/// push service is required to accept.
pub const MAX_PLAINTEXT_LEN: usize = RECORD_SIZE as usize - HEADER_LEN - TAG_LEN - 1;

const CEK_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const IKM_LEN: usize = 32;

const IKM_INFO_PREFIX: &[u8] = b"WebPush: info\0";
const KEY_INFO: &[u8] = b"Content-Encoding: aes128gcm\0";
const NONCE_INFO: &[u8] = b"Content-Encoding: nonce\0";

/// Delimiter marking the last (and only) record.
const LAST_RECORD_DELIMITER: u8 = 0x02;

/// A subscriber's `p256dh` public key and `auth` secret, validated.
#[derive(Clone, Debug)]
pub struct SubscriberKeys {
    public_key: AgreementPublicKey,
    auth: [u8; AUTH_SECRET_LEN],
}

impl SubscriberKeys {
    pub fn new(p256dh: &[u8], auth: &[u8]) -> Result<Self> {
        let public_key = import_agreement_public_key(p256dh)
            .map_err(|e| WebPushError::InvalidSubscriberKey(format!("p256dh: {e}")))?;
        let auth: [u8; AUTH_SECRET_LEN] = auth.try_into().map_err(|_| {
            WebPushError::InvalidSubscriberKey(format!(
                "auth must be {} bytes, got {}",
                AUTH_SECRET_LEN,
                auth.len()
            ))
        })?;
        Ok(Self { public_key, auth })
    }

    /// Decode the base64url values stored with a browser subscription.
    pub fn from_base64url(p256dh: &str, auth: &str) -> Result<Self> {
        let p256dh = base64url_decode(p256dh)
            .map_err(|e| WebPushError::InvalidSubscriberKey(format!("p256dh: {e}")))?;
        let auth = base64url_decode(auth)
            .map_err(|e| WebPushError::InvalidSubscriberKey(format!("auth: {e}")))?;
        Self::new(&p256dh, &auth)
    }

    pub fn public_key(&self) -> &AgreementPublicKey {
        &self.public_key
    }

    pub fn auth(&self) -> &[u8; AUTH_SECRET_LEN] {
        &self.auth
    }
}

/// Content encryption key and nonce for one record.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentKeys {
    pub cek: [u8; CEK_LEN],
    pub nonce: [u8; NONCE_LEN],
}

impl fmt::Debug for ContentKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentKeys").finish_non_exhaustive()
    }
}

/// Encrypt `plaintext` for a single subscriber.
pub fn encrypt(plaintext: &[u8], subscriber: &SubscriberKeys) -> Result<EncryptedRecord> {
    check_plaintext_len(plaintext)?;

    let (sender_secret, _) = generate_ephemeral_agreement_key_pair();
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    encrypt_with(plaintext, subscriber, sender_secret, salt)
}

fn encrypt_with(
    plaintext: &[u8],
    subscriber: &SubscriberKeys,
    sender_secret: AgreementPrivateKey,
    salt: [u8; SALT_LEN],
) -> Result<EncryptedRecord> {
    let sender_public = sender_secret.public_key();
    let shared_secret = sender_secret.diffie_hellman(subscriber.public_key());

    let keys = derive_content_keys(
        shared_secret.raw_secret_bytes().as_slice(),
        subscriber.auth(),
        &salt,
        subscriber.public_key().as_bytes(),
        sender_public.as_bytes(),
    )?;

    let mut padded = Vec::with_capacity(plaintext.len() + 1);
    padded.extend_from_slice(plaintext);
    padded.push(LAST_RECORD_DELIMITER);

    let cipher = Aes128Gcm::new_from_slice(&keys.cek)
        .map_err(|_| WebPushError::Crypto("invalid content encryption key length"))?;
    let ciphertext = cipher
        .encrypt((&keys.nonce).into(), padded.as_slice())
        .map_err(|_| WebPushError::Crypto("AES-GCM encryption failed"))?;

    Ok(EncryptedRecord {
        salt,
        record_size: RECORD_SIZE,
        key_id: *sender_public.as_bytes(),
        ciphertext,
    })
}

fn check_plaintext_len(plaintext: &[u8]) -> Result<()> {
    if plaintext.is_empty() {
        return Err(WebPushError::EmptyPayload);
    }
    if plaintext.len() > MAX_PLAINTEXT_LEN {
        return Err(WebPushError::PayloadTooLarge {
            len: plaintext.len(),
            max: MAX_PLAINTEXT_LEN,
        });
    }
    Ok(())
}

/// Derive the record key and nonce from an ECDH shared secret.
///
/// `ua_public` is the subscriber's `p256dh`, `as_public` the sender's
/// ephemeral key. The derivation is deterministic in its inputs.
pub fn derive_content_keys(
    shared_secret: &[u8],
    auth_secret: &[u8],
    salt: &[u8],
    ua_public: &[u8],
    as_public: &[u8],
) -> Result<ContentKeys> {
    let ikm = derive_ikm(shared_secret, auth_secret, ua_public, as_public)?;

    let (_, prk) = Hkdf::<Sha256>::extract(Some(salt), &ikm);

    let mut cek = [0u8; CEK_LEN];
    prk.expand(KEY_INFO, &mut cek)
        .map_err(|_| WebPushError::Crypto("HKDF expand failed"))?;
    let mut nonce = [0u8; NONCE_LEN];
    prk.expand(NONCE_INFO, &mut nonce)
        .map_err(|_| WebPushError::Crypto("HKDF expand failed"))?;

    Ok(ContentKeys { cek, nonce })
}

fn derive_ikm(
    shared_secret: &[u8],
    auth_secret: &[u8],
    ua_public: &[u8],
    as_public: &[u8],
) -> Result<[u8; IKM_LEN]> {
    let mut info = Vec::with_capacity(IKM_INFO_PREFIX.len() + PUBLIC_KEY_LEN * 2);
    info.extend_from_slice(IKM_INFO_PREFIX);
    info.extend_from_slice(ua_public);
    info.extend_from_slice(as_public);

    let (_, prk_key) = Hkdf::<Sha256>::extract(Some(auth_secret), shared_secret);
    let mut ikm = [0u8; IKM_LEN];
    prk_key
        .expand(&info, &mut ikm)
        .map_err(|_| WebPushError::Crypto("HKDF expand failed"))?;
    Ok(ikm)
}

/// Decrypt a record addressed to the holder of `recipient`.
///
/// This is the user-agent side of the exchange. The push sender never calls
/// it; it exists for verification tooling.
pub fn decrypt(record: &[u8], recipient: AgreementPrivateKey, auth_secret: &[u8]) -> Result<Vec<u8>> {
    let record = EncryptedRecord::parse(record)?;
    let padded = open(&record, recipient, auth_secret)?;
    strip_padding(padded)
}

fn open(
    record: &EncryptedRecord,
    recipient: AgreementPrivateKey,
    auth_secret: &[u8],
) -> Result<Vec<u8>> {
    let sender_public = import_agreement_public_key(&record.key_id)
        .map_err(|e| WebPushError::MalformedRecord(format!("key id: {e}")))?;
    let recipient_public = recipient.public_key();
    let shared_secret = recipient.diffie_hellman(&sender_public);

    let keys = derive_content_keys(
        shared_secret.raw_secret_bytes().as_slice(),
        auth_secret,
        &record.salt,
        recipient_public.as_bytes(),
        sender_public.as_bytes(),
    )?;

    let cipher = Aes128Gcm::new_from_slice(&keys.cek)
        .map_err(|_| WebPushError::Crypto("invalid content encryption key length"))?;
    cipher
        .decrypt((&keys.nonce).into(), record.ciphertext.as_slice())
        .map_err(|_| WebPushError::Crypto("AES-GCM decryption failed"))
}

fn strip_padding(mut padded: Vec<u8>) -> Result<Vec<u8>> {
    while padded.last() == Some(&0) {
        padded.pop();
    }
    match padded.pop() {
        Some(LAST_RECORD_DELIMITER) => Ok(padded),
        _ => Err(WebPushError::MalformedRecord(
            "missing last-record delimiter".into(),
        )),
    }
}
