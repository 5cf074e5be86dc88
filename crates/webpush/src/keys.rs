//! P-256 key material for VAPID signing and message key agreement.
//!
//! All keys travel as raw bytes: a 32-byte private scalar and a 65-byte
//! uncompressed SEC1 point (`0x04 || X || Y`). Nothing here deals with
//! PKCS#8 or JWK containers.

use std::fmt;

use p256::ecdh::SharedSecret;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::elliptic_curve::rand_core::OsRng;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};

use crate::codec::{base64url_decode, base64url_encode};
use crate::error::{Result, WebPushError};

/// Length of an uncompressed P-256 point.
pub const PUBLIC_KEY_LEN: usize = 65;
/// Length of a P-256 private scalar.
pub const PRIVATE_KEY_LEN: usize = 32;
/// Length of the subscriber `auth` secret.
pub const AUTH_SECRET_LEN: usize = 16;

const UNCOMPRESSED_POINT_TAG: u8 = 0x04;

/// ECDSA P-256 key used to sign VAPID tokens.
#[derive(Clone)]
pub struct VapidSigningKey {
    signing_key: SigningKey,
    public_key: [u8; PUBLIC_KEY_LEN],
}

impl VapidSigningKey {
    /// Uncompressed public point matching this key.
    pub fn public_key_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public_key
    }

    /// Sign `message` with ECDSA-P256-SHA256, DER encoded.
    ///
    /// JWS wants the 64-byte `r || s` form; callers run the output through
    /// [`crate::codec::der_signature_to_fixed_width`].
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(message);
        signature.to_der().as_bytes().to_vec()
    }

    fn private_scalar(&self) -> [u8; PRIVATE_KEY_LEN] {
        let mut scalar = [0u8; PRIVATE_KEY_LEN];
        scalar.copy_from_slice(self.signing_key.to_bytes().as_slice());
        scalar
    }
}

impl fmt::Debug for VapidSigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VapidSigningKey")
            .field("public_key", &base64url_encode(self.public_key))
            .finish_non_exhaustive()
    }
}

/// Import a VAPID key from its raw private scalar and public point.
///
/// The point must be the one derived from the scalar; a mismatched pair would
/// produce tokens the push service rejects for every subscriber.
pub fn import_signing_key(private_scalar: &[u8], public_point: &[u8]) -> Result<VapidSigningKey> {
    let scalar: [u8; PRIVATE_KEY_LEN] = private_scalar.try_into().map_err(|_| {
        WebPushError::InvalidKey(format!(
            "private key must be {} bytes, got {}",
            PRIVATE_KEY_LEN,
            private_scalar.len()
        ))
    })?;
    check_uncompressed_point(public_point).map_err(WebPushError::InvalidKey)?;

    let signing_key = SigningKey::from_bytes((&scalar).into())
        .map_err(|_| WebPushError::InvalidKey("private key is not a valid P-256 scalar".into()))?;

    let derived = signing_key.verifying_key().to_encoded_point(false);
    if derived.as_bytes() != public_point {
        return Err(WebPushError::InvalidKey(
            "public key does not match private key".into(),
        ));
    }

    let mut public_key = [0u8; PUBLIC_KEY_LEN];
    public_key.copy_from_slice(derived.as_bytes());

    Ok(VapidSigningKey {
        signing_key,
        public_key,
    })
}

/// Server VAPID identity, as configured or freshly generated.
#[derive(Clone, Debug)]
pub struct VapidKeyPair {
    signing_key: VapidSigningKey,
}

impl VapidKeyPair {
    /// Generate a new key pair from the OS RNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let point = signing_key.verifying_key().to_encoded_point(false);
        let mut public_key = [0u8; PUBLIC_KEY_LEN];
        public_key.copy_from_slice(point.as_bytes());

        Self {
            signing_key: VapidSigningKey {
                signing_key,
                public_key,
            },
        }
    }

    /// Load a key pair from base64url-encoded public point and private scalar.
    pub fn from_base64url(public_key: &str, private_key: &str) -> Result<Self> {
        let public_raw = base64url_decode(public_key)
            .map_err(|e| WebPushError::InvalidKey(format!("public key: {e}")))?;
        let private_raw = base64url_decode(private_key)
            .map_err(|e| WebPushError::InvalidKey(format!("private key: {e}")))?;

        Ok(Self {
            signing_key: import_signing_key(&private_raw, &public_raw)?,
        })
    }

    pub fn signing_key(&self) -> &VapidSigningKey {
        &self.signing_key
    }

    pub fn public_key_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        self.signing_key.public_key_bytes()
    }

    /// Public key in the form browsers pass to `applicationServerKey`.
    pub fn public_key_base64url(&self) -> String {
        base64url_encode(self.signing_key.public_key)
    }

    pub fn private_key_base64url(&self) -> String {
        base64url_encode(self.signing_key.private_scalar())
    }
}

/// Peer public key for ECDH (a subscriber's `p256dh` or a record's key id).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgreementPublicKey {
    key: PublicKey,
    raw: [u8; PUBLIC_KEY_LEN],
}

impl AgreementPublicKey {
    fn from_public_key(key: PublicKey) -> Self {
        let point = key.to_encoded_point(false);
        let mut raw = [0u8; PUBLIC_KEY_LEN];
        raw.copy_from_slice(point.as_bytes());
        Self { key, raw }
    }

    /// Uncompressed SEC1 encoding.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.raw
    }
}

/// Import a 65-byte uncompressed P-256 point for key agreement.
pub fn import_agreement_public_key(point: &[u8]) -> Result<AgreementPublicKey> {
    check_uncompressed_point(point).map_err(WebPushError::InvalidKey)?;

    let key = PublicKey::from_sec1_bytes(point)
        .map_err(|_| WebPushError::InvalidKey("public key is not a point on P-256".into()))?;

    Ok(AgreementPublicKey::from_public_key(key))
}

/// Private half of an ECDH key pair.
pub struct AgreementPrivateKey {
    secret: SecretKey,
}

impl AgreementPrivateKey {
    /// Import a raw 32-byte scalar, as held by a receiving user agent.
    pub fn from_bytes(scalar: &[u8]) -> Result<Self> {
        if scalar.len() != PRIVATE_KEY_LEN {
            return Err(WebPushError::InvalidKey(format!(
                "private key must be {} bytes, got {}",
                PRIVATE_KEY_LEN,
                scalar.len()
            )));
        }
        let secret = SecretKey::from_slice(scalar)
            .map_err(|_| WebPushError::InvalidKey("private key is not a valid P-256 scalar".into()))?;
        Ok(Self { secret })
    }

    pub fn public_key(&self) -> AgreementPublicKey {
        AgreementPublicKey::from_public_key(self.secret.public_key())
    }

    /// ECDH with `peer`, yielding the 32-byte x-coordinate of the shared point.
    ///
    /// Consumes the key so an ephemeral secret cannot serve a second message.
    pub fn diffie_hellman(self, peer: &AgreementPublicKey) -> SharedSecret {
        p256::ecdh::diffie_hellman(self.secret.to_nonzero_scalar(), peer.key.as_affine())
    }
}

impl fmt::Debug for AgreementPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgreementPrivateKey").finish_non_exhaustive()
    }
}

/// Fresh ECDH pair for a single outgoing message.
pub fn generate_ephemeral_agreement_key_pair() -> (AgreementPrivateKey, AgreementPublicKey) {
    let secret = SecretKey::random(&mut OsRng);
    let public = AgreementPublicKey::from_public_key(secret.public_key());
    (AgreementPrivateKey { secret }, public)
}

fn check_uncompressed_point(point: &[u8]) -> std::result::Result<(), String> {
    if point.len() != PUBLIC_KEY_LEN {
        return Err(format!(
            "public key must be {} bytes, got {}",
            PUBLIC_KEY_LEN,
            point.len()
        ));
    }
    if point[0] != UNCOMPRESSED_POINT_TAG {
        return Err("public key must be an uncompressed point".to_string());
    }
    Ok(())
}
