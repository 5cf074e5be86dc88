//! Binary/text conversions used on the Web Push wire.
//!
//! Browsers hand out `p256dh` and `auth` as unpadded base64url, VAPID tokens are
//! base64url-encoded JWT segments, and push services expect ES256 signatures as
//! the raw `r || s` concatenation rather than ASN.1 DER.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use p256::ecdsa::Signature;

use crate::error::{Result, WebPushError};

/// Width of an ES256 signature in fixed (`r || s`) form.
pub const FIXED_SIGNATURE_LEN: usize = 64;

/// URL-safe alphabet, emits no padding, accepts input with or without it.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes as base64url without trailing `=`.
pub fn base64url_encode(input: impl AsRef<[u8]>) -> String {
    URL_SAFE_LENIENT.encode(input)
}

/// Decode base64url, tolerating optional padding.
///
/// Values copied out of a browser console sometimes carry the standard
/// alphabet (`+`, `/`); those characters are mapped to their URL-safe
/// counterparts before decoding.
pub fn base64url_decode(input: &str) -> Result<Vec<u8>> {
    let input = input.trim();
    if input.contains(['+', '/']) {
        let normalized: String = input
            .chars()
            .map(|c| match c {
                '+' => '-',
                '/' => '_',
                other => other,
            })
            .collect();
        return Ok(URL_SAFE_LENIENT.decode(normalized)?);
    }
    Ok(URL_SAFE_LENIENT.decode(input)?)
}

/// Normalize an ECDSA P-256 signature to the fixed-width `r || s` form.
///
/// Signers may emit either encoding. A 64-byte input is already fixed-width and
/// is returned unchanged; anything else is parsed as a DER
/// `SEQUENCE { INTEGER r, INTEGER s }`, which right-aligns each component into
/// its 32-byte slot regardless of sign bytes or short integers.
pub fn der_signature_to_fixed_width(signature: &[u8]) -> Result<[u8; FIXED_SIGNATURE_LEN]> {
    if let Ok(fixed) = <[u8; FIXED_SIGNATURE_LEN]>::try_from(signature) {
        return Ok(fixed);
    }

    let parsed =
        Signature::from_der(signature).map_err(|e| WebPushError::Signature(e.to_string()))?;

    let mut fixed = [0u8; FIXED_SIGNATURE_LEN];
    fixed.copy_from_slice(parsed.to_bytes().as_slice());
    Ok(fixed)
}
