//! HKDF-SHA256 key derivation and the info strings fed into it.
//!
//! Every content-encoding version derives its AEAD key and nonce base the
//! same way, `HKDF(salt, secret, info)`. The versions differ only in the
//! `info` input, built here.

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{CryptoError, CryptoResult};
use crate::format::SHA256_LENGTH;

type HmacSha256 = Hmac<Sha256>;

const CONTENT_ENCODING_PREFIX: &str = "Content-Encoding: ";
const WEBPUSH_INFO_PREFIX: &[u8] = b"WebPush: info\0";

/// HMAC-SHA256 of `input` under `key`.
///
/// [`hkdf_extract`] computes the same value (`hmac_sha256(salt, ikm)`) through
/// the `hkdf` crate; this is the building block for callers composing their
/// own derivations.
pub fn hmac_sha256(key: &[u8], input: &[u8]) -> CryptoResult<[u8; SHA256_LENGTH]> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    mac.update(input);
    let mut out = [0u8; SHA256_LENGTH];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// HKDF extract step: `PRK = HMAC(salt, ikm)`.
pub fn hkdf_extract(salt: &[u8], ikm: &[u8]) -> [u8; SHA256_LENGTH] {
    let (prk, _) = Hkdf::<Sha256>::extract(Some(salt), ikm);
    let mut out = [0u8; SHA256_LENGTH];
    out.copy_from_slice(&prk);
    out
}

/// HKDF expand step.
///
/// Output is limited to 255 blocks by the one-byte block counter.
pub fn hkdf_expand(prk: &[u8], info: &[u8], length: usize) -> CryptoResult<Vec<u8>> {
    let hkdf = Hkdf::<Sha256>::from_prk(prk)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let mut okm = vec![0u8; length];
    hkdf.expand(info, &mut okm)
        .map_err(|e| CryptoError::KeyDerivation(format!("{} ({} bytes requested)", e, length)))?;
    Ok(okm)
}

/// Extract-then-expand.
pub fn hkdf(salt: &[u8], ikm: &[u8], info: &[u8], length: usize) -> CryptoResult<Vec<u8>> {
    hkdf_expand(&hkdf_extract(salt, ikm), info, length)
}

/// `"Content-Encoding: " || label || 0x00 || context`.
pub fn info(label: &str, context: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(CONTENT_ENCODING_PREFIX.len() + label.len() + 1 + context.len());
    out.extend_from_slice(CONTENT_ENCODING_PREFIX.as_bytes());
    out.extend_from_slice(label.as_bytes());
    out.push(0);
    out.extend_from_slice(context);
    out
}

/// `"WebPush: info" || 0x00 || receiver || sender`, the RFC 8291 IKM context.
pub fn webpush_info(receiver_public: &[u8], sender_public: &[u8]) -> Vec<u8> {
    let mut out =
        Vec::with_capacity(WEBPUSH_INFO_PREFIX.len() + receiver_public.len() + sender_public.len());
    out.extend_from_slice(WEBPUSH_INFO_PREFIX);
    out.extend_from_slice(receiver_public);
    out.extend_from_slice(sender_public);
    out
}

/// Two-byte big-endian length followed by the bytes.
pub fn length_prefixed(data: &[u8]) -> CryptoResult<Vec<u8>> {
    let len = u16::try_from(data.len()).map_err(|_| {
        CryptoError::InvalidParameter(format!("{} bytes do not fit a 2-byte length", data.len()))
    })?;
    let mut out = Vec::with_capacity(2 + data.len());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(data);
    Ok(out)
}

/// Legacy Diffie-Hellman context: `label || 0x00 || lp(receiver) || lp(sender)`.
pub fn dh_context(
    key_label: &str,
    receiver_public: &[u8],
    sender_public: &[u8],
) -> CryptoResult<Vec<u8>> {
    let mut out = Vec::with_capacity(key_label.len() + 5 + receiver_public.len() + sender_public.len());
    out.extend_from_slice(key_label.as_bytes());
    out.push(0);
    out.extend(length_prefixed(receiver_public)?);
    out.extend(length_prefixed(sender_public)?);
    Ok(out)
}
