//! Key/nonce derivation, record padding and the record loops.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cipher::{aes_gcm_decrypt, aes_gcm_encrypt};
use crate::error::{CryptoError, CryptoResult};
use crate::format::{
    to_array, ContentEncoding, PaddingScheme, KEY_LENGTH, NONCE_LENGTH, SALT_LENGTH, TAG_LENGTH,
};
use crate::kdf;
use crate::keylog::KeyLogger;

const AES128GCM_KEY_INFO: &[u8] = b"Content-Encoding: aes128gcm\0";
const AES128GCM_NONCE_INFO: &[u8] = b"Content-Encoding: nonce\0";
const AESGCM128_KEY_INFO: &[u8] = b"Content-Encoding: aesgcm128";
const AESGCM128_NONCE_INFO: &[u8] = b"Content-Encoding: nonce";

/// Content-encryption key and nonce base for one message.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKeyMaterial {
    key: [u8; KEY_LENGTH],
    nonce_base: [u8; NONCE_LENGTH],
}

impl DerivedKeyMaterial {
    /// AEAD key.
    pub fn key(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }

    /// Nonce base, XORed with the record counter.
    pub fn nonce_base(&self) -> &[u8; NONCE_LENGTH] {
        &self.nonce_base
    }

    /// Nonce for record `counter`.
    pub fn nonce(&self, counter: u64) -> [u8; NONCE_LENGTH] {
        record_nonce(&self.nonce_base, counter)
    }
}

impl std::fmt::Debug for DerivedKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKeyMaterial")
            .field("key", &"[REDACTED]")
            .field("nonce_base", &"[REDACTED]")
            .finish()
    }
}

/// Derive the AEAD key and nonce base from the agreed secret.
///
/// `context` is only used by `aesgcm`.
pub(crate) fn derive_key_and_nonce(
    secret: &[u8],
    salt: &[u8; SALT_LENGTH],
    version: ContentEncoding,
    context: &[u8],
    log: KeyLogger<'_>,
) -> CryptoResult<DerivedKeyMaterial> {
    let (key_info, nonce_info) = match version {
        ContentEncoding::Aes128Gcm => (AES128GCM_KEY_INFO.to_vec(), AES128GCM_NONCE_INFO.to_vec()),
        ContentEncoding::AesGcm => (kdf::info("aesgcm", context), kdf::info("nonce", context)),
        ContentEncoding::AesGcm128 => (AESGCM128_KEY_INFO.to_vec(), AESGCM128_NONCE_INFO.to_vec()),
    };

    let prk = zeroize::Zeroizing::new(kdf::hkdf_extract(salt, secret));
    let key = zeroize::Zeroizing::new(kdf::hkdf_expand(prk.as_slice(), &key_info, KEY_LENGTH)?);
    let nonce_base = kdf::hkdf_expand(prk.as_slice(), &nonce_info, NONCE_LENGTH)?;

    log.log("key info", &key_info);
    log.log("nonce info", &nonce_info);
    log.log("key", &key);
    log.log("nonce base", &nonce_base);

    Ok(DerivedKeyMaterial {
        key: to_array("derived key", &key)?,
        nonce_base: to_array("nonce base", &nonce_base)?,
    })
}

/// `nonce_base XOR counter`, with the counter as 48-bit big-endian in the low six bytes.
pub fn record_nonce(nonce_base: &[u8; NONCE_LENGTH], counter: u64) -> [u8; NONCE_LENGTH] {
    let mut nonce = *nonce_base;
    let counter = counter.to_be_bytes();
    for (n, c) in nonce[NONCE_LENGTH - 6..].iter_mut().zip(&counter[2..]) {
        *n ^= c;
    }
    nonce
}

/// Build the record plaintext: data plus `pad` zero bytes, framed per version.
pub fn pad_record(data: &[u8], pad: usize, version: ContentEncoding, last: bool) -> Vec<u8> {
    let profile = version.profile();
    let mut out = Vec::with_capacity(profile.pad_size + pad + data.len());
    match profile.padding {
        PaddingScheme::Delimiter => {
            out.extend_from_slice(data);
            out.push(if last { 2 } else { 1 });
            out.resize(out.len() + pad, 0);
        }
        PaddingScheme::LengthPrefix => {
            let prefix = (pad as u64).to_be_bytes();
            out.extend_from_slice(&prefix[8 - profile.pad_size..]);
            out.resize(out.len() + pad, 0);
            out.extend_from_slice(data);
        }
    }
    out
}

/// Strip record framing, returning the data.
pub fn unpad_record(mut record: Vec<u8>, version: ContentEncoding, last: bool) -> CryptoResult<Vec<u8>> {
    let profile = version.profile();
    match profile.padding {
        PaddingScheme::Delimiter => {
            let end = record
                .iter()
                .rposition(|b| *b != 0)
                .ok_or_else(|| CryptoError::InvalidPadding("all zero plaintext".into()))?;
            let expected = if last { 2 } else { 1 };
            if record[end] != expected {
                return Err(CryptoError::InvalidPadding(format!(
                    "delimiter {} where {} was expected",
                    record[end], expected
                )));
            }
            record.truncate(end);
            Ok(record)
        }
        PaddingScheme::LengthPrefix => {
            let pad_size = profile.pad_size;
            if record.len() < pad_size {
                return Err(CryptoError::InvalidPadding("record shorter than pad length".into()));
            }
            let pad = record[..pad_size]
                .iter()
                .fold(0usize, |acc, b| (acc << 8) | *b as usize);
            if pad + pad_size > record.len() {
                return Err(CryptoError::InvalidPadding("padding exceeds block size".into()));
            }
            if record[pad_size..pad_size + pad].iter().any(|b| *b != 0) {
                return Err(CryptoError::InvalidPadding("non-zero padding bytes".into()));
            }
            Ok(record.split_off(pad_size + pad))
        }
    }
}

/// Pad and seal one record.
pub(crate) fn encrypt_record(
    material: &DerivedKeyMaterial,
    counter: u64,
    data: &[u8],
    pad: usize,
    version: ContentEncoding,
    last: bool,
    log: KeyLogger<'_>,
) -> CryptoResult<Vec<u8>> {
    let padded = zeroize::Zeroizing::new(pad_record(data, pad, version, last));
    let nonce = material.nonce(counter);
    log.log("nonce", &nonce);
    aes_gcm_encrypt(&material.key, &nonce, &padded)
}

/// Open one record and strip its padding.
pub(crate) fn decrypt_record(
    material: &DerivedKeyMaterial,
    counter: u64,
    record: &[u8],
    version: ContentEncoding,
    last: bool,
    log: KeyLogger<'_>,
) -> CryptoResult<Vec<u8>> {
    let nonce = material.nonce(counter);
    log.log("nonce", &nonce);
    let padded = aes_gcm_decrypt(&material.key, &nonce, record)?;
    unpad_record(padded, version, last)
}

/// Split `plaintext` into records and seal each one.
///
/// Non-final records fill the record size exactly. `pad` zero bytes are
/// spread over the records, front first; whatever cannot be placed once the
/// data runs out (only possible with one-byte legacy pad lengths) is dropped.
pub(crate) fn encrypt_records(
    material: &DerivedKeyMaterial,
    plaintext: &[u8],
    version: ContentEncoding,
    record_size: u32,
    pad: usize,
    log: KeyLogger<'_>,
) -> CryptoResult<Vec<u8>> {
    let profile = version.profile();
    let room = record_size as usize - profile.overhead();
    let max_pad = profile.max_record_pad();
    let legacy = profile.padding == PaddingScheme::LengthPrefix;

    let capacity = plaintext.len().saturating_add(pad).saturating_add(TAG_LENGTH);
    let mut out = Vec::with_capacity(capacity);
    let mut pad_budget = pad;
    let mut start = 0usize;
    let mut counter = 0u64;

    loop {
        let remaining = plaintext.len() - start;
        // Leave space for at least one data byte.
        let mut record_pad = pad_budget.min(room.saturating_sub(1)).min(max_pad);
        let take = remaining.min(room - record_pad);
        let exhausted = take == remaining;
        if exhausted {
            let extra = (pad_budget - record_pad)
                .min(room - record_pad - take)
                .min(max_pad - record_pad);
            record_pad += extra;
        }
        pad_budget -= record_pad;

        let filled = take + record_pad == room;
        // Legacy decoders find the end by a short record, so a full final
        // record is followed by an empty one.
        let last = exhausted && (!filled || (!legacy && pad_budget == 0));

        let chunk = &plaintext[start..start + take];
        let record = encrypt_record(material, counter, chunk, record_pad, version, last, log)?;
        tracing::trace!(counter, data = take, pad = record_pad, last, "sealed record");
        out.extend(record);

        if last {
            if pad_budget > 0 {
                tracing::debug!(dropped = pad_budget, "padding did not fit the final record");
            }
            break;
        }
        start += take;
        counter += 1;
    }
    Ok(out)
}

/// Open every record in `body`.
pub(crate) fn decrypt_records(
    material: &DerivedKeyMaterial,
    body: &[u8],
    version: ContentEncoding,
    record_size: u32,
    log: KeyLogger<'_>,
) -> CryptoResult<Vec<u8>> {
    let profile = version.profile();
    let window = profile.ciphertext_window(record_size as usize);
    let legacy = profile.padding == PaddingScheme::LengthPrefix;

    if body.is_empty() {
        return Err(CryptoError::Truncated("no records".into()));
    }

    let mut out = Vec::with_capacity(body.len());
    let mut start = 0usize;
    let mut counter = 0u64;

    while start < body.len() {
        let mut end = start + window;
        if legacy && end == body.len() {
            return Err(CryptoError::Truncated(
                "final record must be shorter than the record size".into(),
            ));
        }
        end = end.min(body.len());
        if end - start <= TAG_LENGTH {
            return Err(CryptoError::Truncated(format!(
                "record {} is only {} bytes",
                counter,
                end - start
            )));
        }
        let last = end >= body.len();
        let data = decrypt_record(material, counter, &body[start..end], version, last, log)?;
        tracing::trace!(counter, data = data.len(), last, "opened record");
        out.extend(data);
        start = end;
        counter += 1;
    }
    Ok(out)
}
