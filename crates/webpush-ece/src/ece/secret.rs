//! Raw secret resolution: explicit key, stored key or ECDH.

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::ece::keys::{EcKeyPair, RemotePublicKey};
use crate::ece::params::{Header, Mode, SecretSource};
use crate::error::{CryptoError, CryptoResult};
use crate::format::{ContentEncoding, KEY_LENGTH, SHA256_LENGTH};
use crate::kdf;
use crate::keylog::KeyLogger;

/// Raw ECDH output (the x-coordinate of the shared point).
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; SHA256_LENGTH]);

impl SharedSecret {
    /// Get the raw shared secret bytes.
    pub fn as_bytes(&self) -> &[u8; SHA256_LENGTH] {
        &self.0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedSecret").field(&"[REDACTED]").finish()
    }
}

/// P-256 Diffie-Hellman between a local pair and a peer public key.
pub fn ecdh(local: &EcKeyPair, remote: &RemotePublicKey) -> SharedSecret {
    let shared = p256::ecdh::diffie_hellman(
        local.secret_key().to_nonzero_scalar(),
        remote.public_key().as_affine(),
    );
    let mut out = [0u8; SHA256_LENGTH];
    out.copy_from_slice(shared.raw_secret_bytes());
    SharedSecret(out)
}

/// Secret fed into HKDF, plus the context legacy versions mix into their info strings.
pub(crate) struct AgreedSecret {
    pub(crate) secret: Zeroizing<Vec<u8>>,
    pub(crate) context: Vec<u8>,
}

/// Resolve the input keying material for `header`.
pub(crate) fn agree_secret(
    header: &Header,
    mode: Mode,
    log: KeyLogger<'_>,
) -> CryptoResult<AgreedSecret> {
    let agreed = match header.version {
        ContentEncoding::Aes128Gcm => AgreedSecret {
            secret: webpush_secret(header, mode, log)?,
            context: Vec::new(),
        },
        ContentEncoding::AesGcm | ContentEncoding::AesGcm128 => legacy_secret(header, mode, log)?,
    };
    log.log("secret", &agreed.secret);
    Ok(agreed)
}

fn webpush_secret(
    header: &Header,
    mode: Mode,
    log: KeyLogger<'_>,
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    match &header.source {
        SecretSource::Key(key) => Ok(Zeroizing::new(key.to_vec())),
        SecretSource::Lookup(_) => lookup_key(header),
        SecretSource::Agreement {
            private_key,
            remote,
        } => {
            let remote = remote.as_ref().ok_or(CryptoError::MissingParameter("dh"))?;
            let auth_secret = header
                .auth_secret
                .as_ref()
                .ok_or(CryptoError::MissingParameter("authSecret"))?;
            let (sender, receiver) = roles(private_key, remote, mode);

            let shared = ecdh(private_key, remote);
            log.log("shared secret", shared.as_bytes());
            let info = kdf::webpush_info(receiver, sender);
            log.log("webpush info", &info);
            Ok(Zeroizing::new(kdf::hkdf(
                auth_secret,
                shared.as_bytes(),
                &info,
                SHA256_LENGTH,
            )?))
        }
    }
}

fn legacy_secret(header: &Header, mode: Mode, log: KeyLogger<'_>) -> CryptoResult<AgreedSecret> {
    let (secret, context) = match &header.source {
        SecretSource::Key(key) => (Zeroizing::new(key.to_vec()), Vec::new()),
        SecretSource::Lookup(_) => (lookup_key(header)?, Vec::new()),
        SecretSource::Agreement {
            private_key,
            remote,
        } => {
            let remote = remote.as_ref().ok_or(CryptoError::MissingParameter("dh"))?;
            let (sender, receiver) = roles(private_key, remote, mode);
            let shared = ecdh(private_key, remote);
            log.log("shared secret", shared.as_bytes());
            let context = kdf::dh_context(&header.key_label, receiver, sender)?;
            log.log("context", &context);
            (Zeroizing::new(shared.as_bytes().to_vec()), context)
        }
    };

    let secret = match &header.auth_secret {
        Some(auth_secret) => Zeroizing::new(kdf::hkdf(
            auth_secret,
            &secret,
            &kdf::info("auth", &[]),
            SHA256_LENGTH,
        )?),
        None => secret,
    };
    Ok(AgreedSecret { secret, context })
}

/// Sender and receiver public keys for the given direction.
fn roles<'a>(
    local: &'a EcKeyPair,
    remote: &'a RemotePublicKey,
    mode: Mode,
) -> (&'a [u8], &'a [u8]) {
    match mode {
        Mode::Encrypt => (local.public_key_bytes().as_slice(), remote.as_bytes().as_slice()),
        Mode::Decrypt => (remote.as_bytes().as_slice(), local.public_key_bytes().as_slice()),
    }
}

fn lookup_key(header: &Header) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let SecretSource::Lookup(lookup) = &header.source else {
        return Err(CryptoError::MissingParameter("key"));
    };
    let key_id = header
        .key_id
        .as_deref()
        .ok_or(CryptoError::MissingParameter("keyid"))?;
    let key = lookup
        .lookup(key_id)
        .map(Zeroizing::new)
        .ok_or_else(|| CryptoError::KeyNotFound(String::from_utf8_lossy(key_id).into_owned()))?;
    if key.len() != KEY_LENGTH {
        return Err(CryptoError::key_length("key", KEY_LENGTH, key.len()));
    }
    Ok(key)
}
