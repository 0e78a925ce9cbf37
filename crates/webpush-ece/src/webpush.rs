//! Message encryption for a browser push subscription.
//!
//! A subscription carries the user agent's P-256 public key (`p256dh`) and
//! a 16-byte authentication secret (`auth`), both base64url. Each message
//! gets a fresh sender key pair and salt; for the legacy `aesgcm` encoding
//! those travel in the `Crypto-Key` and `Encryption` HTTP headers instead of
//! the body.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ece::keys::EcKeyPair;
use crate::ece::params::EceParams;
use crate::ece::Ece;
use crate::error::CryptoResult;
use crate::format::{
    base64url_bytes, base64url_decode, base64url_encode, ContentEncoding, PUBLIC_KEY_LENGTH,
    SALT_LENGTH,
};

/// The `keys` object of a `PushSubscription`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// User agent public key, base64url.
    pub p256dh: String,
    /// Authentication secret, base64url.
    pub auth: String,
}

impl SubscriptionKeys {
    /// Build from raw key bytes.
    pub fn from_bytes(p256dh: &[u8], auth: &[u8]) -> Self {
        Self {
            p256dh: base64url_encode(p256dh),
            auth: base64url_encode(auth),
        }
    }
}

/// Encrypted body plus what the push request needs alongside it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    /// Request body.
    #[serde(with = "base64url_bytes")]
    pub body: Vec<u8>,
    /// Value for the `Content-Encoding` header.
    pub content_encoding: ContentEncoding,
    /// Message salt.
    #[serde(with = "base64url_bytes")]
    pub salt: [u8; SALT_LENGTH],
    /// Ephemeral sender public key.
    #[serde(with = "base64url_bytes")]
    pub sender_public_key: [u8; PUBLIC_KEY_LENGTH],
}

impl EncryptedPayload {
    /// `Encryption` header value, sent only with legacy encodings.
    pub fn encryption_header(&self) -> Option<String> {
        self.content_encoding
            .is_legacy()
            .then(|| format!("salt={}", base64url_encode(&self.salt)))
    }

    /// `Crypto-Key` header value, sent only with legacy encodings.
    pub fn crypto_key_header(&self) -> Option<String> {
        self.content_encoding
            .is_legacy()
            .then(|| format!("dh={}", base64url_encode(&self.sender_public_key)))
    }
}

/// Encrypt `payload` for a subscription with default settings.
pub fn encrypt_for_subscription(
    payload: &[u8],
    keys: &SubscriptionKeys,
    version: ContentEncoding,
) -> CryptoResult<EncryptedPayload> {
    encrypt_for_subscription_with(&Ece::new(), payload, keys, version, 0)
}

/// Encrypt `payload` for a subscription through `engine`, adding `pad` bytes of padding.
pub fn encrypt_for_subscription_with(
    engine: &Ece,
    payload: &[u8],
    keys: &SubscriptionKeys,
    version: ContentEncoding,
    pad: usize,
) -> CryptoResult<EncryptedPayload> {
    let receiver = base64url_decode("p256dh", &keys.p256dh)?;
    let auth = base64url_decode("auth", &keys.auth)?;
    let sender = EcKeyPair::generate();
    let salt = crate::cipher::generate_salt();

    let params = EceParams::new(version)
        .with_private_key(sender.clone())
        .with_dh(receiver)
        .with_auth_secret(auth)
        .with_salt(salt.to_vec())
        .with_pad(pad);
    let body = engine.encrypt(payload, &params)?;

    debug!(
        version = %version,
        payload = payload.len(),
        body = body.len(),
        "encrypted push message"
    );

    Ok(EncryptedPayload {
        body,
        content_encoding: version,
        salt,
        sender_public_key: *sender.public_key_bytes(),
    })
}

/// Decrypt a payload on the user agent side.
pub fn decrypt_subscription_payload(
    payload: &EncryptedPayload,
    receiver: &EcKeyPair,
    auth_secret: &[u8],
) -> CryptoResult<Vec<u8>> {
    let mut params = EceParams::new(payload.content_encoding)
        .with_private_key(receiver.clone())
        .with_auth_secret(auth_secret.to_vec());
    if payload.content_encoding.is_legacy() {
        params = params
            .with_dh(payload.sender_public_key.to_vec())
            .with_salt(payload.salt.to_vec());
    }
    Ece::new().decrypt(&payload.body, &params)
}
