//! P-256 key pairs and remote public keys for Web Push key agreement.
//!
//! Public keys travel as 65-byte uncompressed SEC1 points (`0x04 || x || y`),
//! the form browsers hand out in a subscription's `p256dh` field and the
//! form the `aes128gcm` header carries as its key id.

use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64url_decode, to_array, PRIVATE_KEY_LENGTH, PUBLIC_KEY_LENGTH};

/// Local P-256 key pair used for ECDH.
///
/// The secret scalar is zeroized on drop by `p256`.
#[derive(Clone)]
pub struct EcKeyPair {
    secret: SecretKey,
    public: [u8; PUBLIC_KEY_LENGTH],
}

impl EcKeyPair {
    /// Generate a fresh key pair.
    pub fn generate() -> Self {
        Self::from_secret(SecretKey::random(&mut rand::thread_rng()))
    }

    /// Import a raw 32-byte private scalar.
    pub fn from_raw(private_key: &[u8]) -> CryptoResult<Self> {
        if private_key.len() != PRIVATE_KEY_LENGTH {
            return Err(CryptoError::key_length(
                "private key",
                PRIVATE_KEY_LENGTH,
                private_key.len(),
            ));
        }
        let secret = SecretKey::from_slice(private_key)
            .map_err(|_| CryptoError::InvalidKey("private key is not a valid P-256 scalar".into()))?;
        Ok(Self::from_secret(secret))
    }

    /// Import a base64url-encoded raw private scalar.
    pub fn from_base64url(private_key: &str) -> CryptoResult<Self> {
        let raw = Zeroizing::new(base64url_decode("private key", private_key)?);
        Self::from_raw(&raw)
    }

    fn from_secret(secret: SecretKey) -> Self {
        let point = secret.public_key().to_encoded_point(false);
        let mut public = [0u8; PUBLIC_KEY_LENGTH];
        public.copy_from_slice(point.as_bytes());
        Self { secret, public }
    }

    /// Uncompressed public key.
    pub fn public_key_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.public
    }

    /// Raw private scalar.
    pub fn private_key_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_LENGTH]> {
        let mut out = Zeroizing::new([0u8; PRIVATE_KEY_LENGTH]);
        out.copy_from_slice(&self.secret.to_bytes());
        out
    }

    pub(crate) fn secret_key(&self) -> &SecretKey {
        &self.secret
    }
}

impl std::fmt::Debug for EcKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcKeyPair")
            .field("public", &hex::encode(&self.public[..8]))
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Validated peer public key.
#[derive(Clone)]
pub struct RemotePublicKey {
    key: PublicKey,
    raw: [u8; PUBLIC_KEY_LENGTH],
}

impl RemotePublicKey {
    /// Parse a 65-byte uncompressed point.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let raw: [u8; PUBLIC_KEY_LENGTH] = to_array("public key", bytes)?;
        let key = PublicKey::from_sec1_bytes(&raw)
            .map_err(|_| CryptoError::InvalidKey("public key is not a P-256 point".into()))?;
        Ok(Self { key, raw })
    }

    /// Parse a base64url-encoded uncompressed point.
    pub fn from_base64url(public_key: &str) -> CryptoResult<Self> {
        Self::from_bytes(&base64url_decode("public key", public_key)?)
    }

    /// Raw uncompressed point.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.raw
    }

    pub(crate) fn public_key(&self) -> &PublicKey {
        &self.key
    }
}

impl PartialEq for RemotePublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for RemotePublicKey {}

impl std::fmt::Debug for RemotePublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RemotePublicKey({})", hex::encode(&self.raw[..8]))
    }
}
