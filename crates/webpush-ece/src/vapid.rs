//! VAPID key conversion: raw base64url keys to an OpenSSL-style PEM.
//!
//! Push services hand out VAPID keys as raw base64url strings (a 32-byte
//! scalar and a 65-byte uncompressed point). JWT signing libraries usually
//! want a SEC1 `EC PRIVATE KEY` PEM instead. The output is the same text
//! `openssl ecparam -genkey -name prime256v1` prints: an `EC PARAMETERS`
//! block naming the curve, then the key.
//!
//! ```text
//! ECPrivateKey ::= SEQUENCE {
//!     version        INTEGER 1,
//!     privateKey     OCTET STRING (32),
//!     parameters [0] OID prime256v1,
//!     publicKey  [1] BIT STRING (0x00 || point)
//! }
//! ```

use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::SecretKey;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64_encode, base64url_decode, base64url_encode, PRIVATE_KEY_LENGTH, PUBLIC_KEY_LENGTH};

/// DER encoding of OID 1.2.840.10045.3.1.7 (prime256v1).
const PRIME256V1_OID: [u8; 10] = [0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07];

/// Width of the BIT STRING content: the unused-bits octet plus the point.
const PUBLIC_KEY_FIELD_LENGTH: usize = PUBLIC_KEY_LENGTH + 1;

const PEM_LINE_WIDTH: usize = 64;

/// Left-pad `buf` with zeros to exactly `size` bytes.
pub fn pad_key_buffer(buf: &[u8], size: usize) -> CryptoResult<Vec<u8>> {
    if buf.len() > size {
        return Err(CryptoError::KeyBufferTooLarge {
            size,
            actual: buf.len(),
        });
    }
    let mut out = vec![0u8; size - buf.len()];
    out.extend_from_slice(buf);
    Ok(out)
}

/// Convert base64url VAPID keys to PEM.
///
/// Short keys (leading zero bytes stripped by some encoders) are left-padded.
pub fn to_pem(private_key: &str, public_key: &str) -> CryptoResult<String> {
    let private_raw = Zeroizing::new(base64url_decode("private key", private_key)?);
    let public_raw = base64url_decode("public key", public_key)?;

    let private_field = Zeroizing::new(pad_key_buffer(&private_raw, PRIVATE_KEY_LENGTH)?);
    let public_field = pad_key_buffer(&public_raw, PUBLIC_KEY_FIELD_LENGTH)?;

    let der = Zeroizing::new(ec_private_key_der(&private_field, &public_field));

    let mut pem = pem_block("EC PARAMETERS", &PRIME256V1_OID);
    pem.push_str(&pem_block("EC PRIVATE KEY", &der));
    Ok(pem)
}

fn ec_private_key_der(private_field: &[u8], public_field: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(119);
    // version
    body.extend_from_slice(&[0x02, 0x01, 0x01]);
    body.extend(der_element(0x04, private_field));
    body.extend(der_element(0xa0, &PRIME256V1_OID));
    body.extend(der_element(0xa1, &der_element(0x03, public_field)));
    der_element(0x30, &body)
}

/// Tag-length-value with a short-form length. Every element here is under 128 bytes.
fn der_element(tag: u8, content: &[u8]) -> Vec<u8> {
    debug_assert!(content.len() < 0x80);
    let mut out = Vec::with_capacity(content.len() + 2);
    out.push(tag);
    out.push(content.len() as u8);
    out.extend_from_slice(content);
    out
}

fn pem_block(label: &str, der: &[u8]) -> String {
    let body = base64_encode(der);
    let mut out = format!("-----BEGIN {}-----\r\n", label);
    for line in body.as_bytes().chunks(PEM_LINE_WIDTH) {
        // base64 output is ASCII
        out.push_str(&String::from_utf8_lossy(line));
        out.push_str("\r\n");
    }
    out.push_str(&format!("-----END {}-----\r\n", label));
    out
}

/// VAPID application server key pair.
pub struct VapidKeyPair {
    private_key: Zeroizing<[u8; PRIVATE_KEY_LENGTH]>,
    public_key: [u8; PUBLIC_KEY_LENGTH],
}

impl VapidKeyPair {
    /// Generate a new P-256 key pair.
    pub fn generate() -> Self {
        let secret = SecretKey::random(&mut rand::thread_rng());
        Self::from_secret(&secret)
    }

    /// Import a base64url private scalar; the public key is derived from it.
    pub fn from_base64url(private_key: &str) -> CryptoResult<Self> {
        let raw = Zeroizing::new(base64url_decode("private key", private_key)?);
        let padded = Zeroizing::new(pad_key_buffer(&raw, PRIVATE_KEY_LENGTH)?);
        let secret = SecretKey::from_slice(&padded)
            .map_err(|_| CryptoError::InvalidKey("private key is not a valid P-256 scalar".into()))?;
        Ok(Self::from_secret(&secret))
    }

    fn from_secret(secret: &SecretKey) -> Self {
        let mut private_key = Zeroizing::new([0u8; PRIVATE_KEY_LENGTH]);
        private_key.copy_from_slice(&secret.to_bytes());
        let mut public_key = [0u8; PUBLIC_KEY_LENGTH];
        public_key.copy_from_slice(secret.public_key().to_encoded_point(false).as_bytes());
        Self {
            private_key,
            public_key,
        }
    }

    /// Private scalar, base64url.
    pub fn private_key_base64url(&self) -> Zeroizing<String> {
        Zeroizing::new(base64url_encode(self.private_key.as_slice()))
    }

    /// Uncompressed public key, base64url. This is the `applicationServerKey`.
    pub fn public_key_base64url(&self) -> String {
        base64url_encode(&self.public_key)
    }

    /// Uncompressed public key.
    pub fn public_key_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.public_key
    }

    /// PEM form of this pair.
    pub fn to_pem(&self) -> CryptoResult<String> {
        to_pem(&self.private_key_base64url(), &self.public_key_base64url())
    }
}

impl std::fmt::Debug for VapidKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidKeyPair")
            .field("public_key", &self.public_key_base64url())
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}
