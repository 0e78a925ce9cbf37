//! AES-128-GCM record sealing and random generation.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes128Gcm, Nonce,
};
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::format::{KEY_LENGTH, NONCE_LENGTH, SALT_LENGTH};

/// Generate cryptographically secure random bytes.
pub fn generate_random<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Generate a random salt (16 bytes).
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    generate_random()
}

/// Encrypt one padded record with AES-128-GCM.
///
/// Returns ciphertext with appended authentication tag (16 bytes).
pub fn aes_gcm_encrypt(
    key: &[u8; KEY_LENGTH],
    nonce: &[u8; NONCE_LENGTH],
    plaintext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher =
        Aes128Gcm::new_from_slice(key).map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let nonce = Nonce::from_slice(nonce);

    cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::Encryption("AES-GCM encryption failed".into()))
}

/// Decrypt one record with AES-128-GCM.
///
/// The ciphertext must include the authentication tag (16 bytes) at the end.
/// Any tag mismatch is reported as [`CryptoError::Authentication`].
pub fn aes_gcm_decrypt(
    key: &[u8; KEY_LENGTH],
    nonce: &[u8; NONCE_LENGTH],
    ciphertext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher = Aes128Gcm::new_from_slice(key)
        .map_err(|_| CryptoError::InvalidKey("AES-128 key".to_string()))?;

    let nonce = Nonce::from_slice(nonce);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::Authentication)
}
