//! # webpush-ece
//!
//! HTTP Encrypted Content-Encoding for Web Push payloads.
//!
//! Push services relay notification bodies they must not read. This crate
//! encrypts those bodies for a browser subscription and decrypts them again,
//! and converts raw VAPID keys into the PEM form signing libraries expect.
//!
//! ## Cryptographic Primitives
//!
//! - **Key agreement**: ECDH on P-256
//! - **Key derivation**: HKDF-SHA256
//! - **Symmetric cipher**: AES-128-GCM, one AEAD call per record
//! - **Random generation**: OS-seeded CSPRNG for salts and ephemeral keys
//!
//! ## Content Encodings
//!
//! | Version     | Header   | Padding                      | Record window |
//! |-------------|----------|------------------------------|---------------|
//! | `aes128gcm` | in-band  | data, delimiter, zeros       | `rs`          |
//! | `aesgcm`    | external | 2-byte length, zeros, data   | `rs + 16`     |
//! | `aesgcm128` | external | 1-byte length, zeros, data   | `rs + 16`     |
//!
//! ## Wire Format (`aes128gcm`)
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │ Salt (16 bytes)                                 │
//! ├─────────────────────────────────────────────────┤
//! │ Record Size: u32 BE (4 bytes)                   │
//! ├─────────────────────────────────────────────────┤
//! │ Key ID Length (1 byte) + Key ID                 │
//! ├─────────────────────────────────────────────────┤
//! │ Records (AES-128-GCM, 16-byte tag each)         │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Examples
//!
//! ### Encrypt for a Subscription
//!
//! ```rust
//! use webpush_ece::{decrypt_subscription_payload, encrypt_for_subscription};
//! use webpush_ece::{ContentEncoding, EcKeyPair, SubscriptionKeys};
//!
//! // Browser side
//! let ua = EcKeyPair::generate();
//! let auth = [7u8; 16];
//! let keys = SubscriptionKeys::from_bytes(ua.public_key_bytes(), &auth);
//!
//! // Server side
//! let payload = encrypt_for_subscription(b"Hello", &keys, ContentEncoding::Aes128Gcm).unwrap();
//!
//! let plaintext = decrypt_subscription_payload(&payload, &ua, &auth).unwrap();
//! assert_eq!(plaintext, b"Hello");
//! ```
//!
//! ### Explicit Parameters
//!
//! ```rust
//! use webpush_ece::{decrypt, encrypt, ContentEncoding, EceParams};
//!
//! let params = EceParams::new(ContentEncoding::Aes128Gcm)
//!     .with_key(vec![0x42; 16])
//!     .with_record_size(64);
//!
//! let encrypted = encrypt(b"several records worth of text", &params).unwrap();
//! assert_eq!(decrypt(&encrypted, &params).unwrap(), b"several records worth of text");
//! ```
//!
//! ### VAPID Key to PEM
//!
//! ```rust
//! use webpush_ece::VapidKeyPair;
//!
//! let pair = VapidKeyPair::generate();
//! let pem = pair.to_pem().unwrap();
//! assert!(pem.starts_with("-----BEGIN EC PARAMETERS-----"));
//! ```

pub mod cipher;
pub mod ece;
pub mod error;
pub mod format;
pub mod kdf;
pub mod keylog;
pub mod vapid;
pub mod webpush;

// Re-export commonly used types
pub use ece::header::read_header;
pub use ece::keys::{EcKeyPair, RemotePublicKey};
pub use ece::params::{EceParams, InBandHeader, KeyLookup, KeyMap};
pub use ece::{decrypt, encrypt, Ece};
pub use error::{CryptoError, CryptoResult, ErrorKind};
pub use format::{base64url_decode, base64url_encode, ContentEncoding};
pub use keylog::{KeyLog, TracingKeyLog};
pub use vapid::{pad_key_buffer, to_pem, VapidKeyPair};
pub use webpush::{
    decrypt_subscription_payload, encrypt_for_subscription, encrypt_for_subscription_with,
    EncryptedPayload, SubscriptionKeys,
};
