//! Encrypted Content-Encoding engine.
//!
//! Three wire versions share one record pipeline:
//!
//! ```text
//! aes128gcm:   salt(16) | rs(4) | idlen(1) | keyid | record | record | ...
//! aesgcm:      record | record | ...            (salt and dh sent out of band)
//! aesgcm128:   record | record | ...
//!
//! record = AES-128-GCM(key, nonce_base ^ counter, padded plaintext) || tag(16)
//! ```
//!
//! Every non-final record is exactly the record size; the final record
//! is shorter (legacy versions) or marked by a `2` delimiter (`aes128gcm`).

pub mod header;
pub mod keys;
pub mod params;
pub mod record;
pub mod secret;

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::cipher::generate_salt;
use crate::error::{CryptoError, CryptoResult};
use crate::keylog::{KeyLog, KeyLogger};

use self::header::{read_header, write_header};
use self::params::{EceParams, Header, Mode, SecretSource};
use self::record::{decrypt_records, derive_key_and_nonce, encrypt_records};
use self::secret::agree_secret;

/// Encoder/decoder with an optional key-material log.
#[derive(Clone, Default)]
pub struct Ece {
    keylog: Option<Arc<dyn KeyLog>>,
}

impl Ece {
    /// Engine that logs nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that reports intermediate values to `keylog`.
    pub fn with_keylog(keylog: Arc<dyn KeyLog>) -> Self {
        Self {
            keylog: Some(keylog),
        }
    }

    fn logger(&self) -> KeyLogger<'_> {
        KeyLogger(self.keylog.as_deref())
    }

    /// Encrypt `plaintext`.
    ///
    /// For `aes128gcm` the output starts with the binary header. Legacy
    /// output is bare records; the caller transmits the salt separately.
    pub fn encrypt(&self, plaintext: &[u8], params: &EceParams) -> CryptoResult<Vec<u8>> {
        let mut header = Header::from_params(params, Mode::Encrypt)?;
        let log = self.logger();
        let version = header.version;

        let salt = header.salt.unwrap_or_else(generate_salt);
        header.salt = Some(salt);
        log.log("salt", &salt);

        let agreed = agree_secret(&header, Mode::Encrypt, log)?;
        let material = derive_key_and_nonce(&agreed.secret, &salt, version, &agreed.context, log)?;

        let mut out = if version.profile().in_band_header {
            let key_id = match (&header.key_id, &header.source) {
                (Some(id), _) => id.clone(),
                (None, SecretSource::Agreement { private_key, .. }) => {
                    private_key.public_key_bytes().to_vec()
                }
                (None, _) => Vec::new(),
            };
            write_header(&salt, header.record_size, &key_id)?
        } else {
            Vec::new()
        };
        let header_len = out.len();

        out.extend(encrypt_records(
            &material,
            plaintext,
            version,
            header.record_size,
            header.pad,
            log,
        )?);

        debug!(
            version = %version,
            rs = header.record_size,
            plaintext = plaintext.len(),
            header = header_len,
            output = out.len(),
            "encrypted payload"
        );
        Ok(out)
    }

    /// Decrypt `buf`, which must start with the binary header for `aes128gcm`.
    pub fn decrypt(&self, buf: &[u8], params: &EceParams) -> CryptoResult<Vec<u8>> {
        let mut header = Header::from_params(params, Mode::Decrypt)?;
        let log = self.logger();
        let version = header.version;

        let body = if version.profile().in_band_header {
            let (in_band, consumed) = read_header(buf)?;
            header.apply_in_band(in_band)?;
            &buf[consumed..]
        } else {
            buf
        };

        let salt = header.salt.ok_or(CryptoError::MissingParameter("salt"))?;
        log.log("salt", &salt);

        let agreed = agree_secret(&header, Mode::Decrypt, log)?;
        let material = derive_key_and_nonce(&agreed.secret, &salt, version, &agreed.context, log)?;
        let plaintext = decrypt_records(&material, body, version, header.record_size, log)?;

        debug!(
            version = %version,
            rs = header.record_size,
            input = buf.len(),
            plaintext = plaintext.len(),
            "decrypted payload"
        );
        Ok(plaintext)
    }
}

impl fmt::Debug for Ece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ece")
            .field("keylog", &self.keylog.is_some())
            .finish()
    }
}

/// Encrypt with a non-logging engine.
pub fn encrypt(plaintext: &[u8], params: &EceParams) -> CryptoResult<Vec<u8>> {
    Ece::new().encrypt(plaintext, params)
}

/// Decrypt with a non-logging engine.
pub fn decrypt(buf: &[u8], params: &EceParams) -> CryptoResult<Vec<u8>> {
    Ece::new().decrypt(buf, params)
}
