//! Caller parameters and the validated per-operation header.
//!
//! [`EceParams`] is what a caller fills in; [`Header`] is what the codec
//! runs on. Every length and combination check happens while turning the
//! first into the second, so nothing past this module sees bad input.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use zeroize::Zeroizing;

use crate::ece::keys::{EcKeyPair, RemotePublicKey};
use crate::error::{CryptoError, CryptoResult};
use crate::format::{
    base64url_decode, to_array, ContentEncoding, AUTH_SECRET_MIN_LENGTH, DEFAULT_KEY_LABEL,
    DEFAULT_RECORD_SIZE, KEY_LENGTH, MAX_KEY_ID_LENGTH, MAX_PAD_LENGTH, SALT_LENGTH,
};

/// Resolves a key identifier to a stored symmetric key.
pub trait KeyLookup: Send + Sync {
    /// The key registered under `key_id`, if any.
    fn lookup(&self, key_id: &[u8]) -> Option<Vec<u8>>;
}

impl<F> KeyLookup for F
where
    F: Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync,
{
    fn lookup(&self, key_id: &[u8]) -> Option<Vec<u8>> {
        self(key_id)
    }
}

/// In-memory key map.
#[derive(Default, Clone)]
pub struct KeyMap(HashMap<Vec<u8>, Zeroizing<Vec<u8>>>);

impl KeyMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key` under `key_id`.
    pub fn insert(&mut self, key_id: impl Into<Vec<u8>>, key: impl Into<Vec<u8>>) {
        self.0.insert(key_id.into(), Zeroizing::new(key.into()));
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no keys are registered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl KeyLookup for KeyMap {
    fn lookup(&self, key_id: &[u8]) -> Option<Vec<u8>> {
        self.0.get(key_id).map(|k| k.to_vec())
    }
}

impl fmt::Debug for KeyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMap").field("len", &self.0.len()).finish()
    }
}

/// Encrypt/decrypt parameters.
///
/// Exactly one secret source must be set: `key`, `private_key` or
/// `key_lookup`.
#[derive(Clone, Default)]
pub struct EceParams {
    /// Content encoding (default `aes128gcm`).
    pub version: ContentEncoding,
    /// Record size (default 4096).
    pub record_size: Option<u32>,
    /// 16-byte salt. Generated on encrypt when absent.
    pub salt: Option<Vec<u8>>,
    /// Explicit 16-byte symmetric key.
    pub key: Option<Vec<u8>>,
    /// Key identifier, for key lookup or as the `aes128gcm` header key id.
    pub key_id: Option<Vec<u8>>,
    /// Peer public key for Diffie-Hellman.
    pub dh: Option<Vec<u8>>,
    /// Authentication secret (at least 16 bytes).
    pub auth_secret: Option<Vec<u8>>,
    /// Legacy DH context label (default `P-256`).
    pub key_label: Option<String>,
    /// Extra zero padding to spread across records on encrypt.
    pub pad: usize,
    /// Local key pair for Diffie-Hellman.
    pub private_key: Option<EcKeyPair>,
    /// Stored-key resolver.
    pub key_lookup: Option<Arc<dyn KeyLookup>>,
}

impl EceParams {
    /// Parameters for the given version with everything else unset.
    pub fn new(version: ContentEncoding) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    /// Set the record size.
    pub fn with_record_size(mut self, rs: u32) -> Self {
        self.record_size = Some(rs);
        self
    }

    /// Set the salt.
    pub fn with_salt(mut self, salt: impl Into<Vec<u8>>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    /// Use an explicit symmetric key.
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the key identifier.
    pub fn with_key_id(mut self, key_id: impl Into<Vec<u8>>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }

    /// Set the peer public key.
    pub fn with_dh(mut self, dh: impl Into<Vec<u8>>) -> Self {
        self.dh = Some(dh.into());
        self
    }

    /// Set the authentication secret.
    pub fn with_auth_secret(mut self, auth_secret: impl Into<Vec<u8>>) -> Self {
        self.auth_secret = Some(auth_secret.into());
        self
    }

    /// Set the legacy DH key label.
    pub fn with_key_label(mut self, label: impl Into<String>) -> Self {
        self.key_label = Some(label.into());
        self
    }

    /// Set the padding budget.
    pub fn with_pad(mut self, pad: usize) -> Self {
        self.pad = pad;
        self
    }

    /// Use a local key pair for Diffie-Hellman.
    pub fn with_private_key(mut self, private_key: EcKeyPair) -> Self {
        self.private_key = Some(private_key);
        self
    }

    /// Resolve secrets through a key lookup.
    pub fn with_key_lookup(mut self, lookup: impl KeyLookup + 'static) -> Self {
        self.key_lookup = Some(Arc::new(lookup));
        self
    }

    /// Parse the JSON parameter object.
    ///
    /// Byte fields (`salt`, `key`, `dh`, `authSecret`, `privateKey`) are
    /// base64url; `keyid` and `keylabel` are plain strings.
    pub fn from_json(json: &str) -> CryptoResult<Self> {
        let config: ParamsConfig = serde_json::from_str(json)?;
        config.try_into()
    }
}

impl fmt::Debug for EceParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EceParams")
            .field("version", &self.version)
            .field("record_size", &self.record_size)
            .field("salt", &self.salt.as_ref().map(hex::encode))
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .field("key_id", &self.key_id.as_ref().map(hex::encode))
            .field("dh", &self.dh.as_ref().map(hex::encode))
            .field("auth_secret", &self.auth_secret.as_ref().map(|_| "[REDACTED]"))
            .field("key_label", &self.key_label)
            .field("pad", &self.pad)
            .field("private_key", &self.private_key)
            .field("key_lookup", &self.key_lookup.is_some())
            .finish()
    }
}

/// JSON form of [`EceParams`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ParamsConfig {
    version: Option<String>,
    rs: Option<u32>,
    salt: Option<String>,
    key: Option<String>,
    keyid: Option<String>,
    dh: Option<String>,
    auth_secret: Option<String>,
    keylabel: Option<String>,
    pad: Option<usize>,
    private_key: Option<String>,
}

impl TryFrom<ParamsConfig> for EceParams {
    type Error = CryptoError;

    fn try_from(config: ParamsConfig) -> CryptoResult<Self> {
        let version = match config.version.as_deref() {
            Some(name) => name.parse()?,
            None => ContentEncoding::default(),
        };
        let decode = |name: &'static str, value: Option<String>| -> CryptoResult<Option<Vec<u8>>> {
            value.map(|v| base64url_decode(name, &v)).transpose()
        };
        Ok(Self {
            version,
            record_size: config.rs,
            salt: decode("salt", config.salt)?,
            key: decode("key", config.key)?,
            key_id: config.keyid.map(String::into_bytes),
            dh: decode("dh", config.dh)?,
            auth_secret: decode("authSecret", config.auth_secret)?,
            key_label: config.keylabel,
            pad: config.pad.unwrap_or(0),
            private_key: config
                .private_key
                .as_deref()
                .map(EcKeyPair::from_base64url)
                .transpose()?,
            key_lookup: None,
        })
    }
}

/// Direction of the operation; decides which public key is sender and which is receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Encrypt,
    Decrypt,
}

/// Where the raw secret comes from.
#[derive(Clone)]
pub(crate) enum SecretSource {
    /// Explicit symmetric key.
    Key(Zeroizing<[u8; KEY_LENGTH]>),
    /// ECDH between the local pair and a peer key. On `aes128gcm` decrypt the
    /// peer key comes from the in-band header.
    Agreement {
        private_key: EcKeyPair,
        remote: Option<RemotePublicKey>,
    },
    /// Stored key found by key id.
    Lookup(Arc<dyn KeyLookup>),
}

/// Salt, record size and key id as read from an `aes128gcm` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InBandHeader {
    /// Message salt.
    pub salt: [u8; SALT_LENGTH],
    /// Record size.
    pub record_size: u32,
    /// Key identifier (the sender public key for Web Push).
    pub key_id: Vec<u8>,
}

/// Validated parameters for one encrypt or decrypt call.
#[derive(Clone)]
pub struct Header {
    pub(crate) version: ContentEncoding,
    pub(crate) record_size: u32,
    pub(crate) salt: Option<[u8; SALT_LENGTH]>,
    pub(crate) key_id: Option<Vec<u8>>,
    pub(crate) source: SecretSource,
    pub(crate) auth_secret: Option<Zeroizing<Vec<u8>>>,
    pub(crate) key_label: String,
    pub(crate) pad: usize,
}

impl Header {
    pub(crate) fn from_params(params: &EceParams, mode: Mode) -> CryptoResult<Self> {
        let version = params.version;
        let in_band = version.profile().in_band_header;

        let record_size = params.record_size.unwrap_or(DEFAULT_RECORD_SIZE);
        check_record_size(version, record_size)?;

        let salt = params
            .salt
            .as_deref()
            .map(|s| to_array::<SALT_LENGTH>("salt", s))
            .transpose()?;
        if salt.is_none() && mode == Mode::Decrypt && !in_band {
            return Err(CryptoError::MissingParameter("salt"));
        }

        if mode == Mode::Encrypt && params.pad > MAX_PAD_LENGTH {
            return Err(CryptoError::InvalidParameter(format!(
                "pad is too large ({} bytes, max {})",
                params.pad, MAX_PAD_LENGTH
            )));
        }

        let auth_secret = match params.auth_secret.as_deref() {
            Some(secret) if secret.len() < AUTH_SECRET_MIN_LENGTH => {
                return Err(CryptoError::InvalidKeyLength {
                    name: "auth secret",
                    expected: format!("at least {}", AUTH_SECRET_MIN_LENGTH),
                    actual: secret.len(),
                });
            }
            Some(secret) => Some(Zeroizing::new(secret.to_vec())),
            None => None,
        };

        let sources = [
            params.key.is_some(),
            params.private_key.is_some(),
            params.key_lookup.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if sources != 1 {
            return Err(CryptoError::InvalidParameter(format!(
                "exactly one of key, private key or key lookup is required, got {}",
                sources
            )));
        }

        let source = if let Some(key) = params.key.as_deref() {
            SecretSource::Key(Zeroizing::new(to_array("key", key)?))
        } else if let Some(private_key) = &params.private_key {
            let remote = params
                .dh
                .as_deref()
                .map(RemotePublicKey::from_bytes)
                .transpose()?;
            // aes128gcm decryption takes the sender key from the header.
            let remote_from_header = in_band && mode == Mode::Decrypt;
            if remote.is_none() && !remote_from_header {
                return Err(CryptoError::MissingParameter("dh"));
            }
            if in_band && auth_secret.is_none() {
                return Err(CryptoError::MissingParameter("authSecret"));
            }
            SecretSource::Agreement {
                private_key: private_key.clone(),
                remote: if remote_from_header { None } else { remote },
            }
        } else if let Some(lookup) = &params.key_lookup {
            if params.key_id.is_none() && !(in_band && mode == Mode::Decrypt) {
                return Err(CryptoError::MissingParameter("keyid"));
            }
            SecretSource::Lookup(Arc::clone(lookup))
        } else {
            return Err(CryptoError::MissingParameter("key"));
        };

        if params.dh.is_some() && !matches!(source, SecretSource::Agreement { .. }) {
            return Err(CryptoError::InvalidParameter(
                "dh requires a private key".into(),
            ));
        }

        let key_id = params.key_id.clone();
        if let Some(id) = &key_id {
            if in_band && id.len() > MAX_KEY_ID_LENGTH {
                return Err(CryptoError::InvalidParameter(format!(
                    "keyid is too large ({} bytes, max {})",
                    id.len(),
                    MAX_KEY_ID_LENGTH
                )));
            }
        }

        Ok(Self {
            version,
            record_size,
            salt,
            key_id,
            source,
            auth_secret,
            key_label: params
                .key_label
                .clone()
                .unwrap_or_else(|| DEFAULT_KEY_LABEL.to_string()),
            pad: if mode == Mode::Encrypt { params.pad } else { 0 },
        })
    }

    /// Adopt the values read from an `aes128gcm` prefix.
    pub(crate) fn apply_in_band(&mut self, in_band: InBandHeader) -> CryptoResult<()> {
        check_record_size(self.version, in_band.record_size)?;
        if let SecretSource::Agreement { remote, .. } = &mut self.source {
            *remote = Some(RemotePublicKey::from_bytes(&in_band.key_id)?);
        }
        self.salt = Some(in_band.salt);
        self.record_size = in_band.record_size;
        self.key_id = Some(in_band.key_id);
        Ok(())
    }

    /// Content encoding.
    pub fn version(&self) -> ContentEncoding {
        self.version
    }

    /// Record size.
    pub fn record_size(&self) -> u32 {
        self.record_size
    }

    /// Salt, once known.
    pub fn salt(&self) -> Option<&[u8; SALT_LENGTH]> {
        self.salt.as_ref()
    }

    /// Key identifier, if any.
    pub fn key_id(&self) -> Option<&[u8]> {
        self.key_id.as_deref()
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            SecretSource::Key(_) => "key",
            SecretSource::Agreement { .. } => "dh",
            SecretSource::Lookup(_) => "keyid",
        };
        f.debug_struct("Header")
            .field("version", &self.version)
            .field("record_size", &self.record_size)
            .field("salt", &self.salt.map(hex::encode))
            .field("key_id", &self.key_id.as_ref().map(hex::encode))
            .field("source", &source)
            .field("auth_secret", &self.auth_secret.is_some())
            .field("key_label", &self.key_label)
            .field("pad", &self.pad)
            .finish()
    }
}

fn check_record_size(version: ContentEncoding, rs: u32) -> CryptoResult<()> {
    let overhead = version.profile().overhead();
    if (rs as usize) <= overhead {
        return Err(CryptoError::InvalidRecordSize { rs, overhead });
    }
    Ok(())
}
