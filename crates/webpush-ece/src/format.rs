//! Shared format constants, content-encoding profiles and base64 helpers.

use std::fmt;
use std::str::FromStr;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CryptoError, CryptoResult};

/// AES-128 key length.
pub const KEY_LENGTH: usize = 16;

/// AES-GCM nonce length.
pub const NONCE_LENGTH: usize = 12;

/// AES-GCM authentication tag length.
pub const TAG_LENGTH: usize = 16;

/// Salt length.
pub const SALT_LENGTH: usize = 16;

/// HMAC-SHA256 output length.
pub const SHA256_LENGTH: usize = 32;

/// Uncompressed SEC1 P-256 point length (`0x04 || x || y`).
pub const PUBLIC_KEY_LENGTH: usize = 65;

/// Raw P-256 private scalar length.
pub const PRIVATE_KEY_LENGTH: usize = 32;

/// Minimum authentication secret length.
pub const AUTH_SECRET_MIN_LENGTH: usize = 16;

/// Default record size.
pub const DEFAULT_RECORD_SIZE: u32 = 4096;

/// Fixed part of the `aes128gcm` header: salt, record size, key id length.
pub const HEADER_FIXED_LENGTH: usize = SALT_LENGTH + 4 + 1;

/// Largest key id the `aes128gcm` header can carry.
pub const MAX_KEY_ID_LENGTH: usize = 255;

/// Largest padding budget accepted for one message.
pub const MAX_PAD_LENGTH: usize = u32::MAX as usize;

/// Default key label for legacy Diffie-Hellman contexts.
pub const DEFAULT_KEY_LABEL: &str = "P-256";

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// How a record marks where plaintext ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddingScheme {
    /// Plaintext, then a delimiter byte (`2` on the last record, `1` otherwise), then zeros.
    Delimiter,
    /// A big-endian pad length, that many zeros, then plaintext.
    LengthPrefix,
}

/// Per-version constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingProfile {
    /// `Content-Encoding` token.
    pub name: &'static str,
    /// Bytes of padding framing per record.
    pub pad_size: usize,
    /// Padding layout.
    pub padding: PaddingScheme,
    /// Whether salt, record size and key id travel in a binary prefix.
    pub in_band_header: bool,
    /// Whether the record size counts the AEAD tag.
    pub record_size_includes_tag: bool,
}

impl EncodingProfile {
    /// Fixed bytes per record that are not plaintext.
    pub const fn overhead(&self) -> usize {
        if self.record_size_includes_tag {
            self.pad_size + TAG_LENGTH
        } else {
            self.pad_size
        }
    }

    /// Size of a full ciphertext record for the given record size.
    pub const fn ciphertext_window(&self, rs: usize) -> usize {
        if self.record_size_includes_tag {
            rs
        } else {
            rs + TAG_LENGTH
        }
    }

    /// Largest zero-pad a single record may carry, ignoring the record size.
    pub const fn max_record_pad(&self) -> usize {
        match self.padding {
            PaddingScheme::Delimiter => usize::MAX,
            PaddingScheme::LengthPrefix => (1usize << (self.pad_size * 8)) - 1,
        }
    }
}

const AES128GCM: EncodingProfile = EncodingProfile {
    name: "aes128gcm",
    pad_size: 1,
    padding: PaddingScheme::Delimiter,
    in_band_header: true,
    record_size_includes_tag: true,
};

const AESGCM: EncodingProfile = EncodingProfile {
    name: "aesgcm",
    pad_size: 2,
    padding: PaddingScheme::LengthPrefix,
    in_band_header: false,
    record_size_includes_tag: false,
};

const AESGCM128: EncodingProfile = EncodingProfile {
    name: "aesgcm128",
    pad_size: 1,
    padding: PaddingScheme::LengthPrefix,
    in_band_header: false,
    record_size_includes_tag: false,
};

/// Encrypted Content-Encoding version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentEncoding {
    /// RFC 8188 / RFC 8291, the current scheme.
    #[default]
    Aes128Gcm,
    /// Legacy Web Push draft scheme.
    AesGcm,
    /// Oldest draft scheme.
    AesGcm128,
}

impl ContentEncoding {
    /// Constants for this version.
    pub const fn profile(self) -> &'static EncodingProfile {
        match self {
            ContentEncoding::Aes128Gcm => &AES128GCM,
            ContentEncoding::AesGcm => &AESGCM,
            ContentEncoding::AesGcm128 => &AESGCM128,
        }
    }

    /// `Content-Encoding` token.
    pub const fn as_str(self) -> &'static str {
        self.profile().name
    }

    /// True for `aesgcm` and `aesgcm128`.
    pub const fn is_legacy(self) -> bool {
        !self.profile().in_band_header
    }
}

impl fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentEncoding {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aes128gcm" => Ok(ContentEncoding::Aes128Gcm),
            "aesgcm" => Ok(ContentEncoding::AesGcm),
            "aesgcm128" => Ok(ContentEncoding::AesGcm128),
            other => Err(CryptoError::UnsupportedVersion(other.to_string())),
        }
    }
}

impl Serialize for ContentEncoding {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ContentEncoding {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Encode bytes as unpadded base64url.
pub fn base64url_encode(data: &[u8]) -> String {
    URL_SAFE_LENIENT.encode(data)
}

/// Decode base64url, with or without padding.
pub fn base64url_decode(name: &'static str, data: &str) -> CryptoResult<Vec<u8>> {
    URL_SAFE_LENIENT
        .decode(data.trim())
        .map_err(|e| CryptoError::Base64 {
            name,
            reason: e.to_string(),
        })
}

/// Encode bytes as standard padded base64 (PEM bodies).
pub fn base64_encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Copy a slice into a fixed-size array, checking its length.
pub(crate) fn to_array<const N: usize>(name: &'static str, bytes: &[u8]) -> CryptoResult<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| CryptoError::key_length(name, N, bytes.len()))
}

/// Serde helper writing byte fields as base64url.
pub(crate) mod base64url_bytes {
    use serde::Serializer;

    pub fn serialize<S, T>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: AsRef<[u8]>,
    {
        serializer.serialize_str(&super::base64url_encode(bytes.as_ref()))
    }
}
