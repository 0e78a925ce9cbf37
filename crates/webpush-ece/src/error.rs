//! Error types for content-encoding and key conversion operations.

use thiserror::Error;

/// Broad class of a [`CryptoError`].
///
/// Parameter errors are raised before any cryptographic work runs.
/// Authentication and format errors are both fatal, but are kept apart so
/// callers can tell a forged or corrupted record from a malformed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing input parameters.
    Parameter,
    /// AEAD tag verification failed.
    Authentication,
    /// Malformed padding, header or record layout.
    Format,
}

/// Errors raised by the encoding engine and the VAPID key converter.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Unsupported content-encoding name.
    #[error("Unsupported content encoding: {0}")]
    UnsupportedVersion(String),

    /// A parameter has an invalid value or combination.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A required parameter was not supplied.
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    /// Key material of the wrong byte length.
    #[error("Invalid {name} length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Which piece of key material.
        name: &'static str,
        /// Expected length, as text ("16", "at least 16").
        expected: String,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Key bytes that do not form a valid key.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Record size too small for the content encoding overhead.
    #[error("Invalid record size {rs}: must be greater than {overhead}")]
    InvalidRecordSize {
        /// The rejected record size.
        rs: u32,
        /// The fixed per-record overhead of the encoding.
        overhead: usize,
    },

    /// No key registered for a key identifier.
    #[error("No saved key (keyid: {0:?})")]
    KeyNotFound(String),

    /// Key buffer longer than its fixed width.
    #[error("Key buffer is too large: {actual} bytes exceeds {size}")]
    KeyBufferTooLarge {
        /// Target width.
        size: usize,
        /// Length of the supplied buffer.
        actual: usize,
    },

    /// Key derivation failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Authentication failed - data may be tampered.
    #[error("Authentication failed - data may be tampered")]
    Authentication,

    /// Record padding is malformed.
    #[error("Invalid padding: {0}")]
    InvalidPadding(String),

    /// Payload ends before a complete record.
    #[error("Truncated payload: {0}")]
    Truncated(String),

    /// Header shorter than its declared length.
    #[error("Header too short: need {needed} bytes, got {actual}")]
    HeaderTooShort {
        /// Bytes required by the header fields.
        needed: usize,
        /// Bytes available.
        actual: usize,
    },

    /// Base64 decoding failed.
    #[error("Invalid base64 for {name}: {reason}")]
    Base64 {
        /// Which value was being decoded.
        name: &'static str,
        /// Decoder message.
        reason: String,
    },

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CryptoError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CryptoError::Authentication => ErrorKind::Authentication,
            CryptoError::InvalidPadding(_)
            | CryptoError::Truncated(_)
            | CryptoError::HeaderTooShort { .. } => ErrorKind::Format,
            _ => ErrorKind::Parameter,
        }
    }

    pub(crate) fn key_length(name: &'static str, expected: usize, actual: usize) -> Self {
        CryptoError::InvalidKeyLength {
            name,
            expected: expected.to_string(),
            actual,
        }
    }
}

/// Result type for content-encoding operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
