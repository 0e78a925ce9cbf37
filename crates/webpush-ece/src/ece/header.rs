//! The `aes128gcm` binary prefix.
//!
//! ```text
//! +----------+---------+------------+-----------------+
//! | salt(16) | rs(4 BE)| idlen(1)   | keyid(idlen)    |
//! +----------+---------+------------+-----------------+
//! ```

use crate::ece::params::InBandHeader;
use crate::error::{CryptoError, CryptoResult};
use crate::format::{HEADER_FIXED_LENGTH, MAX_KEY_ID_LENGTH, SALT_LENGTH};

/// Serialize the prefix.
pub fn write_header(salt: &[u8; SALT_LENGTH], record_size: u32, key_id: &[u8]) -> CryptoResult<Vec<u8>> {
    let id_len = u8::try_from(key_id.len()).map_err(|_| {
        CryptoError::InvalidParameter(format!(
            "keyid is too large ({} bytes, max {})",
            key_id.len(),
            MAX_KEY_ID_LENGTH
        ))
    })?;

    let mut out = Vec::with_capacity(HEADER_FIXED_LENGTH + key_id.len());
    out.extend_from_slice(salt);
    out.extend_from_slice(&record_size.to_be_bytes());
    out.push(id_len);
    out.extend_from_slice(key_id);
    Ok(out)
}

/// Parse the prefix from the start of `buf`.
///
/// Returns the header and the number of bytes it occupies. Record size is
/// not validated here; that depends on the encoding.
pub fn read_header(buf: &[u8]) -> CryptoResult<(InBandHeader, usize)> {
    if buf.len() < HEADER_FIXED_LENGTH {
        return Err(CryptoError::HeaderTooShort {
            needed: HEADER_FIXED_LENGTH,
            actual: buf.len(),
        });
    }

    let mut salt = [0u8; SALT_LENGTH];
    salt.copy_from_slice(&buf[..SALT_LENGTH]);
    let mut rs = [0u8; 4];
    rs.copy_from_slice(&buf[SALT_LENGTH..SALT_LENGTH + 4]);
    let id_len = buf[SALT_LENGTH + 4] as usize;

    let total = HEADER_FIXED_LENGTH + id_len;
    if buf.len() < total {
        return Err(CryptoError::HeaderTooShort {
            needed: total,
            actual: buf.len(),
        });
    }

    Ok((
        InBandHeader {
            salt,
            record_size: u32::from_be_bytes(rs),
            key_id: buf[HEADER_FIXED_LENGTH..total].to_vec(),
        },
        total,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_layout() {
        let header = write_header(&[0xaa; 16], 4096, b"abc").unwrap();
        assert_eq!(header.len(), 24);
        assert_eq!(&header[16..20], &[0x00, 0x00, 0x10, 0x00]);
        assert_eq!(header[20], 3);
        assert_eq!(&header[21..], b"abc");
    }

    #[test]
    fn test_read_back() {
        let mut buf = write_header(&[7; 16], 25, b"k1").unwrap();
        buf.extend_from_slice(b"body");
        let (header, consumed) = read_header(&buf).unwrap();
        assert_eq!(consumed, 23);
        assert_eq!(header.salt, [7; 16]);
        assert_eq!(header.record_size, 25);
        assert_eq!(header.key_id, b"k1");
        assert_eq!(&buf[consumed..], b"body");
    }

    #[test]
    fn test_key_id_too_large() {
        let result = write_header(&[0; 16], 4096, &[1u8; 256]);
        assert!(matches!(result, Err(CryptoError::InvalidParameter(_))));
        assert!(write_header(&[0; 16], 4096, &[1u8; 255]).is_ok());
    }

    #[test]
    fn test_short_fixed_part() {
        let result = read_header(&[0u8; 20]);
        assert!(matches!(
            result,
            Err(CryptoError::HeaderTooShort { needed: 21, actual: 20 })
        ));
    }

    #[test]
    fn test_short_key_id() {
        let mut buf = vec![0u8; 21];
        buf[20] = 65;
        buf.extend_from_slice(&[4u8; 10]);
        let result = read_header(&buf);
        assert!(matches!(
            result,
            Err(CryptoError::HeaderTooShort { needed: 86, actual: 31 })
        ));
    }
}
