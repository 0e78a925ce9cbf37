//! Integration tests for the Encrypted Content-Encoding engine.
//!
//! This test suite validates:
//! - Published test vectors (RFC 8188, RFC 8291) and fixed legacy vectors
//! - Round-trips across record boundaries for every version
//! - Tag sensitivity and truncation handling
//! - Parameter validation before any cryptography runs
//! - Key lookup, padding and key logging

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use webpush_ece::{
    base64url_decode, base64url_encode, decrypt, encrypt, read_header, ContentEncoding,
    CryptoError, EcKeyPair, Ece, EceParams, ErrorKind, KeyMap,
};

const RFC8188_KEY: &str = "yqdlZ-tYemfogSmv7Ws5PQ";
const RFC8188_SALT: &str = "I1BsxtFttlv3u_Oo94xnmw";
const RFC8188_CIPHERTEXT: &str =
    "I1BsxtFttlv3u_Oo94xnmwAAEAAA-NAVub2qFgBEuQKRapoZu-IxkIva3MEB1PD-ly8Thjg";

const RFC8291_AS_PRIVATE: &str = "yfWPiYE-n46HLnH0KqZOF1fJJU3MYrct3AELtAQ-oRw";
const RFC8291_AS_PUBLIC: &str =
    "BP4z9KsN6nGRTbVYI_c7VJSPQTBtkgcy27mlmlMoZIIgDll6e3vCYLocInmYWAmS6TlzAC8wEqKK6PBru3jl7A8";
const RFC8291_UA_PRIVATE: &str = "q1dXpw3UpT5VOmu_cf_v6ih07Aems3njxI-JWgLcM94";
const RFC8291_UA_PUBLIC: &str =
    "BCVxsr7N_eNgVRqvHtD0zTZsEc6-VV-JvLexhqUzORcxaOzi6-AYWXvTBHm4bjyPjs7Vd8pZGH6SRpkNtoIAiw4";
const RFC8291_AUTH: &str = "BTBZMqHH6r4Tts7J_aSIgg";
const RFC8291_SALT: &str = "DGv6ra1nlYgDCS1FRnbzlw";
const RFC8291_PLAINTEXT: &[u8] = b"When I grow up, I want to be a watermelon";
const RFC8291_CIPHERTEXT: &str = "DGv6ra1nlYgDCS1FRnbzlwAAEABBBP4z9KsN6nGRTbVYI_c7VJSPQTBtkgcy27mlmlMoZIIgDll6e3vCYLocInmYWAmS6TlzAC8wEqKK6PBru3jl7A_yl95bQpu6cVPTpK4Mqgkf1CXztLVBSt2Ks3oZwbuwXPXLWyouBWLVWGNWQexSgSxsj_Qulcy4a-fN";

const AESGCM_WALRUS: &str = "95vhdJwjSjzFKJWf7EnOeTGKQHVU2EXUpw-MuIl4Tz7E";
const AESGCM128_WALRUS: &str = "s1QxUmAm-2eLINYSONbBU9g51cTGCXdBeEWlAAiFVUE";
const AESGCM_DH_WATERMELON: &str =
    "4qwOLFm_mNy0vf1A8f3Bm6B5UD15y3aV_xZy14pixUhcPTIoZKHzq5i3dZ6PzqSMxBI_-VDUZ4jW04M";

const VERSIONS: [ContentEncoding; 3] = [
    ContentEncoding::Aes128Gcm,
    ContentEncoding::AesGcm,
    ContentEncoding::AesGcm128,
];

fn b64(s: &str) -> Vec<u8> {
    base64url_decode("fixture", s).unwrap()
}

fn key_params(version: ContentEncoding) -> EceParams {
    EceParams::new(version)
        .with_key(b64(RFC8188_KEY))
        .with_salt(b64(RFC8188_SALT))
}

fn dh_pair(version: ContentEncoding) -> (EceParams, EceParams) {
    let sender = EcKeyPair::generate();
    let receiver = EcKeyPair::generate();
    let auth = vec![0x5a; 16];
    let salt = vec![0x33; 16];
    let enc = EceParams::new(version)
        .with_private_key(sender.clone())
        .with_dh(receiver.public_key_bytes().to_vec())
        .with_auth_secret(auth.clone())
        .with_salt(salt.clone());
    let dec = EceParams::new(version)
        .with_private_key(receiver)
        .with_dh(sender.public_key_bytes().to_vec())
        .with_auth_secret(auth)
        .with_salt(salt);
    (enc, dec)
}

// ============================================================================
// Test Category 1: Known Vectors
// ============================================================================

#[test]
fn test_rfc8188_encrypt() {
    let params = key_params(ContentEncoding::Aes128Gcm);
    let encrypted = encrypt(b"I am the walrus", &params).unwrap();
    assert_eq!(base64url_encode(&encrypted), RFC8188_CIPHERTEXT);
}

#[test]
fn test_rfc8188_decrypt() {
    // Salt comes from the header, not the parameters.
    let params = EceParams::new(ContentEncoding::Aes128Gcm).with_key(b64(RFC8188_KEY));
    let plaintext = decrypt(&b64(RFC8188_CIPHERTEXT), &params).unwrap();
    assert_eq!(plaintext, b"I am the walrus");
}

#[test]
fn test_rfc8291_encrypt() {
    let params = EceParams::new(ContentEncoding::Aes128Gcm)
        .with_private_key(EcKeyPair::from_base64url(RFC8291_AS_PRIVATE).unwrap())
        .with_dh(b64(RFC8291_UA_PUBLIC))
        .with_auth_secret(b64(RFC8291_AUTH))
        .with_salt(b64(RFC8291_SALT));
    let encrypted = encrypt(RFC8291_PLAINTEXT, &params).unwrap();
    assert_eq!(base64url_encode(&encrypted), RFC8291_CIPHERTEXT);
}

#[test]
fn test_rfc8291_decrypt() {
    let params = EceParams::new(ContentEncoding::Aes128Gcm)
        .with_private_key(EcKeyPair::from_base64url(RFC8291_UA_PRIVATE).unwrap())
        .with_auth_secret(b64(RFC8291_AUTH));
    let buf = b64(RFC8291_CIPHERTEXT);

    let (header, _) = read_header(&buf).unwrap();
    assert_eq!(header.key_id, b64(RFC8291_AS_PUBLIC));

    let plaintext = decrypt(&buf, &params).unwrap();
    assert_eq!(plaintext, RFC8291_PLAINTEXT);
}

#[test]
fn test_legacy_explicit_key_vectors() {
    let encrypted = encrypt(b"I am the walrus", &key_params(ContentEncoding::AesGcm)).unwrap();
    assert_eq!(base64url_encode(&encrypted), AESGCM_WALRUS);

    let encrypted = encrypt(b"I am the walrus", &key_params(ContentEncoding::AesGcm128)).unwrap();
    assert_eq!(base64url_encode(&encrypted), AESGCM128_WALRUS);

    let plaintext = decrypt(&b64(AESGCM_WALRUS), &key_params(ContentEncoding::AesGcm)).unwrap();
    assert_eq!(plaintext, b"I am the walrus");
}

#[test]
fn test_aesgcm_dh_vector() {
    let params = EceParams::new(ContentEncoding::AesGcm)
        .with_private_key(EcKeyPair::from_base64url(RFC8291_AS_PRIVATE).unwrap())
        .with_dh(b64(RFC8291_UA_PUBLIC))
        .with_auth_secret(b64(RFC8291_AUTH))
        .with_salt(b64(RFC8291_SALT));
    let encrypted = encrypt(RFC8291_PLAINTEXT, &params).unwrap();
    assert_eq!(base64url_encode(&encrypted), AESGCM_DH_WATERMELON);

    let params = EceParams::new(ContentEncoding::AesGcm)
        .with_private_key(EcKeyPair::from_base64url(RFC8291_UA_PRIVATE).unwrap())
        .with_dh(b64(RFC8291_AS_PUBLIC))
        .with_auth_secret(b64(RFC8291_AUTH))
        .with_salt(b64(RFC8291_SALT));
    let plaintext = decrypt(&b64(AESGCM_DH_WATERMELON), &params).unwrap();
    assert_eq!(plaintext, RFC8291_PLAINTEXT);
}

// ============================================================================
// Test Category 2: Round-trips
// ============================================================================

#[test]
fn test_roundtrip_across_record_boundaries() {
    let rs = 32u32;
    for version in VERSIONS {
        let room = rs as usize - version.profile().overhead();
        for len in [0, 1, room - 1, room, room + 1, room * 2, room * 3 + 1, room * 5] {
            let plaintext: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let params = key_params(version).with_record_size(rs);
            let encrypted = encrypt(&plaintext, &params).unwrap();
            let decrypted = decrypt(&encrypted, &params)
                .unwrap_or_else(|e| panic!("{} len {}: {}", version, len, e));
            assert_eq!(decrypted, plaintext, "{} len {}", version, len);
        }
    }
}

#[test]
fn test_roundtrip_dh_all_versions() {
    for version in VERSIONS {
        let (enc, dec) = dh_pair(version);
        let plaintext = vec![0xc3; 5000];
        let encrypted = encrypt(&plaintext, &enc).unwrap();
        assert_eq!(decrypt(&encrypted, &dec).unwrap(), plaintext, "{}", version);
    }
}

#[test]
fn test_roundtrip_default_record_size_large_payload() {
    let plaintext = vec![0x61; 4096 * 3 + 7];
    for version in VERSIONS {
        let params = key_params(version);
        let encrypted = encrypt(&plaintext, &params).unwrap();
        assert_eq!(decrypt(&encrypted, &params).unwrap(), plaintext);
    }
}

#[test]
fn test_minimum_record_size() {
    // aes128gcm: one data byte per record.
    let params = key_params(ContentEncoding::Aes128Gcm).with_record_size(18);
    let encrypted = encrypt(b"abc", &params).unwrap();
    assert_eq!(encrypted.len(), 21 + 3 * 18);
    assert_eq!(decrypt(&encrypted, &params).unwrap(), b"abc");
}

// ============================================================================
// Test Category 3: Padding
// ============================================================================

#[test]
fn test_padding_hides_length() {
    for version in VERSIONS {
        let params = key_params(version).with_pad(100);
        let short = encrypt(b"a", &params).unwrap();
        let unpadded = encrypt(b"a", &key_params(version)).unwrap();
        assert_eq!(short.len(), unpadded.len() + 100, "{}", version);
        assert_eq!(decrypt(&short, &params).unwrap(), b"a");
    }
}

#[test]
fn test_padding_spans_records() {
    for version in VERSIONS {
        let params = key_params(version).with_record_size(40).with_pad(150);
        let encrypted = encrypt(b"hello padding", &params).unwrap();
        assert_eq!(decrypt(&encrypted, &params).unwrap(), b"hello padding", "{}", version);
    }
}

#[test]
fn test_aesgcm128_pad_beyond_one_byte_length() {
    // A one-byte pad length cannot fill a large record; the excess is dropped.
    let params = key_params(ContentEncoding::AesGcm128)
        .with_record_size(1000)
        .with_pad(600);
    let encrypted = encrypt(b"x", &params).unwrap();
    assert_eq!(decrypt(&encrypted, &params).unwrap(), b"x");
}

// ============================================================================
// Test Category 4: Tampering and Truncation
// ============================================================================

#[test]
fn test_every_bit_flip_fails_authentication() {
    for version in VERSIONS {
        let params = key_params(version).with_record_size(40);
        let encrypted = encrypt(b"bit flips must never go unnoticed", &params).unwrap();
        let body_start = if version.is_legacy() { 0 } else { 21 };

        for i in body_start..encrypted.len() {
            for bit in 0..8 {
                let mut tampered = encrypted.clone();
                tampered[i] ^= 1 << bit;
                let err = decrypt(&tampered, &params).unwrap_err();
                assert!(
                    matches!(err, CryptoError::Authentication),
                    "{} byte {} bit {}: {}",
                    version,
                    i,
                    bit,
                    err
                );
            }
        }
    }
}

#[test]
fn test_dropped_final_record_detected() {
    let params = key_params(ContentEncoding::Aes128Gcm).with_record_size(30);
    let encrypted = encrypt(&[9u8; 30], &params).unwrap();
    // Records: 13 + 13 + 4 data bytes.
    let truncated = &encrypted[..21 + 30 * 2];
    let err = decrypt(truncated, &params).unwrap_err();
    assert!(matches!(err, CryptoError::InvalidPadding(_)));
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_legacy_truncated_at_record_boundary() {
    let params = key_params(ContentEncoding::AesGcm).with_record_size(20);
    let encrypted = encrypt(&[1u8; 40], &params).unwrap();
    let err = decrypt(&encrypted[..36], &params).unwrap_err();
    assert!(matches!(err, CryptoError::Truncated(_)));
}

#[test]
fn test_tiny_final_record_truncated() {
    let params = key_params(ContentEncoding::Aes128Gcm);
    let mut encrypted = encrypt(b"x", &params).unwrap();
    encrypted.truncate(21 + 10);
    let err = decrypt(&encrypted, &params).unwrap_err();
    assert!(matches!(err, CryptoError::Truncated(_)));
}

#[test]
fn test_header_only_body_truncated() {
    let params = key_params(ContentEncoding::Aes128Gcm);
    let encrypted = encrypt(b"x", &params).unwrap();
    let err = decrypt(&encrypted[..21], &params).unwrap_err();
    assert!(matches!(err, CryptoError::Truncated(_)));
}

#[test]
fn test_short_header_rejected() {
    let params = key_params(ContentEncoding::Aes128Gcm);
    let err = decrypt(&[0u8; 12], &params).unwrap_err();
    assert!(matches!(err, CryptoError::HeaderTooShort { needed: 21, actual: 12 }));
}

#[test]
fn test_header_record_size_validated() {
    let params = EceParams::new(ContentEncoding::Aes128Gcm).with_key(vec![1u8; 16]);
    let mut buf = vec![0u8; 16];
    buf.extend_from_slice(&17u32.to_be_bytes());
    buf.push(0);
    buf.extend_from_slice(&[0u8; 32]);
    let err = decrypt(&buf, &params).unwrap_err();
    assert!(matches!(err, CryptoError::InvalidRecordSize { rs: 17, .. }));
}

// ============================================================================
// Test Category 5: Isolation and Uniqueness
// ============================================================================

#[test]
fn test_cross_version_isolation() {
    let plaintext = b"cross-version payload";
    for from in VERSIONS {
        let encrypted = encrypt(plaintext, &key_params(from)).unwrap();
        for to in VERSIONS.into_iter().filter(|v| *v != from) {
            let result = decrypt(&encrypted, &key_params(to));
            assert!(result.is_err(), "{} decrypted as {}", from, to);
        }
    }
}

#[test]
fn test_salt_uniqueness() {
    let params = EceParams::new(ContentEncoding::Aes128Gcm).with_key(vec![0x42; 16]);
    let mut seen = HashSet::new();
    for _ in 0..10_000 {
        let encrypted = encrypt(b"same plaintext", &params).unwrap();
        assert!(seen.insert(encrypted), "ciphertext repeated");
    }
}

#[test]
fn test_wrong_receiver_fails() {
    let (enc, _) = dh_pair(ContentEncoding::Aes128Gcm);
    let encrypted = encrypt(b"x", &enc).unwrap();
    let stranger = EceParams::new(ContentEncoding::Aes128Gcm)
        .with_private_key(EcKeyPair::generate())
        .with_auth_secret(vec![0x5a; 16]);
    let err = decrypt(&encrypted, &stranger).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
}

// ============================================================================
// Test Category 6: Key Lookup
// ============================================================================

#[test]
fn test_key_map_roundtrip() {
    let mut map = KeyMap::new();
    map.insert(b"k1".to_vec(), vec![0x10; 16]);
    map.insert(b"k2".to_vec(), vec![0x20; 16]);

    for version in VERSIONS {
        let params = EceParams::new(version)
            .with_key_lookup(map.clone())
            .with_key_id(b"k2".to_vec())
            .with_salt(vec![0x44; 16]);
        let encrypted = encrypt(b"stored key", &params).unwrap();

        let explicit = EceParams::new(version)
            .with_key(vec![0x20; 16])
            .with_salt(vec![0x44; 16])
            .with_key_id(b"k2".to_vec());
        assert_eq!(encrypt(b"stored key", &explicit).unwrap(), encrypted);
        assert_eq!(decrypt(&encrypted, &params).unwrap(), b"stored key");
    }
}

#[test]
fn test_key_id_from_header_drives_lookup() {
    let mut map = KeyMap::new();
    map.insert(b"k1".to_vec(), vec![0x10; 16]);
    let enc = EceParams::new(ContentEncoding::Aes128Gcm)
        .with_key_lookup(map.clone())
        .with_key_id(b"k1".to_vec());
    let encrypted = encrypt(b"lookup", &enc).unwrap();

    // The decrypting side supplies no key id.
    let dec = EceParams::new(ContentEncoding::Aes128Gcm).with_key_lookup(map);
    assert_eq!(decrypt(&encrypted, &dec).unwrap(), b"lookup");
}

#[test]
fn test_lookup_closure_missing_key() {
    let params = EceParams::new(ContentEncoding::AesGcm)
        .with_key_lookup(|_: &[u8]| -> Option<Vec<u8>> { None })
        .with_key_id(b"nobody".to_vec());
    let err = encrypt(b"x", &params).unwrap_err();
    assert!(matches!(err, CryptoError::KeyNotFound(ref id) if id == "nobody"));
    assert_eq!(err.kind(), ErrorKind::Parameter);
}

// ============================================================================
// Test Category 7: Parameter Validation and Key Logging
// ============================================================================

#[test]
fn test_parameter_errors_are_parameter_kind() {
    let cases = vec![
        EceParams::new(ContentEncoding::Aes128Gcm).with_key(vec![1u8; 17]),
        EceParams::new(ContentEncoding::Aes128Gcm).with_key(vec![1u8; 16]).with_salt(vec![0u8; 15]),
        EceParams::new(ContentEncoding::Aes128Gcm).with_key(vec![1u8; 16]).with_record_size(10),
        EceParams::new(ContentEncoding::Aes128Gcm),
        dh_pair(ContentEncoding::Aes128Gcm).0.with_auth_secret(vec![1u8; 15]),
    ];
    for params in cases {
        let err = encrypt(b"x", &params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parameter, "{}", err);
    }
}

#[test]
fn test_unbounded_pad_is_rejected_before_encryption() {
    for version in VERSIONS {
        let params = EceParams::new(version)
            .with_key(vec![1u8; 16])
            .with_salt(vec![2u8; 16])
            .with_pad(usize::MAX);
        let err = encrypt(b"x", &params).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidParameter(_)), "{}", err);
    }
}

#[test]
fn test_keylog_sees_derivation_steps() {
    let labels = Arc::new(Mutex::new(Vec::<(String, usize)>::new()));
    let sink = {
        let labels = Arc::clone(&labels);
        move |label: &str, data: &[u8]| labels.lock().unwrap().push((label.to_string(), data.len()))
    };
    let engine = Ece::with_keylog(Arc::new(sink));
    let (enc, _) = dh_pair(ContentEncoding::AesGcm);
    engine.encrypt(&[0u8; 10], &enc).unwrap();

    let labels = labels.lock().unwrap();
    let find = |name: &str| labels.iter().find(|(l, _)| l == name).map(|(_, len)| *len);
    assert_eq!(find("salt"), Some(16));
    assert_eq!(find("shared secret"), Some(32));
    assert_eq!(find("context"), Some(6 + 2 * 67));
    assert_eq!(find("secret"), Some(32));
    assert_eq!(find("key"), Some(16));
    assert_eq!(find("nonce base"), Some(12));
    assert_eq!(find("nonce"), Some(12));
}

#[test]
fn test_default_engine_matches_logging_engine() {
    let params = key_params(ContentEncoding::Aes128Gcm);
    let quiet = Ece::new().encrypt(b"same", &params).unwrap();
    let noisy = Ece::with_keylog(Arc::new(webpush_ece::TracingKeyLog))
        .encrypt(b"same", &params)
        .unwrap();
    assert_eq!(quiet, noisy);
}
