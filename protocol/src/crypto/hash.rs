//! # Hashing Utilities
//!
//! Byte-level digests used outside the field pipeline:
//!
//! - **SHA-256**: the plain digest of `unique_key_hash`, binding hashes,
//!   payment hashes, and the fallback hash backend.
//! - **Keccak-256**: EVM address derivation and personal-message hashing.
//! - **BLAKE3**: local-only identifiers (simulated transaction hashes).
//!
//! Everything that leaves the device is rendered with [`to_prefixed_hex`]
//! so every party compares the same textual form.

use sha2::{Digest, Sha256};
use sha3::Keccak256;

/// Compute the SHA-256 digest of `data` as a fixed-size array.
///
/// # Example
///
/// ```
/// use veripay_protocol::crypto::hash::sha256;
///
/// let hash = sha256(b"veripay");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 over several parts fed sequentially, without concatenating first.
pub fn sha256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Compute the Keccak-256 digest used by EVM chains.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Compute the BLAKE3 digest of `data`.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Render bytes as lowercase hex with a `0x` prefix.
pub fn to_prefixed_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Strip a leading `0x` / `0X` if present.
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// True when `s` matches `^0x[0-9a-fA-F]+$`.
pub fn is_prefixed_hex(s: &str) -> bool {
    match s.strip_prefix("0x") {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

/// Case-insensitive comparison of two hex renderings, ignoring the prefix.
pub fn hex_eq(a: &str, b: &str) -> bool {
    strip_hex_prefix(a).eq_ignore_ascii_case(strip_hex_prefix(b))
}

/// The first `len` characters of a hash, for log lines and error messages.
pub fn hash_prefix(hash: &str, len: usize) -> &str {
    match hash.char_indices().nth(len) {
        Some((idx, _)) => &hash[..idx],
        None => hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let hash = sha256(b"");
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(hash.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_keccak256_known_vector() {
        let hash = keccak256(b"");
        assert_eq!(
            hex::encode(hash),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn sha256_multi_matches_concatenation() {
        let multi = sha256_multi(&[b"age", b"true"]);
        let single = sha256(b"agetrue");
        assert_eq!(multi, single);
    }

    #[test]
    fn blake3_deterministic() {
        assert_eq!(blake3_hash(b"veripay"), blake3_hash(b"veripay"));
        assert_ne!(blake3_hash(b"veripay"), blake3_hash(b"VeriPay"));
    }

    #[test]
    fn prefixed_hex_rendering() {
        assert_eq!(to_prefixed_hex(&[0xab, 0x01]), "0xab01");
    }

    #[test]
    fn prefixed_hex_validation() {
        assert!(is_prefixed_hex("0xdeadBEEF"));
        assert!(!is_prefixed_hex("0x"));
        assert!(!is_prefixed_hex("deadbeef"));
        assert!(!is_prefixed_hex("0xdeadbeeg"));
        assert!(!is_prefixed_hex("0Xdeadbeef"));
    }

    #[test]
    fn hex_comparison_ignores_case_and_prefix() {
        assert!(hex_eq("0xABCD", "abcd"));
        assert!(!hex_eq("0xabcd", "0xabce"));
    }

    #[test]
    fn prefix_is_clamped() {
        assert_eq!(hash_prefix("0x1234", 10), "0x1234");
        assert_eq!(hash_prefix("0x1234567890abcdef", 10), "0x12345678");
    }
}
