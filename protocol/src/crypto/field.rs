//! 256-bit field-element values.
//!
//! A [`FieldElement`] is a big-endian 256-bit integer. The Poseidon backend
//! reduces it modulo the BN254 scalar field order on the way in; the digest
//! backend consumes its hex rendering as-is. Either way the output of a hash
//! is always exactly 32 bytes, rendered as `0x` plus 64 hex digits.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::hash::{sha256, strip_hex_prefix};
use crate::config::HASH_HEX_DIGITS;
use crate::error::{ProtocolError, ProtocolResult};

/// A 256-bit value flowing through the field-hash pipeline.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct FieldElement([u8; 32]);

impl FieldElement {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Encode free text (a date, a document type, an address) as a field
    /// input: the SHA-256 of its UTF-8 bytes read as a 256-bit integer.
    pub fn from_text(text: &str) -> Self {
        Self(sha256(text.as_bytes()))
    }

    /// Parse a `0x`-prefixed hex value of at most 64 digits, left-padding
    /// shorter values with zeros.
    pub fn from_hex(s: &str) -> ProtocolResult<Self> {
        if !s.starts_with("0x") && !s.starts_with("0X") {
            return Err(ProtocolError::validation(format!(
                "expected 0x-prefixed hex, got {s:?}"
            )));
        }
        let digits = strip_hex_prefix(s);
        if digits.is_empty() || digits.len() > HASH_HEX_DIGITS {
            return Err(ProtocolError::validation(format!(
                "hex value must have 1..={HASH_HEX_DIGITS} digits, got {}",
                digits.len()
            )));
        }
        let padded = format!("{digits:0>width$}", width = HASH_HEX_DIGITS);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&padded, &mut bytes)
            .map_err(|e| ProtocolError::validation(format!("invalid hex {s:?}: {e}")))?;
        Ok(Self(bytes))
    }

    /// Parse a caller-supplied scalar such as a credential nonce. Accepts
    /// `0x` hex or an unsigned decimal that fits in 256 bits.
    pub fn parse_scalar(s: &str) -> ProtocolResult<Self> {
        let s = s.trim();
        if s.starts_with("0x") || s.starts_with("0X") {
            return Self::from_hex(s);
        }
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ProtocolError::validation(format!(
                "scalar must be 0x-hex or decimal, got {s:?}"
            )));
        }
        let mut bytes = [0u8; 32];
        for digit in s.bytes().map(|b| b - b'0') {
            // bytes = bytes * 10 + digit, big-endian, with overflow detection.
            let mut carry = digit as u16;
            for byte in bytes.iter_mut().rev() {
                let v = (*byte as u16) * 10 + carry;
                *byte = (v & 0xff) as u8;
                carry = v >> 8;
            }
            if carry != 0 {
                return Err(ProtocolError::validation("decimal scalar exceeds 256 bits"));
            }
        }
        Ok(Self(bytes))
    }

    /// `0x` + 64 lowercase hex digits.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// True when the value is below the BN254 scalar modulus, i.e. it is
    /// the only encoding of its residue that `to_fr` maps to.
    pub fn is_canonical(&self) -> bool {
        Self::from_fr(&self.to_fr()) == *self
    }

    pub(crate) fn to_fr(self) -> Fr {
        Fr::from_be_bytes_mod_order(&self.0)
    }

    pub(crate) fn from_fr(value: &Fr) -> Self {
        let be = value.into_bigint().to_bytes_be();
        let mut bytes = [0u8; 32];
        // BN254 Fr serializes to at most 32 bytes; right-align.
        bytes[32 - be.len()..].copy_from_slice(&be);
        Self(bytes)
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.to_hex())
    }
}

impl FromStr for FieldElement {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<FieldElement> for String {
    fn from(value: FieldElement) -> Self {
        value.to_hex()
    }
}

impl TryFrom<String> for FieldElement {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}
