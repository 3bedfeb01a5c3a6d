//! # EVM Signatures
//!
//! Payers sign a [`PaymentRecord`](crate::payment::PaymentRecord) with their
//! wallet key using the EIP-191 personal-message scheme. Verifiers recover
//! the signer's address from the signature and compare it with the record's
//! `from` field, so no public key ever needs to be shipped alongside.
//!
//! Signatures are 65 bytes, `r || s || v` with `v` in `{27, 28}`, and travel
//! as `0x`-prefixed hex.

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};
use std::fmt;

use super::hash::{is_prefixed_hex, strip_hex_prefix, to_prefixed_hex};
use crate::config::SIGNATURE_LENGTH;
use crate::error::{ProtocolError, ProtocolResult};

thread_local! {
    static SECP256K1_CTX: Secp256k1<secp256k1::All> = Secp256k1::new();
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// A wallet signing key plus its derived address.
pub struct EvmKeypair {
    secret: SecretKey,
    address: String,
}

impl EvmKeypair {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let secret = SecretKey::new(&mut rand::thread_rng());
        Self::from_secret(secret)
    }

    /// Load a key from its 32 raw bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> ProtocolResult<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| ProtocolError::Signature(format!("invalid secret key: {e}")))?;
        Ok(Self::from_secret(secret))
    }

    fn from_secret(secret: SecretKey) -> Self {
        let public = SECP256K1_CTX.with(|ctx| PublicKey::from_secret_key(ctx, &secret));
        Self {
            secret,
            address: address_from_public_key(&public),
        }
    }

    /// Lower-case `0x` address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Sign `message` with the personal-message prefix. Returns the
    /// `0x`-prefixed 65-byte signature.
    pub fn sign_personal(&self, message: &[u8]) -> String {
        let digest = personal_message_hash(message);
        let message = Message::from_digest(digest);
        let (recovery_id, compact) = SECP256K1_CTX
            .with(|ctx| ctx.sign_ecdsa_recoverable(&message, &self.secret))
            .serialize_compact();

        let mut sig = [0u8; SIGNATURE_LENGTH];
        sig[..64].copy_from_slice(&compact);
        sig[64] = recovery_id.to_i32() as u8 + 27;
        to_prefixed_hex(&sig)
    }
}

impl fmt::Debug for EvmKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmKeypair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Hashing & recovery
// ---------------------------------------------------------------------------

/// `keccak256("\x19Ethereum Signed Message:\n" + len + message)`.
pub fn personal_message_hash(message: &[u8]) -> [u8; 32] {
    let prefix = format!("\x19Ethereum Signed Message:\n{}", message.len());
    let mut hasher = Keccak256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// Decode a `0x` + 130 hex digit signature.
pub fn parse_signature(signature: &str) -> ProtocolResult<[u8; SIGNATURE_LENGTH]> {
    if !is_prefixed_hex(signature) {
        return Err(ProtocolError::Signature(
            "signature must be 0x-prefixed hex".into(),
        ));
    }
    let mut bytes = [0u8; SIGNATURE_LENGTH];
    hex::decode_to_slice(strip_hex_prefix(signature), &mut bytes).map_err(|_| {
        ProtocolError::Signature(format!(
            "signature must be {SIGNATURE_LENGTH} bytes, got {} hex digits",
            signature.len() - 2
        ))
    })?;
    Ok(bytes)
}

/// Recover the address that produced `signature` over `message` (personal
/// message scheme). Accepts `v` as 0/1 or 27/28.
pub fn recover_address(message: &[u8], signature: &str) -> ProtocolResult<String> {
    let sig = parse_signature(signature)?;
    let v = if sig[64] >= 27 { sig[64] - 27 } else { sig[64] };

    let recovery_id = RecoveryId::from_i32(v as i32)
        .map_err(|e| ProtocolError::Signature(format!("bad recovery id: {e}")))?;
    let recoverable = RecoverableSignature::from_compact(&sig[..64], recovery_id)
        .map_err(|e| ProtocolError::Signature(e.to_string()))?;
    let message = Message::from_digest(personal_message_hash(message));

    let public = SECP256K1_CTX
        .with(|ctx| ctx.recover_ecdsa(&message, &recoverable))
        .map_err(|e| ProtocolError::Signature(format!("recovery failed: {e}")))?;
    Ok(address_from_public_key(&public))
}

/// Last 20 bytes of keccak over the uncompressed key (without the 0x04 tag).
fn address_from_public_key(public: &PublicKey) -> String {
    let uncompressed = public.serialize_uncompressed();
    let hash = Keccak256::digest(&uncompressed[1..]);
    to_prefixed_hex(&hash[12..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::hex_eq;

    #[test]
    fn address_shape() {
        let kp = EvmKeypair::generate();
        assert!(kp.address().starts_with("0x"));
        assert_eq!(kp.address().len(), 42);
    }

    #[test]
    fn known_key_address() {
        // Private key 1 maps to the well-known generator address.
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        let kp = EvmKeypair::from_bytes(&bytes).unwrap();
        assert!(hex_eq(
            kp.address(),
            "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
        ));
    }

    #[test]
    fn sign_then_recover() {
        let kp = EvmKeypair::generate();
        let sig = kp.sign_personal(b"pay 10 USDC");
        assert_eq!(sig.len(), 2 + SIGNATURE_LENGTH * 2);

        let recovered = recover_address(b"pay 10 USDC", &sig).unwrap();
        assert_eq!(recovered, kp.address());
    }

    #[test]
    fn recover_on_different_message_yields_other_address() {
        let kp = EvmKeypair::generate();
        let sig = kp.sign_personal(b"original");
        if let Ok(addr) = recover_address(b"tampered", &sig) {
            assert_ne!(addr, kp.address());
        }
    }

    #[test]
    fn malformed_signatures_rejected() {
        assert!(parse_signature("0x1234").is_err());
        assert!(parse_signature(&"ab".repeat(65)).is_err());
        assert!(parse_signature(&format!("0x{}", "zz".repeat(65))).is_err());
        assert!(parse_signature(&format!("0x{}", "ab".repeat(65))).is_ok());
    }

    #[test]
    fn personal_hash_depends_on_length_prefix() {
        assert_ne!(personal_message_hash(b"a"), personal_message_hash(b"aa"));
    }
}
