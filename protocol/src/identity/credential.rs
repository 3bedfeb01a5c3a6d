//! # Credential Commitments
//!
//! Turns a locally held identity document plus a wallet address into three
//! values:
//!
//! ```text
//! id_commit        = H( H(dob), H(docType), H(expiry), nonce )
//! unique_key       = H( id_commit, H(lowercase(wallet)) )
//! unique_key_hash  = sha256( unique_key bytes )        -> sent to the registry
//! ```
//!
//! `H` is the injected [`HashBackend`]'s field hash and `H(text)` hashes the
//! text's field encoding. Only `unique_key_hash` ever leaves the device.
//! It is stable for a given (document, wallet) pair, so the registry can
//! refuse a second registration without learning anything else.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::backend::{BackendKind, HashBackend};
use crate::crypto::field::FieldElement;
use crate::crypto::hash::to_prefixed_hex;
use crate::error::{ProtocolError, ProtocolResult};

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// Private document attributes. Never transmitted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialAttributes {
    /// Date of birth as printed on the document (`YYYY-MM-DD`).
    pub dob: String,
    pub doc_type: String,
    pub expiry: String,
    /// Caller-chosen blinding value, `0x` hex or decimal.
    pub nonce: String,
}

impl CredentialAttributes {
    pub fn new(
        dob: impl Into<String>,
        doc_type: impl Into<String>,
        expiry: impl Into<String>,
        nonce: impl Into<String>,
    ) -> Self {
        Self {
            dob: dob.into(),
            doc_type: doc_type.into(),
            expiry: expiry.into(),
            nonce: nonce.into(),
        }
    }

    fn validate(&self) -> ProtocolResult<()> {
        for (name, value) in [
            ("dob", &self.dob),
            ("docType", &self.doc_type),
            ("expiry", &self.expiry),
            ("nonce", &self.nonce),
        ] {
            if value.trim().is_empty() {
                return Err(ProtocolError::validation(format!(
                    "credential attribute `{name}` is empty"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for CredentialAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialAttributes")
            .field("dob", &"<redacted>")
            .field("doc_type", &"<redacted>")
            .field("expiry", &"<redacted>")
            .field("nonce", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Derivations
// ---------------------------------------------------------------------------

/// `H(H(dob), H(docType), H(expiry), nonce)`.
///
/// # Errors
///
/// [`ProtocolError::Validation`] for an empty attribute, a nonce that is
/// neither `0x` hex nor decimal, or a nonce the backend would alias.
pub fn compute_id_commit(
    backend: &dyn HashBackend,
    attrs: &CredentialAttributes,
) -> ProtocolResult<FieldElement> {
    attrs.validate()?;
    let nonce = FieldElement::parse_scalar(&attrs.nonce)?;
    backend.check_input(&nonce)?;

    let inputs = [
        backend.hash_text(&attrs.dob),
        backend.hash_text(&attrs.doc_type),
        backend.hash_text(&attrs.expiry),
        nonce,
    ];
    Ok(backend.field_hash(&inputs))
}

/// `H(id_commit, H(lowercase(wallet)))`. Wallet case never matters.
pub fn compute_unique_key(
    backend: &dyn HashBackend,
    id_commit: &FieldElement,
    wallet: &str,
) -> ProtocolResult<FieldElement> {
    let wallet = wallet.trim();
    if wallet.is_empty() {
        return Err(ProtocolError::validation("wallet address is empty"));
    }
    let wallet_hash = backend.hash_text(&wallet.to_lowercase());
    Ok(backend.field_hash(&[*id_commit, wallet_hash]))
}

/// Plain digest of the unique key's 32 bytes, rendered `0x…`.
pub fn compute_unique_key_hash(backend: &dyn HashBackend, unique_key: &FieldElement) -> String {
    to_prefixed_hex(&backend.digest(unique_key.as_bytes()))
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// All values derived from one (document, wallet) pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialCommitment {
    pub id_commit: FieldElement,
    pub unique_key: FieldElement,
    pub unique_key_hash: String,
    /// Backend that produced the values. Commitments from different
    /// backends never compare equal.
    pub backend: BackendKind,
}

impl CredentialCommitment {
    /// Run the full derivation.
    pub fn derive(
        backend: &dyn HashBackend,
        attrs: &CredentialAttributes,
        wallet: &str,
    ) -> ProtocolResult<Self> {
        let id_commit = compute_id_commit(backend, attrs)?;
        let unique_key = compute_unique_key(backend, &id_commit, wallet)?;
        let unique_key_hash = compute_unique_key_hash(backend, &unique_key);

        tracing::debug!(
            backend = %backend.kind(),
            unique_key_hash = %unique_key_hash,
            "credential commitment derived"
        );

        Ok(Self {
            id_commit,
            unique_key,
            unique_key_hash,
            backend: backend.kind(),
        })
    }
}

impl fmt::Debug for CredentialCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCommitment")
            .field("id_commit", &"<redacted>")
            .field("unique_key", &"<redacted>")
            .field("unique_key_hash", &self.unique_key_hash)
            .field("backend", &self.backend)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::backend::{DigestBackend, PoseidonBackend};

    fn attrs() -> CredentialAttributes {
        CredentialAttributes::new("1990-01-01", "passport", "2030-01-01", "0xabc123")
    }

    const WALLET: &str = "0x1111111111111111111111111111111111111111";

    #[test]
    fn poseidon_known_answer() {
        let backend = PoseidonBackend::new().unwrap();
        let commitment = CredentialCommitment::derive(&backend, &attrs(), WALLET).unwrap();
        assert_eq!(
            commitment.id_commit.to_hex(),
            "0x0178b6dcc5422ed0d07a15747350859d624dcd7f7c657d208b9639f009fd2126"
        );
        assert_eq!(
            commitment.unique_key.to_hex(),
            "0x095a6f5f3922ef8a47ad14e47c6c35fcf29867083df681c2a7a8c464eb60bc78"
        );
        assert_eq!(
            commitment.unique_key_hash,
            "0x98028af6b733300979035d0fef85d84a751bda573338fbbdfabeb5ec7656a2f3"
        );
    }

    #[test]
    fn digest_known_answer() {
        let commitment = CredentialCommitment::derive(&DigestBackend, &attrs(), WALLET).unwrap();
        assert_eq!(
            commitment.id_commit.to_hex(),
            "0x623f537bb797ea9c33fa2b74c16a16a62ddb70e6edfc7073595514d59a531679"
        );
        assert_eq!(
            commitment.unique_key.to_hex(),
            "0xc60c0d40eb7f35b287151894941ea03c8471c639e9d07bddee810e78d4076590"
        );
        assert_eq!(
            commitment.unique_key_hash,
            "0xa25c384427d7dbc3bdeef2f997ae7113ff00c95c1b49f89a189d7e2368d215d7"
        );
    }

    #[test]
    fn id_commit_is_deterministic() {
        let backend = PoseidonBackend::new().unwrap();
        let a = compute_id_commit(&backend, &attrs()).unwrap();
        let b = compute_id_commit(&backend, &attrs()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn id_commit_depends_on_every_attribute() {
        let backend = DigestBackend;
        let base = compute_id_commit(&backend, &attrs()).unwrap();

        let mut changed = attrs();
        changed.dob = "1990-01-02".into();
        assert_ne!(compute_id_commit(&backend, &changed).unwrap(), base);

        let mut changed = attrs();
        changed.doc_type = "id_card".into();
        assert_ne!(compute_id_commit(&backend, &changed).unwrap(), base);

        let mut changed = attrs();
        changed.nonce = "0xabc124".into();
        assert_ne!(compute_id_commit(&backend, &changed).unwrap(), base);
    }

    #[test]
    fn nonce_accepts_decimal_equivalent() {
        let backend = PoseidonBackend::new().unwrap();
        let mut decimal = attrs();
        decimal.nonce = "11256099".into();
        assert_eq!(
            compute_id_commit(&backend, &decimal).unwrap(),
            compute_id_commit(&backend, &attrs()).unwrap()
        );
    }

    #[test]
    fn bad_nonce_is_validation_error() {
        let backend = DigestBackend;
        let mut bad = attrs();
        bad.nonce = "not-a-number".into();
        assert!(matches!(
            compute_id_commit(&backend, &bad),
            Err(ProtocolError::Validation(_))
        ));
    }

    #[test]
    fn nonce_above_modulus_is_rejected_under_poseidon() {
        let backend = PoseidonBackend::new().unwrap();
        let mut aliased = attrs();
        // 0xabc123 + r
        aliased.nonce =
            "0x30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0abc124".into();
        assert!(matches!(
            compute_id_commit(&backend, &aliased),
            Err(ProtocolError::Validation(_))
        ));
        assert!(compute_id_commit(&DigestBackend, &aliased).is_ok());
    }

    #[test]
    fn empty_attribute_is_validation_error() {
        let backend = DigestBackend;
        let mut bad = attrs();
        bad.expiry = "  ".into();
        assert!(compute_id_commit(&backend, &bad).is_err());
    }

    #[test]
    fn different_wallets_give_different_keys() {
        let backend = PoseidonBackend::new().unwrap();
        let id = compute_id_commit(&backend, &attrs()).unwrap();
        let a = compute_unique_key(&backend, &id, "0x1111111111111111111111111111111111111111")
            .unwrap();
        let b = compute_unique_key(&backend, &id, "0x2222222222222222222222222222222222222222")
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wallet_case_is_ignored() {
        let backend = PoseidonBackend::new().unwrap();
        let id = compute_id_commit(&backend, &attrs()).unwrap();
        let lower = compute_unique_key(&backend, &id, "0xabcdef0000000000000000000000000000000000")
            .unwrap();
        let upper = compute_unique_key(&backend, &id, "0xABCDEF0000000000000000000000000000000000")
            .unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn unique_key_hash_is_prefixed_sha256() {
        let backend = PoseidonBackend::new().unwrap();
        let commitment = CredentialCommitment::derive(&backend, &attrs(), "0xWallet").unwrap();
        assert!(commitment.unique_key_hash.starts_with("0x"));
        assert_eq!(commitment.unique_key_hash.len(), 66);
        assert_eq!(
            commitment.unique_key_hash,
            to_prefixed_hex(&crate::crypto::hash::sha256(commitment.unique_key.as_bytes()))
        );
    }

    #[test]
    fn debug_output_is_redacted() {
        let backend = DigestBackend;
        let commitment = CredentialCommitment::derive(&backend, &attrs(), "0xWallet").unwrap();
        let rendered = format!("{:?} {:?}", attrs(), commitment);
        assert!(!rendered.contains("1990-01-01"));
        assert!(!rendered.contains(&commitment.id_commit.to_hex()));
        assert!(rendered.contains(&commitment.unique_key_hash));
    }
}
