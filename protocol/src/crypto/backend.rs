//! # Hash Backends
//!
//! The commitment pipeline needs one primitive: a deterministic hash from an
//! ordered list of field elements to a field element. Two implementations
//! exist:
//!
//! - [`PoseidonBackend`]: the Poseidon sponge over BN254 `Fr`, the same
//!   permutation a circuit would use, so commitments computed here can be
//!   recomputed inside a proof.
//! - [`DigestBackend`]: SHA-256 over a canonical string rendering of the
//!   inputs. Only used when Poseidon cannot be set up.
//!
//! A backend is chosen exactly once by [`select_backend`] and then handed to
//! every component as an `Arc<dyn HashBackend>`. Nothing in this crate picks
//! a backend per call. Commitments produced by different backends are not
//! comparable, which is why every persisted artifact records
//! [`HashBackend::kind`].
//!
//! ## Poseidon parameters
//!
//! ```text
//! field      BN254 Fr
//! width      3 (rate 2, capacity 1)
//! rounds     8 full + 57 partial
//! s-box      x^5
//! constants  Grain LFSR (arkworks find_poseidon_ark_and_mds)
//! output     first squeezed element
//! ```

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    poseidon::{find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge},
    CryptographicSponge,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use super::field::FieldElement;
use super::hash::sha256;
use crate::config::{
    BN254_FIELD_BITS, DIGEST_BACKEND_TAG, POSEIDON_ALPHA, POSEIDON_FULL_ROUNDS,
    POSEIDON_PARTIAL_ROUNDS, POSEIDON_RATE,
};
use crate::error::{ProtocolError, ProtocolResult};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Which primitive a backend uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Poseidon,
    Digest,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Poseidon => f.write_str("poseidon"),
            BackendKind::Digest => f.write_str("digest"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "poseidon" => Ok(BackendKind::Poseidon),
            "digest" | "sha256" => Ok(BackendKind::Digest),
            other => Err(format!("unknown hash backend: {other}")),
        }
    }
}

/// Deterministic hashing primitive threaded through every component.
///
/// Implementations must be pure: identical ordered inputs give identical
/// output on every call, in every process.
pub trait HashBackend: Send + Sync + fmt::Debug {
    /// The primitive behind this backend.
    fn kind(&self) -> BackendKind;

    /// Hash an ordered sequence of field elements to one field element.
    fn field_hash(&self, inputs: &[FieldElement]) -> FieldElement;

    /// Plain 256-bit byte digest. Never fed back into `field_hash`
    /// pipelines by this crate.
    fn digest(&self, data: &[u8]) -> [u8; 32] {
        sha256(data)
    }

    /// Hash one text attribute: `field_hash([from_text(text)])`.
    fn hash_text(&self, text: &str) -> FieldElement {
        self.field_hash(&[FieldElement::from_text(text)])
    }

    /// Reject a caller-supplied value that this backend would hash the same
    /// as some other value. Used for accumulator leaves and nonces.
    fn check_input(&self, _value: &FieldElement) -> ProtocolResult<()> {
        Ok(())
    }
}

/// Shared handle to the backend selected at startup.
pub type SharedBackend = Arc<dyn HashBackend>;

// ---------------------------------------------------------------------------
// Poseidon
// ---------------------------------------------------------------------------

/// Poseidon sponge over BN254.
pub struct PoseidonBackend {
    config: PoseidonConfig<Fr>,
}

impl PoseidonBackend {
    /// Generate the round constants and MDS matrix.
    ///
    /// # Errors
    ///
    /// Returns [`BackendDegraded`] if the generated parameters do not have
    /// the expected shape for a width-3 permutation.
    pub fn new() -> Result<Self, BackendDegraded> {
        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
            BN254_FIELD_BITS,
            POSEIDON_RATE,
            POSEIDON_FULL_ROUNDS,
            POSEIDON_PARTIAL_ROUNDS,
            0,
        );

        let width = POSEIDON_RATE + 1;
        let rounds = (POSEIDON_FULL_ROUNDS + POSEIDON_PARTIAL_ROUNDS) as usize;
        if ark.len() != rounds || ark.iter().any(|row| row.len() != width) {
            return Err(BackendDegraded::new(format!(
                "poseidon round constants have unexpected shape ({} rows)",
                ark.len()
            )));
        }
        if mds.len() != width || mds.iter().any(|row| row.len() != width) {
            return Err(BackendDegraded::new("poseidon MDS matrix is not 3x3"));
        }

        Ok(Self {
            config: PoseidonConfig {
                full_rounds: POSEIDON_FULL_ROUNDS as usize,
                partial_rounds: POSEIDON_PARTIAL_ROUNDS as usize,
                alpha: POSEIDON_ALPHA,
                ark,
                mds,
                rate: POSEIDON_RATE,
                capacity: 1,
            },
        })
    }
}

impl fmt::Debug for PoseidonBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoseidonBackend")
            .field("rate", &self.config.rate)
            .field("full_rounds", &self.config.full_rounds)
            .field("partial_rounds", &self.config.partial_rounds)
            .finish()
    }
}

impl HashBackend for PoseidonBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Poseidon
    }

    fn field_hash(&self, inputs: &[FieldElement]) -> FieldElement {
        let mut sponge = PoseidonSponge::new(&self.config);
        for input in inputs {
            sponge.absorb(&input.to_fr());
        }
        let out: Vec<Fr> = sponge.squeeze_field_elements(1);
        FieldElement::from_fr(&out[0])
    }

    // Inputs are reduced mod r, so `v` and `v + r` absorb identically.
    fn check_input(&self, value: &FieldElement) -> ProtocolResult<()> {
        if value.is_canonical() {
            Ok(())
        } else {
            Err(ProtocolError::validation(format!(
                "{value} is not below the BN254 scalar modulus"
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Digest fallback
// ---------------------------------------------------------------------------

/// SHA-256 over `"<tag>:" + inputs as 0x-hex joined by ","`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DigestBackend;

impl DigestBackend {
    fn canonical_encoding(inputs: &[FieldElement]) -> String {
        let joined = inputs
            .iter()
            .map(FieldElement::to_hex)
            .collect::<Vec<_>>()
            .join(",");
        format!("{DIGEST_BACKEND_TAG}:{joined}")
    }
}

impl HashBackend for DigestBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Digest
    }

    fn field_hash(&self, inputs: &[FieldElement]) -> FieldElement {
        FieldElement::from_bytes(sha256(Self::canonical_encoding(inputs).as_bytes()))
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// The preferred primitive was unavailable and the digest backend is active.
///
/// Two parties with different fallback policies compute incompatible
/// commitments, so callers should surface this to operators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("hash backend degraded to {active}: {reason}")]
pub struct BackendDegraded {
    pub requested: BackendKind,
    pub active: BackendKind,
    pub reason: String,
}

impl BackendDegraded {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            requested: BackendKind::Poseidon,
            active: BackendKind::Digest,
            reason: reason.into(),
        }
    }
}

/// Choose the process-wide backend. Call once at startup.
///
/// Requesting [`BackendKind::Digest`] is an explicit choice and never
/// reported as degraded.
pub fn select_backend(preferred: BackendKind) -> (SharedBackend, Option<BackendDegraded>) {
    match preferred {
        BackendKind::Digest => {
            tracing::info!(backend = %BackendKind::Digest, "hash backend selected");
            (Arc::new(DigestBackend), None)
        }
        BackendKind::Poseidon => match PoseidonBackend::new() {
            Ok(backend) => {
                tracing::info!(backend = %BackendKind::Poseidon, "hash backend selected");
                (Arc::new(backend), None)
            }
            Err(degraded) => {
                tracing::warn!(
                    reason = %degraded.reason,
                    "poseidon unavailable, falling back to digest backend"
                );
                (Arc::new(DigestBackend), Some(degraded))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poseidon() -> PoseidonBackend {
        PoseidonBackend::new().expect("poseidon parameters")
    }

    #[test]
    fn poseidon_is_deterministic() {
        let backend = poseidon();
        let inputs = [FieldElement::from_u64(1), FieldElement::from_u64(2)];
        assert_eq!(backend.field_hash(&inputs), backend.field_hash(&inputs));

        // A freshly constructed backend agrees: constants are not random.
        assert_eq!(poseidon().field_hash(&inputs), backend.field_hash(&inputs));
    }

    #[test]
    fn poseidon_is_order_sensitive() {
        let backend = poseidon();
        let a = FieldElement::from_u64(1);
        let b = FieldElement::from_u64(2);
        assert_ne!(backend.field_hash(&[a, b]), backend.field_hash(&[b, a]));
    }

    #[test]
    fn poseidon_output_is_reduced() {
        // Any output must survive a round trip through Fr unchanged.
        let backend = poseidon();
        let out = backend.field_hash(&[FieldElement::from_bytes([0xff; 32])]);
        assert_eq!(FieldElement::from_fr(&out.to_fr()), out);
    }

    #[test]
    fn poseidon_rejects_inputs_at_or_above_modulus() {
        let backend = poseidon();
        let five = FieldElement::from_u64(5);
        let aliased = FieldElement::from_hex(
            "0x30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000006",
        )
        .unwrap();
        assert_eq!(backend.field_hash(&[five]), backend.field_hash(&[aliased]));

        assert!(backend.check_input(&five).is_ok());
        assert!(matches!(
            backend.check_input(&aliased),
            Err(ProtocolError::Validation(_))
        ));
        // Digest hashes the hex rendering, so nothing aliases there.
        assert!(DigestBackend.check_input(&aliased).is_ok());
    }

    #[test]
    fn digest_backend_is_deterministic_and_arity_sensitive() {
        let backend = DigestBackend;
        let one = FieldElement::from_u64(1);
        assert_eq!(backend.field_hash(&[one]), backend.field_hash(&[one]));
        assert_ne!(backend.field_hash(&[one]), backend.field_hash(&[one, one]));
    }

    #[test]
    fn backends_disagree() {
        let inputs = [FieldElement::from_u64(9)];
        assert_ne!(poseidon().field_hash(&inputs), DigestBackend.field_hash(&inputs));
    }

    #[test]
    fn digest_is_shared_sha256() {
        assert_eq!(poseidon().digest(b"x"), DigestBackend.digest(b"x"));
    }

    #[test]
    fn select_respects_preference() {
        let (backend, degraded) = select_backend(BackendKind::Poseidon);
        assert_eq!(backend.kind(), BackendKind::Poseidon);
        assert!(degraded.is_none());

        let (backend, degraded) = select_backend(BackendKind::Digest);
        assert_eq!(backend.kind(), BackendKind::Digest);
        assert!(degraded.is_none());
    }

    #[test]
    fn backend_kind_parsing() {
        assert_eq!("Poseidon".parse::<BackendKind>(), Ok(BackendKind::Poseidon));
        assert_eq!("sha256".parse::<BackendKind>(), Ok(BackendKind::Digest));
        assert!("md5".parse::<BackendKind>().is_err());
    }
}
