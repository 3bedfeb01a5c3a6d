//! # Transcript Proof System
//!
//! A deterministic stand-in for a real circuit prover:
//!
//! ```text
//! pi = sha256( "veripay-transcript-v1" || key || circuit || signals joined by "\n" )
//! ```
//!
//! Verification recomputes `pi` with the same key.
//!
//! **NOT ZERO-KNOWLEDGE AND NOT SOUND.** Anyone holding the key can produce
//! a "proof" for any public signals, and the signals themselves are
//! computed in the clear. Use it to exercise the binding and verification
//! plumbing, never to protect real attributes.

use rand::RngCore;

use super::{circuits, CircuitInputs, Proof, ProofSystem, ProverOutput, VerificationKey};
use crate::binding::ProofType;
use crate::crypto::hash::{hex_eq, sha256, sha256_multi, to_prefixed_hex};
use crate::error::ProtocolResult;

const TRANSCRIPT_DOMAIN: &[u8] = b"veripay-transcript-v1";
const PROTOCOL_NAME: &str = "transcript";

/// Keyed transcript prover/verifier.
pub struct TranscriptProofSystem {
    key: [u8; 32],
    key_id: String,
}

impl TranscriptProofSystem {
    pub fn new(key: [u8; 32]) -> Self {
        let key_id = to_prefixed_hex(&sha256(&key));
        Self { key, key_id }
    }

    /// A system with a fresh random key. Proofs only verify within this
    /// instance.
    pub fn random() -> Self {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Self::new(key)
    }

    fn transcript(&self, circuit: ProofType, signals: &[String]) -> String {
        let joined = signals.join("\n");
        to_prefixed_hex(&sha256_multi(&[
            TRANSCRIPT_DOMAIN,
            &self.key,
            circuit.as_str().as_bytes(),
            joined.as_bytes(),
        ]))
    }
}

impl std::fmt::Debug for TranscriptProofSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptProofSystem")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl ProofSystem for TranscriptProofSystem {
    fn full_prove(&self, inputs: &CircuitInputs) -> ProtocolResult<ProverOutput> {
        let circuit = inputs.proof_type();
        let public_signals = circuits::evaluate(inputs)?;
        let pi = self.transcript(circuit, &public_signals);
        tracing::debug!(%circuit, signals = public_signals.len(), "transcript proof produced");

        Ok(ProverOutput {
            proof: Proof {
                protocol: PROTOCOL_NAME.to_string(),
                circuit,
                pi,
            },
            public_signals,
        })
    }

    fn verification_key(&self, circuit: ProofType) -> VerificationKey {
        VerificationKey {
            circuit,
            key_id: self.key_id.clone(),
        }
    }

    fn verify(&self, vk: &VerificationKey, public_signals: &[String], proof: &Proof) -> bool {
        if proof.protocol != PROTOCOL_NAME || vk.key_id != self.key_id || vk.circuit != proof.circuit
        {
            return false;
        }
        hex_eq(&proof.pi, &self.transcript(proof.circuit, public_signals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::FieldElement;

    fn uniqueness() -> CircuitInputs {
        CircuitInputs::Uniqueness {
            unique_key_hash: "0xfeed".into(),
            root: FieldElement::from_u64(3),
        }
    }

    #[test]
    fn prove_then_verify() {
        let system = TranscriptProofSystem::new([1u8; 32]);
        let out = system.full_prove(&uniqueness()).unwrap();
        let vk = system.verification_key(ProofType::Uniqueness);
        assert!(system.verify(&vk, &out.public_signals, &out.proof));
    }

    #[test]
    fn proving_is_deterministic() {
        let system = TranscriptProofSystem::new([1u8; 32]);
        assert_eq!(
            system.full_prove(&uniqueness()).unwrap(),
            system.full_prove(&uniqueness()).unwrap()
        );
    }

    #[test]
    fn altered_signals_fail() {
        let system = TranscriptProofSystem::new([1u8; 32]);
        let out = system.full_prove(&uniqueness()).unwrap();
        let vk = system.verification_key(ProofType::Uniqueness);
        let mut signals = out.public_signals.clone();
        signals[1] = "0xbeef".into();
        assert!(!system.verify(&vk, &signals, &out.proof));
    }

    #[test]
    fn wrong_key_or_circuit_fails() {
        let system = TranscriptProofSystem::new([1u8; 32]);
        let other = TranscriptProofSystem::new([2u8; 32]);
        let out = system.full_prove(&uniqueness()).unwrap();

        let foreign_vk = other.verification_key(ProofType::Uniqueness);
        assert!(!system.verify(&foreign_vk, &out.public_signals, &out.proof));
        assert!(!other.verify(&foreign_vk, &out.public_signals, &out.proof));

        let age_vk = system.verification_key(ProofType::Age);
        assert!(!system.verify(&age_vk, &out.public_signals, &out.proof));
    }
}
