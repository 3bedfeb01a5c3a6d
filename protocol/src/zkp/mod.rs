//! # Attribute Proofs
//!
//! The zero-knowledge prover is an external collaborator. This module pins
//! down the shape of that collaboration:
//!
//! ```text
//! circuits.rs     public-signal evaluation for the age, nationality and
//!                 uniqueness statements
//! transcript.rs   TranscriptProofSystem: deterministic, keyed, NOT
//!                 zero-knowledge; for development and tests
//! ```
//!
//! A [`ProofSystem`] mirrors the `fullProve` / `verify` pair of a circuit
//! toolchain. Its output becomes an [`AttributeProof`], whose last public
//! signal is the statement's output and whose binding hash ties it to a
//! payment.

pub mod circuits;
pub mod transcript;

use serde::{Deserialize, Serialize};

use crate::binding::{binding_hash, ProofBinding, ProofType};
use crate::error::{ProtocolError, ProtocolResult};

pub use circuits::{age_in_years, evaluate, CircuitInputs};
pub use transcript::TranscriptProofSystem;

// ---------------------------------------------------------------------------
// Prover interface
// ---------------------------------------------------------------------------

/// Opaque proof produced by a [`ProofSystem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Proving scheme identifier (e.g. `"transcript"`, `"groth16"`).
    pub protocol: String,
    pub circuit: ProofType,
    /// Scheme-specific proof encoding.
    pub pi: String,
}

/// `fullProve` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProverOutput {
    pub proof: Proof,
    pub public_signals: Vec<String>,
}

/// Identifies the key a verifier checks proofs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationKey {
    pub circuit: ProofType,
    pub key_id: String,
}

/// The external prover/verifier capability.
pub trait ProofSystem: Send + Sync {
    /// Generate a proof for the statement described by `inputs`.
    fn full_prove(&self, inputs: &CircuitInputs) -> ProtocolResult<ProverOutput>;

    /// Key for verifying proofs of `circuit`.
    fn verification_key(&self, circuit: ProofType) -> VerificationKey;

    /// Check `proof` against `public_signals`. Never panics; any malformed
    /// input simply fails verification.
    fn verify(&self, vk: &VerificationKey, public_signals: &[String], proof: &Proof) -> bool;
}

// ---------------------------------------------------------------------------
// AttributeProof
// ---------------------------------------------------------------------------

/// A proof as kept on device and presented to a verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeProof {
    pub proof_type: ProofType,
    pub public_output: String,
    pub proof: Proof,
    pub public_signals: Vec<String>,
    #[serde(default)]
    pub binding_hash: Option<String>,
}

impl AttributeProof {
    /// Wrap prover output. The statement output is the last public signal.
    pub fn from_prover_output(output: ProverOutput) -> ProtocolResult<Self> {
        let public_output = output
            .public_signals
            .last()
            .cloned()
            .ok_or_else(|| ProtocolError::validation("prover returned no public signals"))?;
        let proof_type = output.proof.circuit;
        let binding_hash = binding_hash(&ProofBinding::new(proof_type, public_output.clone()));

        Ok(Self {
            proof_type,
            public_output,
            proof: output.proof,
            public_signals: output.public_signals,
            binding_hash: Some(binding_hash),
        })
    }

    pub fn binding(&self) -> ProofBinding {
        ProofBinding::new(self.proof_type, self.public_output.clone())
    }

    /// The carried binding hash, or one computed from type and output.
    pub fn effective_binding_hash(&self) -> String {
        self.binding_hash
            .clone()
            .unwrap_or_else(|| binding_hash(&self.binding()))
    }

    /// Prove with `system` and wrap the result.
    pub fn generate(system: &dyn ProofSystem, inputs: &CircuitInputs) -> ProtocolResult<Self> {
        let output = system.full_prove(inputs)?;
        let proof = Self::from_prover_output(output)?;
        tracing::info!(proof_type = %proof.proof_type, "attribute proof generated");
        Ok(proof)
    }
}
