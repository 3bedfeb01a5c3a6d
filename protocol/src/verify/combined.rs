//! # Combined Verification
//!
//! One pass, no retries:
//!
//! 1. **Identity.** Check the attribute proof with the injected
//!    [`ProofSystem`]. Only a valid proof yields a binding hash (carried or
//!    computed from type and output).
//! 2. **Payment.** A signed record must recover to its `from` address; a
//!    self-attested proof must pass structural checks and carry only true
//!    flags. Take the payment's proof hash if it has one.
//! 3. **Binding.** With `requireBinding`, both hashes present must be equal
//!    ignoring case. A mismatch is an error quoting both prefixes. A payment
//!    without a hash is a warning. An invalid identity never matches.
//! 4. `overall = identityValid && paymentValid && (!requireBinding || proofHashMatches)`.
//!
//! Business failures land in the result's `errors`. Only input that cannot
//! be parsed at all is an `Err`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::binding::{binding_hash, ProofType};
use crate::config::HASH_PREFIX_QUOTE_LEN;
use crate::crypto::hash::{hash_prefix, hex_eq};
use crate::error::ProtocolResult;
use crate::payment::{check_flags, verify_structure, PaymentRecord, PrivacyPreservingPaymentProof};
use crate::zkp::{AttributeProof, ProofSystem};

// ---------------------------------------------------------------------------
// Inputs & outputs
// ---------------------------------------------------------------------------

/// The payment side of a combined check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentEvidence {
    SignedRecord { record: PaymentRecord },
    /// Untrusted JSON of a shared payment proof.
    SelfAttested { proof: Value },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOptions {
    #[serde(default = "default_require_binding")]
    pub require_binding: bool,
}

fn default_require_binding() -> bool {
    true
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            require_binding: true,
        }
    }
}

/// Request envelope accepted by [`CombinedVerifier::verify_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedRequest {
    pub identity: AttributeProof,
    pub payment: PaymentEvidence,
    #[serde(default)]
    pub options: VerifyOptions,
}

/// Verdict of one combined check. Built fresh per call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedVerificationResult {
    pub identity_valid: bool,
    pub payment_valid: bool,
    pub proof_hash_matches: bool,
    pub overall: bool,
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct CombinedVerifier {
    proof_system: Arc<dyn ProofSystem>,
}

impl CombinedVerifier {
    pub fn new(proof_system: Arc<dyn ProofSystem>) -> Self {
        Self { proof_system }
    }

    /// Parse a [`CombinedRequest`] and verify it.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Malformed`](crate::error::ProtocolError::Malformed)
    /// when `value` is not a valid request envelope.
    pub fn verify_json(&self, value: Value) -> ProtocolResult<CombinedVerificationResult> {
        let request: CombinedRequest = serde_json::from_value(value)?;
        Ok(self.verify(&request.identity, &request.payment, request.options))
    }

    pub fn verify(
        &self,
        identity: &AttributeProof,
        payment: &PaymentEvidence,
        options: VerifyOptions,
    ) -> CombinedVerificationResult {
        let mut result = CombinedVerificationResult::default();

        let identity_hash = self.check_identity(identity, &mut result);
        let payment_hash = check_payment(payment, &mut result);

        result.proof_hash_matches = match (identity_hash.as_deref(), payment_hash.as_deref()) {
            (Some(id), Some(pay)) => {
                let matches = hex_eq(id, pay);
                if !matches {
                    let message = format!(
                        "proof hash mismatch: identity {}… vs payment {}…",
                        hash_prefix(id, HASH_PREFIX_QUOTE_LEN),
                        hash_prefix(pay, HASH_PREFIX_QUOTE_LEN)
                    );
                    if options.require_binding {
                        result.errors.push(message);
                    } else {
                        result.warnings.push(message);
                    }
                }
                matches
            }
            (Some(_), None) => {
                if options.require_binding {
                    result
                        .warnings
                        .push("payment carries no proof hash; binding not checked".into());
                }
                true
            }
            // Identity failed, so there is nothing trustworthy to bind to.
            (None, _) => false,
        };

        result.overall = result.identity_valid
            && result.payment_valid
            && (!options.require_binding || result.proof_hash_matches);

        tracing::info!(
            identity_valid = result.identity_valid,
            payment_valid = result.payment_valid,
            proof_hash_matches = result.proof_hash_matches,
            overall = result.overall,
            errors = result.errors.len(),
            "combined verification"
        );
        result
    }

    /// Sets `identity_valid` and returns the binding hash of a valid proof.
    fn check_identity(
        &self,
        identity: &AttributeProof,
        result: &mut CombinedVerificationResult,
    ) -> Option<String> {
        let mut valid = true;

        if identity.proof.circuit != identity.proof_type {
            valid = false;
            result.errors.push(format!(
                "identity proof is for the {} circuit, claimed {}",
                identity.proof.circuit, identity.proof_type
            ));
        }
        if identity.public_signals.last() != Some(&identity.public_output) {
            valid = false;
            result
                .errors
                .push("identity public output does not match its public signals".into());
        }

        let vk = self.proof_system.verification_key(identity.proof_type);
        if !self
            .proof_system
            .verify(&vk, &identity.public_signals, &identity.proof)
        {
            valid = false;
            result.errors.push("identity proof failed verification".into());
        }

        if matches!(identity.proof_type, ProofType::Age | ProofType::Nationality)
            && identity.public_output == "0"
        {
            valid = false;
            result
                .errors
                .push(format!("{} statement is not satisfied", identity.proof_type));
        }

        let computed = binding_hash(&identity.binding());
        if let Some(carried) = &identity.binding_hash {
            if !hex_eq(carried, &computed) {
                valid = false;
                result
                    .errors
                    .push("identity binding hash does not match its public output".into());
            }
        }

        result.identity_valid = valid;
        valid.then(|| identity.effective_binding_hash())
    }
}

fn check_payment(
    payment: &PaymentEvidence,
    result: &mut CombinedVerificationResult,
) -> Option<String> {
    match payment {
        PaymentEvidence::SignedRecord { record } => {
            match record.verify_signature() {
                Ok(true) => result.payment_valid = true,
                Ok(false) => result
                    .errors
                    .push("payment signature was not produced by the sender".into()),
                Err(e) => result.errors.push(format!("payment signature invalid: {e}")),
            }
            record.proof_hash.clone()
        }
        PaymentEvidence::SelfAttested { proof } => {
            let report = verify_structure(proof);
            if !report.valid {
                result.errors.extend(report.errors);
            } else {
                match serde_json::from_value::<PrivacyPreservingPaymentProof>(proof.clone()) {
                    Ok(parsed) => {
                        let flag_errors = check_flags(&parsed);
                        result.payment_valid = flag_errors.is_empty();
                        result.errors.extend(flag_errors);
                    }
                    Err(e) => result.errors.push(format!("payment proof unreadable: {e}")),
                }
            }
            proof
                .get("zkProofHash")
                .and_then(Value::as_str)
                .map(str::to_string)
        }
    }
}
