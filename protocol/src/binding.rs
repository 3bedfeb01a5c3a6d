//! # Proof Binding
//!
//! Opaque hashes that tie an attribute proof to a payment without revealing
//! either side:
//!
//! ```text
//! binding_hash = sha256( type || publicOutput )
//! payment_hash = sha256( {"internalId":…,"amount":…,"timestamp":…,"proofHash":…} )
//! ```
//!
//! The payment hash input is compact JSON with exactly that key order;
//! `proofHash` is `null` when the payment carries no identity proof.
//! Integral amounts render without a fractional part (`10`, not `10.0`) so
//! the encoding matches what a JavaScript client produces.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crypto::hash::{sha256, sha256_multi, to_prefixed_hex};
use crate::error::{ProtocolError, ProtocolResult};

/// Attribute an identity proof attests to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofType {
    Age,
    Nationality,
    Uniqueness,
}

impl ProofType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofType::Age => "age",
            ProofType::Nationality => "nationality",
            ProofType::Uniqueness => "uniqueness",
        }
    }
}

impl fmt::Display for ProofType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProofType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "age" => Ok(ProofType::Age),
            "nationality" => Ok(ProofType::Nationality),
            "uniqueness" => Ok(ProofType::Uniqueness),
            other => Err(ProtocolError::validation(format!("unknown proof type {other:?}"))),
        }
    }
}

/// An attribute-proof output to be bound to a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofBinding {
    #[serde(rename = "type")]
    pub proof_type: ProofType,
    pub output: String,
}

impl ProofBinding {
    pub fn new(proof_type: ProofType, output: impl Into<String>) -> Self {
        Self {
            proof_type,
            output: output.into(),
        }
    }
}

/// `0x` + sha256(type || output).
pub fn binding_hash(binding: &ProofBinding) -> String {
    to_prefixed_hex(&sha256_multi(&[
        binding.proof_type.as_str().as_bytes(),
        binding.output.as_bytes(),
    ]))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentHashInput<'a> {
    internal_id: &'a str,
    amount: serde_json::Number,
    timestamp: i64,
    proof_hash: Option<&'a str>,
}

/// `0x` + sha256 of the canonical JSON of the payment's private fields.
///
/// # Errors
///
/// [`ProtocolError::Validation`] for a non-finite amount.
pub fn payment_hash(
    internal_id: &str,
    amount: f64,
    timestamp: i64,
    proof_hash: Option<&str>,
) -> ProtocolResult<String> {
    let input = PaymentHashInput {
        internal_id,
        amount: canonical_amount(amount)?,
        timestamp,
        proof_hash,
    };
    let json = serde_json::to_string(&input)?;
    Ok(to_prefixed_hex(&sha256(json.as_bytes())))
}

fn canonical_amount(amount: f64) -> ProtocolResult<serde_json::Number> {
    if !amount.is_finite() {
        return Err(ProtocolError::validation("amount must be finite"));
    }
    if amount.fract() == 0.0 && amount.abs() < 9.007_199_254_740_992e15 {
        return Ok(serde_json::Number::from(amount as i64));
    }
    serde_json::Number::from_f64(amount)
        .ok_or_else(|| ProtocolError::validation("amount must be finite"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_hash_is_type_then_output() {
        let binding = ProofBinding::new(ProofType::Age, "1");
        assert_eq!(binding_hash(&binding), to_prefixed_hex(&sha256(b"age1")));
    }

    #[test]
    fn binding_hash_distinguishes_types() {
        let age = ProofBinding::new(ProofType::Age, "1");
        let nat = ProofBinding::new(ProofType::Nationality, "1");
        assert_ne!(binding_hash(&age), binding_hash(&nat));
    }

    #[test]
    fn payment_hash_uses_fixed_key_order() {
        let hash = payment_hash("id-1", 10.0, 1_700_000_000, Some("0xabc")).unwrap();
        let expected = sha256(
            br#"{"internalId":"id-1","amount":10,"timestamp":1700000000,"proofHash":"0xabc"}"#,
        );
        assert_eq!(hash, to_prefixed_hex(&expected));
    }

    #[test]
    fn absent_proof_hash_is_null() {
        let hash = payment_hash("id-1", 2.5, 1, None).unwrap();
        let expected =
            sha256(br#"{"internalId":"id-1","amount":2.5,"timestamp":1,"proofHash":null}"#);
        assert_eq!(hash, to_prefixed_hex(&expected));
    }

    #[test]
    fn non_finite_amount_rejected() {
        assert!(payment_hash("id", f64::NAN, 1, None).is_err());
        assert!(payment_hash("id", f64::INFINITY, 1, None).is_err());
    }

    #[test]
    fn proof_type_serde_is_lowercase() {
        let json = serde_json::to_string(&ProofType::Nationality).unwrap();
        assert_eq!(json, "\"nationality\"");
        assert_eq!("uniqueness".parse::<ProofType>().unwrap(), ProofType::Uniqueness);
        assert!("Age".parse::<ProofType>().is_err());
    }
}
