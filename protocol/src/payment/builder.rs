//! # Payment Proof Builder
//!
//! Splits a payment into two artifacts:
//!
//! - [`InternalPaymentData`]: everything about the payment, kept on device.
//! - [`PrivacyPreservingPaymentProof`]: what a merchant receives. It carries
//!   an opaque `zkPaymentHash` over the private fields, the identity proof's
//!   binding hash, three verification flags and public metadata. Recipient,
//!   amount, timestamp, signature and transaction hash never appear in it.
//!
//! ## Flag semantics
//!
//! ```text
//! amountVerified     no required amount, or |amount - required| < 1e-4
//! timestampVerified  0 <= now - timestamp <= 86400
//! signatureVerified  signature is 0x + 130 hex digits
//! ```
//!
//! The flags are computed by the payer and asserted, not proven. A dishonest
//! payer can set all three to `true`; a verifier can only check that they
//! are present and true.

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::binding::{payment_hash, ProofType};
use crate::config::{
    AMOUNT_TOLERANCE, DEFAULT_PAYMENT_METHOD, PAYMENT_FRESHNESS_SECS, PAYMENT_PROOF_FILE_PREFIX,
    PAYMENT_PROOF_TYPE, PAYMENT_PROOF_VERSION, SIGNATURE_LENGTH,
};
use crate::crypto::hash::{blake3_hash, is_prefixed_hex, to_prefixed_hex};
use crate::error::{ProtocolError, ProtocolResult};
use crate::storage::LocalVault;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What the payer asks for.
#[derive(Clone)]
pub struct PaymentRequest {
    pub recipient: String,
    pub amount: f64,
    pub proof_type: Option<ProofType>,
    /// Binding hash of the identity proof attached to this payment.
    pub proof_hash: Option<String>,
}

impl fmt::Debug for PaymentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentRequest")
            .field("recipient", &"<redacted>")
            .field("amount", &"<redacted>")
            .field("proof_type", &self.proof_type)
            .field("proof_hash", &self.proof_hash)
            .finish()
    }
}

/// Full payment record. Local only.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalPaymentData {
    pub internal_id: String,
    pub recipient: String,
    pub amount: f64,
    /// Unix seconds.
    pub timestamp: i64,
    pub proof_type: Option<ProofType>,
    pub proof_hash: Option<String>,
    pub tx_hash: String,
    pub signature: String,
}

impl fmt::Debug for InternalPaymentData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalPaymentData")
            .field("internal_id", &self.internal_id)
            .field("recipient", &"<redacted>")
            .field("amount", &"<redacted>")
            .field("timestamp", &self.timestamp)
            .field("proof_type", &self.proof_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicMetadata {
    pub required_amount: Option<f64>,
    pub payment_method: String,
}

/// The shareable artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyPreservingPaymentProof {
    pub version: String,
    pub proof_type: String,
    pub zk_payment_hash: String,
    pub zk_proof_hash: Option<String>,
    pub amount_verified: bool,
    pub signature_verified: bool,
    pub timestamp_verified: bool,
    pub public_metadata: PublicMetadata,
}

// ---------------------------------------------------------------------------
// Pure derivations
// ---------------------------------------------------------------------------

/// Build the private record for `request` at time `now`.
pub fn internal_payment(
    request: &PaymentRequest,
    now: DateTime<Utc>,
) -> ProtocolResult<InternalPaymentData> {
    if request.recipient.trim().is_empty() {
        return Err(ProtocolError::validation("recipient is empty"));
    }
    if !request.amount.is_finite() || request.amount <= 0.0 {
        return Err(ProtocolError::validation(format!(
            "amount must be a positive number, got {}",
            request.amount
        )));
    }
    if let Some(hash) = &request.proof_hash {
        if !is_prefixed_hex(hash) {
            return Err(ProtocolError::validation("proof hash must be 0x-prefixed hex"));
        }
    }

    let internal_id = Uuid::new_v4().to_string();
    let timestamp = now.timestamp();
    let tx_hash = to_prefixed_hex(&blake3_hash(
        format!(
            "{internal_id}|{}|{}|{timestamp}",
            request.recipient, request.amount
        )
        .as_bytes(),
    ));

    let mut signature = [0u8; SIGNATURE_LENGTH];
    rand::thread_rng().fill_bytes(&mut signature[..64]);
    signature[64] = 27;

    Ok(InternalPaymentData {
        internal_id,
        recipient: request.recipient.clone(),
        amount: request.amount,
        timestamp,
        proof_type: request.proof_type,
        proof_hash: request.proof_hash.clone(),
        tx_hash,
        signature: to_prefixed_hex(&signature),
    })
}

/// True when `signature` is `0x` + 130 hex digits.
pub fn signature_well_formed(signature: &str) -> bool {
    is_prefixed_hex(signature) && signature.len() == 2 + SIGNATURE_LENGTH * 2
}

/// Derive the shareable proof from a private record, evaluated at `now`.
pub fn derive_proof(
    data: &InternalPaymentData,
    required_amount: Option<f64>,
    now: DateTime<Utc>,
) -> ProtocolResult<PrivacyPreservingPaymentProof> {
    let zk_payment_hash = payment_hash(
        &data.internal_id,
        data.amount,
        data.timestamp,
        data.proof_hash.as_deref(),
    )?;

    let amount_verified = match required_amount {
        None => true,
        Some(required) => (data.amount - required).abs() < AMOUNT_TOLERANCE,
    };
    let age = now.timestamp() - data.timestamp;
    let timestamp_verified = (0..=PAYMENT_FRESHNESS_SECS).contains(&age);

    Ok(PrivacyPreservingPaymentProof {
        version: PAYMENT_PROOF_VERSION.to_string(),
        proof_type: PAYMENT_PROOF_TYPE.to_string(),
        zk_payment_hash,
        zk_proof_hash: data.proof_hash.clone(),
        amount_verified,
        signature_verified: signature_well_formed(&data.signature),
        timestamp_verified,
        public_metadata: PublicMetadata {
            required_amount,
            payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
        },
    })
}

/// One error per flag that is not `true`.
pub fn check_flags(proof: &PrivacyPreservingPaymentProof) -> Vec<String> {
    [
        ("amountVerified", proof.amount_verified),
        ("signatureVerified", proof.signature_verified),
        ("timestampVerified", proof.timestamp_verified),
    ]
    .into_iter()
    .filter(|(_, ok)| !ok)
    .map(|(name, _)| format!("payment proof flag {name} is false"))
    .collect()
}

/// `payment-proof-<unix-millis>.json`.
pub fn export_file_name(exported_at: DateTime<Utc>) -> String {
    format!(
        "{PAYMENT_PROOF_FILE_PREFIX}{}.json",
        exported_at.timestamp_millis()
    )
}

/// Pretty-printed JSON of the artifact.
pub fn to_shareable_json(proof: &PrivacyPreservingPaymentProof) -> ProtocolResult<String> {
    Ok(serde_json::to_string_pretty(proof)?)
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Creates payments and their shareable proofs, persisting both through the
/// vault.
#[derive(Clone)]
pub struct PaymentProofBuilder {
    vault: LocalVault,
}

impl PaymentProofBuilder {
    pub fn new(vault: LocalVault) -> Self {
        Self { vault }
    }

    /// Create and store the private record.
    pub fn create_payment(&self, request: &PaymentRequest) -> ProtocolResult<InternalPaymentData> {
        let data = internal_payment(request, Utc::now())?;
        self.vault.put_payment_record(&data)?;
        tracing::info!(internal_id = %data.internal_id, "payment record created");
        Ok(data)
    }

    /// Derive and store the shareable proof.
    pub fn build_proof(
        &self,
        data: &InternalPaymentData,
        required_amount: Option<f64>,
    ) -> ProtocolResult<PrivacyPreservingPaymentProof> {
        let proof = derive_proof(data, required_amount, Utc::now())?;
        self.vault.put_payment_proof(&proof)?;
        tracing::info!(
            amount_verified = proof.amount_verified,
            signature_verified = proof.signature_verified,
            timestamp_verified = proof.timestamp_verified,
            "payment proof built"
        );
        Ok(proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn request() -> PaymentRequest {
        PaymentRequest {
            recipient: "0x2222222222222222222222222222222222222222".into(),
            amount: 10.0,
            proof_type: Some(ProofType::Age),
            proof_hash: Some(format!("0x{}", "ab".repeat(32))),
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn internal_record_shape() {
        let data = internal_payment(&request(), at(1_700_000_000)).unwrap();
        assert_eq!(data.timestamp, 1_700_000_000);
        assert!(signature_well_formed(&data.signature));
        assert!(data.tx_hash.starts_with("0x"));
        assert!(Uuid::parse_str(&data.internal_id).is_ok());
    }

    #[test]
    fn internal_ids_are_fresh() {
        let a = internal_payment(&request(), at(1)).unwrap();
        let b = internal_payment(&request(), at(1)).unwrap();
        assert_ne!(a.internal_id, b.internal_id);
    }

    #[test]
    fn invalid_requests_rejected() {
        let mut bad = request();
        bad.amount = -1.0;
        assert!(internal_payment(&bad, at(1)).is_err());

        let mut bad = request();
        bad.recipient = String::new();
        assert!(internal_payment(&bad, at(1)).is_err());

        let mut bad = request();
        bad.proof_hash = Some("abc".into());
        assert!(internal_payment(&bad, at(1)).is_err());
    }

    #[test]
    fn amount_tolerance() {
        let data = internal_payment(&request(), at(1000)).unwrap();
        assert!(derive_proof(&data, None, at(1000)).unwrap().amount_verified);
        assert!(derive_proof(&data, Some(10.00005), at(1000)).unwrap().amount_verified);
        assert!(!derive_proof(&data, Some(10.001), at(1000)).unwrap().amount_verified);
    }

    #[test]
    fn freshness_window() {
        let data = internal_payment(&request(), at(1_000_000)).unwrap();
        let fresh = |now: DateTime<Utc>| derive_proof(&data, None, now).unwrap().timestamp_verified;

        assert!(fresh(at(1_000_000)));
        assert!(fresh(at(1_000_000) + Duration::seconds(86_400)));
        assert!(!fresh(at(1_000_000) + Duration::seconds(86_401)));
        assert!(!fresh(at(999_999)));
    }

    #[test]
    fn shared_proof_has_no_private_fields() {
        let data = internal_payment(&request(), at(1000)).unwrap();
        let proof = derive_proof(&data, Some(10.0), at(1000)).unwrap();
        let json = to_shareable_json(&proof).unwrap();

        assert!(!json.contains(&data.recipient));
        assert!(!json.contains(&data.signature));
        assert!(!json.contains(&data.tx_hash));
        assert!(!json.contains(&data.internal_id));
        assert_eq!(proof.zk_proof_hash, data.proof_hash);
        assert_eq!(
            proof.zk_payment_hash,
            payment_hash(&data.internal_id, 10.0, 1000, data.proof_hash.as_deref()).unwrap()
        );
    }

    #[test]
    fn check_flags_lists_failures() {
        let data = internal_payment(&request(), at(1000)).unwrap();
        let mut proof = derive_proof(&data, None, at(1000)).unwrap();
        assert!(check_flags(&proof).is_empty());

        proof.amount_verified = false;
        proof.timestamp_verified = false;
        let errors = check_flags(&proof);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("amountVerified"));
    }

    #[test]
    fn file_name_uses_millis() {
        let name = export_file_name(Utc.timestamp_millis_opt(1_700_000_000_123).unwrap());
        assert_eq!(name, "payment-proof-1700000000123.json");
    }

    #[test]
    fn debug_redacts_private_fields() {
        let data = internal_payment(&request(), at(1)).unwrap();
        let rendered = format!("{data:?}");
        assert!(!rendered.contains(&data.recipient));
        assert!(!rendered.contains(&data.signature));
    }

    #[test]
    fn request_debug_redacts_recipient_and_amount() {
        let mut req = request();
        req.amount = 1234.5;
        let rendered = format!("{req:?}");
        assert!(!rendered.contains(&req.recipient));
        assert!(!rendered.contains("1234.5"));
        assert!(rendered.contains("<redacted>"));
    }
}
