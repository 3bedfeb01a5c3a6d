//! Signed payment records.
//!
//! The payer's wallet signs a fixed-order, pipe-joined rendering of the
//! payment with the EIP-191 personal-message scheme:
//!
//! ```text
//! paymentId|from|to|amount|token|timestamp|proofHash
//! ```
//!
//! Addresses are lower-cased and an absent `proofHash` renders as the empty
//! string. A verifier recovers the signer and compares it with `from`.

use serde::{Deserialize, Serialize};

use crate::crypto::evm::{recover_address, EvmKeypair};
use crate::crypto::hash::hex_eq;
use crate::error::{ProtocolError, ProtocolResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub payment_id: String,
    pub from: String,
    pub to: String,
    /// Decimal string in token units.
    pub amount: String,
    pub token: String,
    /// Unix seconds.
    pub timestamp: i64,
    #[serde(default)]
    pub proof_hash: Option<String>,
    #[serde(default)]
    pub signature: String,
}

impl PaymentRecord {
    /// The exact bytes the wallet signs.
    pub fn canonical_message(&self) -> String {
        let from = self.from.to_lowercase();
        let to = self.to.to_lowercase();
        let timestamp = self.timestamp.to_string();
        [
            self.payment_id.as_str(),
            from.as_str(),
            to.as_str(),
            self.amount.as_str(),
            self.token.as_str(),
            timestamp.as_str(),
            self.proof_hash.as_deref().unwrap_or(""),
        ]
        .join("|")
    }

    /// Sign with `keypair`, which also becomes the `from` address.
    pub fn sign(&mut self, keypair: &EvmKeypair) {
        self.from = keypair.address().to_string();
        self.signature = keypair.sign_personal(self.canonical_message().as_bytes());
    }

    /// Recover the signer.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Signature`] when the signature is malformed or
    /// recovery fails.
    pub fn recover_signer(&self) -> ProtocolResult<String> {
        if self.signature.is_empty() {
            return Err(ProtocolError::Signature("payment record is unsigned".into()));
        }
        recover_address(self.canonical_message().as_bytes(), &self.signature)
    }

    /// True when the recovered signer equals `from`, ignoring case.
    pub fn verify_signature(&self) -> ProtocolResult<bool> {
        Ok(hex_eq(&self.recover_signer()?, &self.from))
    }
}
