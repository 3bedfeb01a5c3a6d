//! # LocalVault
//!
//! Typed, append-only collections for everything a holder keeps on device:
//!
//! | Collection          | Type                              |
//! |---------------------|-----------------------------------|
//! | `credentials`       | [`StoredCredential`]              |
//! | `attribute_proofs`  | [`AttributeProof`]                |
//! | `payment_records`   | [`InternalPaymentData`]           |
//! | `payment_proofs`    | [`PrivacyPreservingPaymentProof`] |
//!
//! Accumulator leaves and root live in their own collections and are
//! managed by the accumulator itself. Entries are JSON so a vault can be
//! inspected with ordinary tooling.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;

use super::{
    Store, StoreError, StoreResult, COLLECTION_CREDENTIALS, COLLECTION_PAYMENT_PROOFS,
    COLLECTION_PAYMENT_RECORDS, COLLECTION_PROOFS,
};
use crate::identity::CredentialCommitment;
use crate::payment::{InternalPaymentData, PrivacyPreservingPaymentProof};
use crate::zkp::AttributeProof;

/// A derived commitment plus when it was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredential {
    pub commitment: CredentialCommitment,
    pub created_at: DateTime<Utc>,
}

/// Typed view over a [`Store`].
#[derive(Clone)]
pub struct LocalVault {
    store: Arc<dyn Store>,
}

impl LocalVault {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The underlying store, for components that manage their own
    /// collections.
    pub fn store(&self) -> Arc<dyn Store> {
        self.store.clone()
    }

    fn push<T: Serialize>(&self, collection: &str, item: &T) -> StoreResult<u64> {
        let bytes =
            serde_json::to_vec(item).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.append(collection, &bytes)
    }

    fn all<T: DeserializeOwned>(&self, collection: &str) -> StoreResult<Vec<T>> {
        self.store
            .list(collection)?
            .iter()
            .map(|raw| {
                serde_json::from_slice(raw).map_err(|e| StoreError::Corrupt {
                    collection: collection.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    // -- credentials --------------------------------------------------------

    pub fn put_credential(&self, commitment: &CredentialCommitment) -> StoreResult<StoredCredential> {
        let stored = StoredCredential {
            commitment: commitment.clone(),
            created_at: Utc::now(),
        };
        self.push(COLLECTION_CREDENTIALS, &stored)?;
        Ok(stored)
    }

    pub fn credentials(&self) -> StoreResult<Vec<StoredCredential>> {
        self.all(COLLECTION_CREDENTIALS)
    }

    // -- attribute proofs ---------------------------------------------------

    pub fn put_attribute_proof(&self, proof: &AttributeProof) -> StoreResult<u64> {
        self.push(COLLECTION_PROOFS, proof)
    }

    pub fn attribute_proofs(&self) -> StoreResult<Vec<AttributeProof>> {
        self.all(COLLECTION_PROOFS)
    }

    // -- payments -----------------------------------------------------------

    pub fn put_payment_record(&self, data: &InternalPaymentData) -> StoreResult<u64> {
        self.push(COLLECTION_PAYMENT_RECORDS, data)
    }

    pub fn payment_records(&self) -> StoreResult<Vec<InternalPaymentData>> {
        self.all(COLLECTION_PAYMENT_RECORDS)
    }

    pub fn put_payment_proof(&self, proof: &PrivacyPreservingPaymentProof) -> StoreResult<u64> {
        self.push(COLLECTION_PAYMENT_PROOFS, proof)
    }

    pub fn payment_proofs(&self) -> StoreResult<Vec<PrivacyPreservingPaymentProof>> {
        self.all(COLLECTION_PAYMENT_PROOFS)
    }
}
