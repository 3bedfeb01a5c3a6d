//! # Unique-Key Registry
//!
//! The remote party that records which `unique_key_hash` values have been
//! issued. Registration is first-write-wins: a second registration of the
//! same hash is a conflict that returns the original record unchanged.
//!
//! Lookups cross a network boundary in real deployments, so callers go
//! through [`check_with_timeout`]. A lookup that errors or times out is
//! reported as [`RegistryStatus::Unknown`], never as "not issued".

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::crypto::hash::is_prefixed_hex;
use crate::error::{ProtocolError, ProtocolResult};
use crate::storage::{Store, StoreError, COLLECTION_REGISTRATIONS};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What the registry remembers about one hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRecord {
    pub unique_key_hash: String,
    pub id: Uuid,
    pub issued_at: DateTime<Utc>,
}

/// Result of a registration attempt. A conflict is a business outcome,
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered(RegistrationRecord),
    /// Already registered. Carries the original record.
    Conflict(RegistrationRecord),
}

impl RegistrationOutcome {
    pub fn record(&self) -> &RegistrationRecord {
        match self {
            RegistrationOutcome::Registered(r) | RegistrationOutcome::Conflict(r) => r,
        }
    }
}

/// Answer to "has this hash been issued?".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryStatus {
    Issued(RegistrationRecord),
    NotIssued,
    /// The registry could not be asked. Must not be read as `NotIssued`.
    Unknown { reason: String },
}

/// Check that a hash is `0x` followed by hex digits and normalize its case.
pub fn validate_unique_key_hash(hash: &str) -> ProtocolResult<String> {
    if !is_prefixed_hex(hash) {
        return Err(ProtocolError::validation(format!(
            "unique_key_hash must match ^0x[0-9a-fA-F]+$, got {hash:?}"
        )));
    }
    Ok(hash.to_ascii_lowercase())
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

#[async_trait]
pub trait UniqueKeyRegistry: Send + Sync {
    /// Register a hash. First write wins.
    async fn register(&self, unique_key_hash: &str) -> ProtocolResult<RegistrationOutcome>;

    /// Look up a hash.
    async fn lookup(&self, unique_key_hash: &str) -> ProtocolResult<Option<RegistrationRecord>>;
}

/// Look up `hash`, mapping errors and timeouts to [`RegistryStatus::Unknown`].
pub async fn check_with_timeout(
    registry: &dyn UniqueKeyRegistry,
    hash: &str,
    timeout: Duration,
) -> RegistryStatus {
    match tokio::time::timeout(timeout, registry.lookup(hash)).await {
        Ok(Ok(Some(record))) => RegistryStatus::Issued(record),
        Ok(Ok(None)) => RegistryStatus::NotIssued,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "registry lookup failed");
            RegistryStatus::Unknown {
                reason: e.to_string(),
            }
        }
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "registry lookup timed out");
            RegistryStatus::Unknown {
                reason: format!("lookup timed out after {}ms", timeout.as_millis()),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Store-backed registry
// ---------------------------------------------------------------------------

/// Registry persisting records through a [`Store`].
#[derive(Clone)]
pub struct StoreRegistry {
    store: Arc<dyn Store>,
}

impl StoreRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn decode(raw: &[u8]) -> ProtocolResult<RegistrationRecord> {
        bincode::deserialize(raw).map_err(|e| {
            ProtocolError::Storage(StoreError::Corrupt {
                collection: COLLECTION_REGISTRATIONS.to_string(),
                reason: e.to_string(),
            })
        })
    }
}

#[async_trait]
impl UniqueKeyRegistry for StoreRegistry {
    async fn register(&self, unique_key_hash: &str) -> ProtocolResult<RegistrationOutcome> {
        let key = validate_unique_key_hash(unique_key_hash)?;
        let record = RegistrationRecord {
            unique_key_hash: key.clone(),
            id: Uuid::new_v4(),
            issued_at: Utc::now(),
        };
        let encoded = bincode::serialize(&record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        match self
            .store
            .set_if_absent(COLLECTION_REGISTRATIONS, &key, &encoded)?
        {
            None => {
                tracing::info!(id = %record.id, "unique key registered");
                Ok(RegistrationOutcome::Registered(record))
            }
            Some(existing) => {
                let original = Self::decode(&existing)?;
                tracing::info!(id = %original.id, "unique key already registered");
                Ok(RegistrationOutcome::Conflict(original))
            }
        }
    }

    async fn lookup(&self, unique_key_hash: &str) -> ProtocolResult<Option<RegistrationRecord>> {
        let key = validate_unique_key_hash(unique_key_hash)?;
        self.store
            .get(COLLECTION_REGISTRATIONS, &key)?
            .map(|raw| Self::decode(&raw))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn registry() -> StoreRegistry {
        StoreRegistry::new(Arc::new(MemoryStore::new()))
    }

    struct SlowRegistry;

    #[async_trait]
    impl UniqueKeyRegistry for SlowRegistry {
        async fn register(&self, _: &str) -> ProtocolResult<RegistrationOutcome> {
            unreachable!()
        }

        async fn lookup(&self, _: &str) -> ProtocolResult<Option<RegistrationRecord>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }
    }

    struct BrokenRegistry;

    #[async_trait]
    impl UniqueKeyRegistry for BrokenRegistry {
        async fn register(&self, _: &str) -> ProtocolResult<RegistrationOutcome> {
            unreachable!()
        }

        async fn lookup(&self, _: &str) -> ProtocolResult<Option<RegistrationRecord>> {
            Err(ProtocolError::Malformed("connection reset".into()))
        }
    }

    #[tokio::test]
    async fn second_registration_conflicts_with_original() {
        let registry = registry();
        let first = registry.register("0xabc").await.unwrap();
        let second = registry.register("0xABC").await.unwrap();

        let RegistrationOutcome::Registered(original) = first else {
            panic!("first registration should succeed");
        };
        assert_eq!(second, RegistrationOutcome::Conflict(original));
    }

    #[tokio::test]
    async fn malformed_hash_rejected() {
        let registry = registry();
        assert!(registry.register("abc").await.is_err());
        assert!(registry.register("0x").await.is_err());
        assert!(registry.lookup("0xnothex").await.is_err());
    }

    #[tokio::test]
    async fn check_reports_issued_and_not_issued() {
        let registry = registry();
        registry.register("0xfeed").await.unwrap();

        let status = check_with_timeout(&registry, "0xfeed", Duration::from_secs(1)).await;
        assert!(matches!(status, RegistryStatus::Issued(_)));

        let status = check_with_timeout(&registry, "0xbeef", Duration::from_secs(1)).await;
        assert_eq!(status, RegistryStatus::NotIssued);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_unknown_not_unregistered() {
        let status = check_with_timeout(&SlowRegistry, "0x01", Duration::from_secs(5)).await;
        assert!(matches!(status, RegistryStatus::Unknown { .. }));
    }

    #[tokio::test]
    async fn failure_is_unknown() {
        let status = check_with_timeout(&BrokenRegistry, "0x01", Duration::from_secs(5)).await;
        assert!(matches!(status, RegistryStatus::Unknown { .. }));
    }
}
