//! # Storage Module
//!
//! Every component that persists state receives a [`Store`] handle instead
//! of reaching for a global. Two implementations ship with the crate:
//!
//! ```text
//! db.rs      SledStore: one sled tree per collection, on disk
//! memory.rs  MemoryStore: BTreeMaps behind a RwLock, for tests and tooling
//! vault.rs   LocalVault: typed collections on top of any Store
//! ```
//!
//! A collection is used either as a keyed map (`get`/`set`) or as an
//! append-only log (`append`/`list`), never both. Log entries keep their
//! insertion order.

pub mod db;
pub mod memory;
pub mod vault;

pub use db::SledStore;
pub use memory::MemoryStore;
pub use vault::{LocalVault, StoredCredential};

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// Credential commitments derived on this device.
pub const COLLECTION_CREDENTIALS: &str = "credentials";
/// Accumulator leaves, append-only, in insertion order.
pub const COLLECTION_LEAVES: &str = "accumulator_leaves";
/// Accumulator root and the backend that produced it.
pub const COLLECTION_ACCUMULATOR: &str = "accumulator_meta";
/// Attribute proofs with their binding hashes.
pub const COLLECTION_PROOFS: &str = "attribute_proofs";
/// Private payment records. Never shared.
pub const COLLECTION_PAYMENT_RECORDS: &str = "payment_records";
/// Privacy-filtered payment proofs.
pub const COLLECTION_PAYMENT_PROOFS: &str = "payment_proofs";
/// Registry entries keyed by unique key hash.
pub const COLLECTION_REGISTRATIONS: &str = "registrations";

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors raised by a [`Store`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt entry in {collection}: {reason}")]
    Corrupt {
        collection: String,
        reason: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// Injected key/blob persistence.
pub trait Store: Send + Sync {
    /// Read a keyed value.
    fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Write a keyed value, replacing any previous one.
    fn set(&self, collection: &str, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Append to a log collection. Returns the position of the new entry.
    fn append(&self, collection: &str, value: &[u8]) -> StoreResult<u64>;

    /// All entries of a log collection in insertion order.
    fn list(&self, collection: &str) -> StoreResult<Vec<Vec<u8>>>;

    /// Write a keyed value only if the key is absent. Returns the existing
    /// value when there is one, leaving it untouched.
    fn set_if_absent(
        &self,
        collection: &str,
        key: &str,
        value: &[u8],
    ) -> StoreResult<Option<Vec<u8>>>;
}
