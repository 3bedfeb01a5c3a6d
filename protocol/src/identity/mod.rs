//! # Identity Module
//!
//! Everything derived from the holder's identity document.
//!
//! 1. **Credential** derives `id_commit`, `unique_key` and the
//!    `unique_key_hash` that is the only value sent off-device.
//! 2. **Registry** records issued `unique_key_hash` values, first write wins.
//! 3. **Accumulator** keeps one leaf per physical document and a root over
//!    all of them, rejecting repeats.
//!
//! All three take the hash backend as an argument. None of them choose one.

pub mod accumulator;
pub mod credential;
pub mod registry;

pub use accumulator::{compute_root, leaf_for_document, AppendOutcome, UniquenessAccumulator};
pub use credential::{
    compute_id_commit, compute_unique_key, compute_unique_key_hash, CredentialAttributes,
    CredentialCommitment,
};
pub use registry::{
    check_with_timeout, validate_unique_key_hash, RegistrationOutcome, RegistrationRecord,
    RegistryStatus, StoreRegistry, UniqueKeyRegistry,
};
