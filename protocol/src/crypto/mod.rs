//! # Cryptographic Primitives
//!
//! - **field**: 256-bit values fed to the hash backends.
//! - **backend**: the [`HashBackend`] strategy (Poseidon or SHA-256 digest),
//!   selected once per process.
//! - **hash**: byte digests and hex helpers.
//! - **evm**: secp256k1 personal-message signatures and address recovery.
//!
//! Nothing here is hand-rolled. Poseidon comes from arkworks, ECDSA from
//! libsecp256k1, the digests from RustCrypto and BLAKE3.

pub mod backend;
pub mod evm;
pub mod field;
pub mod hash;

pub use backend::{
    select_backend, BackendDegraded, BackendKind, DigestBackend, HashBackend, PoseidonBackend,
    SharedBackend,
};
pub use evm::{personal_message_hash, recover_address, EvmKeypair};
pub use field::FieldElement;
pub use hash::{blake3_hash, keccak256, sha256, to_prefixed_hex};
