//! # Protocol Configuration & Constants
//!
//! Every fixed parameter of the commitment, binding and verification
//! pipeline lives here. Two parties that disagree on any of these values
//! will compute different commitments or reject each other's artifacts, so
//! treat a change here as a protocol version bump.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Crate-level protocol version, reported by the node.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Version literal of the shared payment-proof artifact. Artifacts carrying
/// any other value are rejected by structural verification.
pub const PAYMENT_PROOF_VERSION: &str = "1.0";

/// `proofType` literal of the shared payment-proof artifact.
pub const PAYMENT_PROOF_TYPE: &str = "payment";

/// File name prefix used when exporting a shared payment proof.
pub const PAYMENT_PROOF_FILE_PREFIX: &str = "payment-proof-";

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Width of every hash and field element rendering, in bytes.
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// Hex digits in a rendered 256-bit value (without the `0x` prefix).
pub const HASH_HEX_DIGITS: usize = HASH_OUTPUT_LENGTH * 2;

/// Value hashed to produce the root of an empty accumulator.
pub const EMPTY_ROOT_SENTINEL: u64 = 0;

/// Poseidon sponge rate. Capacity is fixed at 1.
pub const POSEIDON_RATE: usize = 2;

/// Poseidon S-box exponent.
pub const POSEIDON_ALPHA: u64 = 5;

/// Poseidon full rounds (split evenly before/after the partial rounds).
pub const POSEIDON_FULL_ROUNDS: u64 = 8;

/// Poseidon partial rounds for width 3 over BN254.
pub const POSEIDON_PARTIAL_ROUNDS: u64 = 57;

/// Bit length of the BN254 scalar field modulus.
pub const BN254_FIELD_BITS: u64 = 254;

/// Domain tag prefixed to the canonical string hashed by the digest backend.
pub const DIGEST_BACKEND_TAG: &str = "veripay-field-v1";

// ---------------------------------------------------------------------------
// Payment Proof Policy
// ---------------------------------------------------------------------------

/// A paid amount is accepted when it is within this distance of the
/// required amount.
pub const AMOUNT_TOLERANCE: f64 = 1e-4;

/// Maximum age of a payment, in seconds, for `timestampVerified`.
pub const PAYMENT_FRESHNESS_SECS: i64 = 86_400;

/// Recoverable secp256k1 signature length: r (32) || s (32) || v (1).
pub const SIGNATURE_LENGTH: usize = 65;

/// Payment method advertised in shared proofs.
pub const DEFAULT_PAYMENT_METHOD: &str = "crypto";

/// Keys that must never appear anywhere in a shared payment proof.
pub const SENSITIVE_FIELD_DENYLIST: &[&str] = &[
    "recipient",
    "senderAddress",
    "recipientAddress",
    "amount",
    "txHash",
    "transactionHash",
    "privateKey",
    "secret",
    "signature",
    "toAddress",
    "fromAddress",
];

/// Number of leading characters of a hash quoted in mismatch messages.
pub const HASH_PREFIX_QUOTE_LEN: usize = 10;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Default upper bound on a registry lookup before it is reported unknown.
pub const REGISTRY_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default HTTP API port of the registry node.
pub const DEFAULT_API_PORT: u16 = 8787;

/// Default Prometheus metrics port.
pub const DEFAULT_METRICS_PORT: u16 = 8788;
