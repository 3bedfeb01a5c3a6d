// Copyright (c) 2026 VeriPay Contributors. MIT License.
// See LICENSE for details.

//! # VeriPay Protocol: Core Library
//!
//! Lets a credential holder turn an identity document and a wallet address
//! into a commitment that can be registered once without revealing the
//! document, prove attributes (age, nationality, uniqueness) against it, and
//! bind such a proof to a payment so a merchant learns "this payment came
//! from someone holding a valid proof" and nothing else.
//!
//! ## Architecture
//!
//! - **crypto**: field elements, the hash backend strategy, digests, EVM
//!   signatures.
//! - **identity**: credential commitments, the unique-key registry, the
//!   uniqueness accumulator.
//! - **binding**: binding hashes for proof outputs and payment fields.
//! - **zkp**: the prover interface and a transcript implementation.
//! - **payment**: signed records, shareable payment proofs, structural checks.
//! - **verify**: the combined identity + payment + binding verdict.
//! - **storage**: the injected `Store` capability and the local vault.
//! - **config**: protocol constants.
//!
//! ## Data flow
//!
//! ```text
//! attributes ─► CredentialCommitment ─► unique_key_hash ─► registry
//!                      │
//!                      └─► ProofSystem ─► AttributeProof ─► binding hash
//!                                                             │
//!                        PaymentProofBuilder / PaymentRecord ◄┘
//!                                      │
//!                                      ▼
//!                               CombinedVerifier
//! ```
//!
//! The hash backend is chosen once with [`crypto::select_backend`] and
//! passed to every component that needs it.

pub mod binding;
pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod payment;
pub mod storage;
pub mod verify;
pub mod zkp;

pub use error::{ProtocolError, ProtocolResult};
