//! # Verification
//!
//! Composes identity validity, payment validity and binding-hash equality
//! into a single verdict.

pub mod combined;

pub use combined::{
    CombinedRequest, CombinedVerificationResult, CombinedVerifier, PaymentEvidence, VerifyOptions,
};
