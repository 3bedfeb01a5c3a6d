//! # Payment Module
//!
//! Two ways a payer can evidence a payment:
//!
//! - A **signed record** ([`PaymentRecord`]): the wallet signs the payment
//!   fields and the verifier recovers the signer.
//! - A **privacy-preserving proof** ([`PrivacyPreservingPaymentProof`]):
//!   an opaque hash plus self-asserted flags, safe to hand to a merchant.
//!
//! ```text
//! builder.rs    private record -> shareable proof, flag computation
//! structure.rs  structural and deny-list checks on untrusted JSON
//! record.rs     signed payment records
//! ```

pub mod builder;
pub mod record;
pub mod structure;

pub use builder::{
    check_flags, derive_proof, export_file_name, internal_payment, signature_well_formed,
    to_shareable_json, InternalPaymentData, PaymentProofBuilder, PaymentRequest,
    PrivacyPreservingPaymentProof, PublicMetadata,
};
pub use record::PaymentRecord;
pub use structure::{verify_structure, StructureReport};
