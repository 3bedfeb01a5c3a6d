//! Error taxonomy shared by the core modules.
//!
//! Expected business outcomes (a duplicate leaf, a re-registration) are
//! variants here and travel through `Result`. A binding mismatch is never
//! an error value: it is reported inside a verification result.

use thiserror::Error;

use crate::storage::StoreError;

/// Errors returned by core operations.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Malformed hash, missing field or unparsable attribute. Never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The value is already present. State was left unmodified.
    #[error("duplicate {kind}: {value}")]
    Duplicate {
        /// What was duplicated (e.g. "accumulator leaf").
        kind: &'static str,
        /// The rejected value.
        value: String,
    },

    /// Input could not be parsed at all.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// A signature could not be decoded or recovered.
    #[error("signature error: {0}")]
    Signature(String),

    /// The injected store failed.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ProtocolError {
    /// Shorthand for [`ProtocolError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        ProtocolError::Validation(msg.into())
    }

    /// True for the business-rejection variant.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, ProtocolError::Duplicate { .. })
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::Malformed(e.to_string())
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
