//! Identity errors

use thiserror::Error;

/// Result type for fingerprint operations
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Fingerprint assignment and integrity failures
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Stored id does not match the content hash
    #[error("Invalid data hash: stored id '{stored}', computed '{computed}'")]
    Mismatch { stored: String, computed: String },

    /// Record carries no id
    #[error("Record has no id")]
    MissingId,

    /// Id is present but is not a fingerprint
    #[error("Malformed record id: {0}")]
    MalformedId(String),

    #[error("Cannot render canonical record text: {0}")]
    Canonical(#[source] serde_json::Error),
}
