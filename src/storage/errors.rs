//! Storage error types
//!
//! Error codes:
//! - ARCHIVE_CONFIGURATION_ERROR: schema or backend unreachable at construction
//! - ARCHIVE_INTEGRITY_ERROR: stored id does not match the record content
//! - ARCHIVE_DATA_MISMATCH: safe-write read-back differs from what was written
//! - ARCHIVE_EXISTING_RECORD_CONFLICT: a different record already holds the id
//! - ARCHIVE_CODEC_ERROR: record cannot be encoded or stored bytes decoded
//! - ARCHIVE_BACKEND_IO_ERROR: filesystem client failure
//!
//! A missing record is not an error: reads return an empty result.
//! Nothing here is retried; transient backend failures reach the caller.

use thiserror::Error;

use crate::codec::CodecError;
use crate::hdfs::FsError;
use crate::identity::IdentityError;
use crate::schema::SchemaError;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    // Construction
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration error: {0}")]
    Schema(#[from] SchemaError),

    // Identity
    #[error("Integrity error: {0}")]
    Integrity(#[from] IdentityError),

    // Safe write. The record has landed on the backend and is suspect.
    #[error("Data mismatch for record {id}: {reason}")]
    DataMismatch { id: String, reason: String },

    #[error("Record {id} already stored at {path} with different content")]
    ExistingRecordConflict { id: String, path: String },

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Backend error: {0}")]
    Backend(#[from] FsError),
}

impl StorageError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        StorageError::Configuration(reason.into())
    }

    pub fn data_mismatch(id: impl Into<String>, reason: impl Into<String>) -> Self {
        StorageError::DataMismatch {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::Configuration(_) | StorageError::Schema(_) => "ARCHIVE_CONFIGURATION_ERROR",
            StorageError::Integrity(_) => "ARCHIVE_INTEGRITY_ERROR",
            StorageError::DataMismatch { .. } => "ARCHIVE_DATA_MISMATCH",
            StorageError::ExistingRecordConflict { .. } => "ARCHIVE_EXISTING_RECORD_CONFLICT",
            StorageError::Codec(_) => "ARCHIVE_CODEC_ERROR",
            StorageError::Backend(_) => "ARCHIVE_BACKEND_IO_ERROR",
        }
    }

    /// Returns true for errors raised while constructing a storage handle
    pub fn is_configuration(&self) -> bool {
        matches!(self, StorageError::Configuration(_) | StorageError::Schema(_))
    }
}
