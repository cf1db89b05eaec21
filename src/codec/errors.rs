//! Codec errors

use std::io;

use thiserror::Error;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Encoding, decoding and compression failures
#[derive(Debug, Error)]
pub enum CodecError {
    /// Value cannot be represented by the schema
    #[error("Value at '{path}' does not match schema: expected {expected}, got {actual}")]
    SchemaMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// Data ended in the middle of a record
    #[error("Unexpected end of data at byte {offset}")]
    Truncated { offset: usize },

    /// Data is not a valid encoding for the schema
    #[error("Malformed data at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    #[error("Compression failed: {0}")]
    Compression(#[source] io::Error),

    #[error("Decompression failed: {0}")]
    Decompression(#[source] io::Error),
}

impl CodecError {
    pub(crate) fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        CodecError::SchemaMismatch {
            path: String::new(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Prepends a path segment to a schema mismatch
    pub(crate) fn within(self, segment: &str) -> Self {
        match self {
            CodecError::SchemaMismatch {
                path,
                expected,
                actual,
            } => {
                let path = if path.is_empty() {
                    segment.to_string()
                } else if path.starts_with('[') {
                    format!("{}{}", segment, path)
                } else {
                    format!("{}.{}", segment, path)
                };
                CodecError::SchemaMismatch {
                    path,
                    expected,
                    actual,
                }
            }
            other => other,
        }
    }

    /// Returns true for errors raised by the byte-level decoder
    pub fn is_decode_error(&self) -> bool {
        matches!(self, CodecError::Truncated { .. } | CodecError::Malformed { .. })
    }
}
