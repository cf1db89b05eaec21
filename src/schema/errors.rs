//! Schema error types
//!
//! Error codes:
//! - ARCHIVE_SCHEMA_MALFORMED
//! - ARCHIVE_SCHEMA_UNKNOWN_TYPE
//! - ARCHIVE_SCHEMA_RECURSIVE
//! - ARCHIVE_SCHEMA_ROOT_INVALID
//!
//! All schema errors surface while a storage handle is being configured;
//! none of them is retried.

use std::fmt;

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Schema text is not valid JSON or not a valid schema document
    ArchiveSchemaMalformed,
    /// Reference to a named type that was never defined
    ArchiveSchemaUnknownType,
    /// Named type refers to itself
    ArchiveSchemaRecursive,
    /// Root schema is not a record with `id` and `status` fields
    ArchiveSchemaRootInvalid,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::ArchiveSchemaMalformed => "ARCHIVE_SCHEMA_MALFORMED",
            SchemaErrorCode::ArchiveSchemaUnknownType => "ARCHIVE_SCHEMA_UNKNOWN_TYPE",
            SchemaErrorCode::ArchiveSchemaRecursive => "ARCHIVE_SCHEMA_RECURSIVE",
            SchemaErrorCode::ArchiveSchemaRootInvalid => "ARCHIVE_SCHEMA_ROOT_INVALID",
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error with the location of the offending schema document
#[derive(Debug)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    location: Option<String>,
}

impl SchemaError {
    /// Schema text or structure is invalid
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::ArchiveSchemaMalformed,
            message: reason.into(),
            location: None,
        }
    }

    /// Named type reference cannot be resolved
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::ArchiveSchemaUnknownType,
            message: format!("Unknown type '{}'", name.into()),
            location: None,
        }
    }

    /// Named type is used inside its own definition
    pub fn recursive(name: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::ArchiveSchemaRecursive,
            message: format!("Recursive type '{}' is not supported", name.into()),
            location: None,
        }
    }

    /// Root schema cannot describe archive records
    pub fn root_invalid(reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::ArchiveSchemaRootInvalid,
            message: reason.into(),
            location: None,
        }
    }

    /// Attach the schema document location
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)?;
        if let Some(ref location) = self.location {
            write!(f, " (schema: {})", location)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
