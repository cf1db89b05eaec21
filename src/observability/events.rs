//! Observable storage events
//!
//! Events are explicit and typed. Each one renders to a stable
//! upper-case name in the log stream.

use std::fmt;

use super::logger::Severity;

/// Observable events of a storage handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Storage handle constructed
    StorageConfigured,
    /// Backend schema parsed
    SchemaLoaded,
    /// Storage root directory created
    RootCreated,

    // Writes
    /// Record handed to the backend write primitive
    RecordWrite,
    /// Byte-identical record already stored, write skipped
    RecordUnchanged,
    /// Safe write read-back matched
    SafeWriteVerified,
    /// Safe write read-back differed
    SafeWriteMismatch,

    // Reads
    /// Record file fetched and decoded
    RecordRead,
    /// Query not served by this backend
    QueryIgnored,

    /// Update requested on a backend without update support
    UpdateIgnored,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StorageConfigured => "STORAGE_CONFIGURED",
            Event::SchemaLoaded => "SCHEMA_LOADED",
            Event::RootCreated => "STORAGE_ROOT_CREATED",

            Event::RecordWrite => "WRITE",
            Event::RecordUnchanged => "WRITE_UNCHANGED",
            Event::SafeWriteVerified => "SAFE_WRITE_VERIFIED",
            Event::SafeWriteMismatch => "SAFE_WRITE_MISMATCH",

            Event::RecordRead => "READ",
            Event::QueryIgnored => "QUERY_IGNORED",

            Event::UpdateIgnored => "UPDATE_IGNORED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::SafeWriteMismatch => Severity::Error,
            Event::UpdateIgnored => Severity::Warn,
            Event::RecordRead | Event::QueryIgnored => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
