//! Storage configuration
//!
//! A storage handle is described by a JSON document:
//!
//! ```json
//! {
//!     "uri": "hdfsio:/archive/jobs/job.avsc",
//!     "compression": "gzip",
//!     "overwrite": "verify_identical",
//!     "framing": "strict",
//!     "local_root": "/mnt/hdfs"
//! }
//! ```
//!
//! Only `uri` is required. The scheme prefix of the URI selects the backend
//! family; the remainder is the backend-specific path of the schema file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::{Compression, FramingPolicy};
use crate::hdfs::{HdfsOptions, HdfsStorage, LocalFileSystem, OverwritePolicy};
use crate::storage::{Storage, StorageError, StorageResult};

/// URI scheme of the distributed-filesystem backend
pub const HDFS_SCHEME: &str = "hdfsio";

/// A backend URI split into scheme and path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendUri {
    scheme: String,
    path: String,
}

impl BackendUri {
    /// Splits `scheme:path` at the first colon.
    pub fn parse(uri: &str) -> StorageResult<Self> {
        let (scheme, path) = uri
            .split_once(':')
            .ok_or_else(|| StorageError::configuration(format!("Backend URI '{}' has no scheme", uri)))?;

        if scheme.is_empty()
            || !scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
        {
            return Err(StorageError::configuration(format!(
                "Invalid scheme in backend URI '{}'",
                uri
            )));
        }
        if path.is_empty() {
            return Err(StorageError::configuration(format!(
                "Backend URI '{}' has no path",
                uri
            )));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            path: path.to_string(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Storage configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend URI of the schema file (required)
    pub uri: String,

    /// Compression of record files (optional, default none)
    #[serde(default)]
    pub compression: Compression,

    /// Existing-file handling on write (optional, default verify_identical)
    #[serde(default)]
    pub overwrite: OverwritePolicy,

    /// Record stream framing on read (optional, default strict)
    #[serde(default)]
    pub framing: FramingPolicy,

    /// Local directory backend paths resolve under (optional, default "/")
    #[serde(default = "default_local_root")]
    pub local_root: String,
}

fn default_local_root() -> String {
    "/".to_string()
}

impl StorageConfig {
    /// Configuration with defaults for everything but the URI
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            compression: Compression::default(),
            overwrite: OverwritePolicy::default(),
            framing: FramingPolicy::default(),
            local_root: default_local_root(),
        }
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> StorageResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| StorageError::configuration(format!("Failed to read config: {}", e)))?;

        Self::from_json(&content)
    }

    /// Parse and validate configuration text
    pub fn from_json(content: &str) -> StorageResult<Self> {
        let config: StorageConfig = serde_json::from_str(content)
            .map_err(|e| StorageError::configuration(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> StorageResult<()> {
        let uri = BackendUri::parse(&self.uri)?;
        if uri.scheme() != HDFS_SCHEME {
            return Err(StorageError::configuration(format!(
                "Unknown backend scheme '{}'",
                uri.scheme()
            )));
        }

        if self.local_root.is_empty() {
            return Err(StorageError::configuration("local_root must not be empty"));
        }

        Ok(())
    }

    pub fn hdfs_options(&self) -> HdfsOptions {
        HdfsOptions {
            compression: self.compression,
            overwrite: self.overwrite,
            framing: self.framing,
        }
    }
}

/// Opens the storage handle a configuration describes.
pub fn connect(config: &StorageConfig) -> StorageResult<Box<dyn Storage>> {
    config.validate()?;
    let uri = BackendUri::parse(&config.uri)?;

    match uri.scheme() {
        HDFS_SCHEME => Ok(Box::new(HdfsStorage::open(
            LocalFileSystem::new(&config.local_root),
            uri.path(),
            config.hdfs_options(),
        )?)),
        other => Err(StorageError::configuration(format!(
            "Unknown backend scheme '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uri() {
        let uri = BackendUri::parse("hdfsio:/archive/jobs/job.avsc").unwrap();
        assert_eq!(uri.scheme(), "hdfsio");
        assert_eq!(uri.path(), "/archive/jobs/job.avsc");
    }

    #[test]
    fn test_parse_uri_rejects_missing_parts() {
        assert!(BackendUri::parse("/archive/job.avsc").unwrap_err().is_configuration());
        assert!(BackendUri::parse(":/archive/job.avsc").is_err());
        assert!(BackendUri::parse("hdfsio:").is_err());
        assert!(BackendUri::parse("hd fs:/a").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = StorageConfig::from_json(r#"{"uri": "hdfsio:/a/job.avsc"}"#).unwrap();
        assert_eq!(config, StorageConfig::new("hdfsio:/a/job.avsc"));
        assert_eq!(config.compression, Compression::None);
        assert_eq!(config.overwrite, OverwritePolicy::VerifyIdentical);
        assert_eq!(config.framing, FramingPolicy::Strict);
        assert_eq!(config.local_root, "/");
    }

    #[test]
    fn test_explicit_values() {
        let config = StorageConfig::from_json(
            r#"{"uri": "hdfsio:/a/job.avsc", "compression": "zstd",
                "overwrite": "reject", "framing": "lenient", "local_root": "/mnt"}"#,
        )
        .unwrap();
        assert_eq!(config.compression, Compression::Zstd);
        assert_eq!(config.overwrite, OverwritePolicy::Reject);
        assert_eq!(config.framing, FramingPolicy::Lenient);
        assert_eq!(config.local_root, "/mnt");
    }

    #[test]
    fn test_missing_uri_rejected() {
        let err = StorageConfig::from_json(r#"{"compression": "gzip"}"#).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        let err = StorageConfig::from_json(r#"{"uri": "mongodb:/jobs"}"#).unwrap_err();
        assert!(err.to_string().contains("mongodb"));
    }

    #[test]
    fn test_unknown_compression_rejected() {
        assert!(StorageConfig::from_json(r#"{"uri": "hdfsio:/a/job.avsc", "compression": "lz4"}"#).is_err());
    }
}
