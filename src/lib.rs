//! jobarchive - content-addressed archive storage for job metadata records
//!
//! Records are identified by a fingerprint of their content, serialized
//! against an Avro schema, optionally compressed, and persisted one file per
//! record on a filesystem-like backend.

pub mod codec;
pub mod config;
pub mod hdfs;
pub mod identity;
pub mod observability;
pub mod record;
pub mod schema;
pub mod storage;

pub use config::{connect, StorageConfig};
pub use hdfs::HdfsStorage;
pub use identity::{fingerprint, Fingerprint};
pub use record::{Ids, Query, ReadSpec, Record, RecordsRef, WriteInput};
pub use storage::{getids, Storage, StorageError, StorageResult};
