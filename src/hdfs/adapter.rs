//! HDFS storage backend
//!
//! Maps the storage contract onto a distributed filesystem: one file per
//! record, named after the record's fingerprint, next to the schema file
//! that defines the archive.
//!
//! Lifecycle: constructed (schema checked, root created, schema parsed)
//! then ready. Nothing is held open between calls.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::FileSystem;
use super::layout;
use crate::codec::{Compression, FramingPolicy, RecordCodec};
use crate::config::{BackendUri, HDFS_SCHEME};
use crate::identity::{is_fingerprint, Fingerprint, IdentityError};
use crate::observability::{Event, Logger};
use crate::record::{Query, Record, ID_FIELD};
use crate::schema::{Schema, SchemaLoader};
use crate::storage::{Storage, StorageError, StorageResult};

/// Status tag stamped on every record this backend writes
pub const STATUS_TAG: &str = "hdfs";

const BACKEND_NAME: &str = "HdfsStorage";

/// Stand-in `id` while a record without one is normalized
const PENDING_ID: &str = "00000000000000000000000000000000";

/// What a write does when the record file already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// Skip when the stored bytes are identical, fail otherwise
    #[default]
    VerifyIdentical,
    /// Fail whenever the file exists
    Reject,
    /// Replace the stored file; last write wins
    Overwrite,
}

impl OverwritePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverwritePolicy::VerifyIdentical => "verify_identical",
            OverwritePolicy::Reject => "reject",
            OverwritePolicy::Overwrite => "overwrite",
        }
    }
}

/// Construction options of [`HdfsStorage`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HdfsOptions {
    pub compression: Compression,
    pub overwrite: OverwritePolicy,
    pub framing: FramingPolicy,
}

/// Storage backend over a filesystem client.
#[derive(Debug)]
pub struct HdfsStorage<F: FileSystem> {
    fs: F,
    root: String,
    codec: RecordCodec,
    overwrite: OverwritePolicy,
}

impl<F: FileSystem> HdfsStorage<F> {
    /// Opens storage from a backend URI such as `hdfsio:/archive/job.avsc`.
    pub fn from_uri(fs: F, uri: &str, options: HdfsOptions) -> StorageResult<Self> {
        let uri = BackendUri::parse(uri)?;
        if uri.scheme() != HDFS_SCHEME {
            return Err(StorageError::configuration(format!(
                "{} cannot serve scheme '{}'",
                BACKEND_NAME,
                uri.scheme()
            )));
        }
        Self::open(fs, uri.path(), options)
    }

    /// Opens storage rooted at the directory holding `schema_path`.
    ///
    /// The root is created when missing. The schema is parsed once and held
    /// for the lifetime of the handle.
    pub fn open(fs: F, schema_path: &str, options: HdfsOptions) -> StorageResult<Self> {
        if !fs.exists(schema_path)? {
            return Err(StorageError::configuration(format!(
                "Schema file {} not found",
                schema_path
            )));
        }
        let root = layout::parent(schema_path)
            .ok_or_else(|| StorageError::configuration(format!("Invalid schema path '{}'", schema_path)))?
            .to_string();

        if !fs.is_dir(&root)? {
            fs.mkdir(&root)?;
            Logger::event(BACKEND_NAME, Event::RootCreated, &[("root", root.as_str())]);
        }

        let bytes = fs.load(schema_path)?;
        let schema = SchemaLoader::load_archive_schema(schema_path, &bytes)?;
        Logger::event(
            BACKEND_NAME,
            Event::SchemaLoaded,
            &[("schema", schema_path), ("type", schema.type_name())],
        );

        let storage = Self {
            fs,
            root,
            codec: RecordCodec::new(schema, options.compression, options.framing),
            overwrite: options.overwrite,
        };
        storage.log_configured();
        Ok(storage)
    }

    fn log_configured(&self) {
        let compression = format!("{:?}", self.codec.compression()).to_lowercase();
        Logger::event(
            BACKEND_NAME,
            Event::StorageConfigured,
            &[
                ("root", self.root.as_str()),
                ("compression", compression.as_str()),
                ("overwrite", self.overwrite.as_str()),
            ],
        );
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn schema(&self) -> &Schema {
        self.codec.schema()
    }

    pub fn compression(&self) -> Compression {
        self.codec.compression()
    }

    pub fn overwrite_policy(&self) -> OverwritePolicy {
        self.overwrite
    }

    /// Underlying filesystem client
    pub fn client(&self) -> &F {
        &self.fs
    }

    /// Backend path of the file holding `id`
    pub fn file_name(&self, id: &Fingerprint) -> String {
        layout::file_name(&self.root, id, self.codec.compression())
    }

    /// Returns false when the existing file already holds `blob`.
    fn should_write(&self, id: &Fingerprint, path: &str, blob: &[u8]) -> StorageResult<bool> {
        if self.overwrite == OverwritePolicy::Overwrite || !self.fs.exists(path)? {
            return Ok(true);
        }
        if self.overwrite == OverwritePolicy::VerifyIdentical && self.fs.load(path)? == blob {
            Logger::event(BACKEND_NAME, Event::RecordUnchanged, &[("id", id.as_str())]);
            return Ok(false);
        }
        Err(StorageError::ExistingRecordConflict {
            id: id.to_string(),
            path: path.to_string(),
        })
    }
}

impl<F: FileSystem> Storage for HdfsStorage<F> {
    fn backend_name(&self) -> &str {
        BACKEND_NAME
    }

    fn write_record(&self, record: &mut Record) -> StorageResult<()> {
        let id = Fingerprint::parse(record.id().ok_or(IdentityError::MissingId)?)?;

        record.set_status(STATUS_TAG);
        let blob = self.codec.encode(record)?;
        let path = self.file_name(&id);

        if self.should_write(&id, &path, &blob)? {
            self.fs.dump(&path, &blob)?;
        }
        Ok(())
    }

    fn normalize(&self, mut record: Record) -> StorageResult<Record> {
        let pending = match record.get(ID_FIELD) {
            None | Some(Value::Null) => true,
            Some(Value::String(_)) => false,
            // Left for id assignment to reject
            Some(_) => return Ok(record),
        };
        if pending {
            record.insert(ID_FIELD, PENDING_ID);
        }
        record.set_status(STATUS_TAG);

        let mut normalized = self.codec.normalize(&record)?;
        if pending {
            normalized.remove(ID_FIELD);
        }
        Ok(normalized)
    }

    fn read_query(&self, query: &Query) -> StorageResult<Vec<Record>> {
        let token = match query {
            Query::Token(token) if is_fingerprint(token) => token,
            _ => {
                Logger::event(BACKEND_NAME, Event::QueryIgnored, &[]);
                return Ok(Vec::new());
            }
        };
        let id = Fingerprint::parse(token)?;
        let path = self.file_name(&id);
        if !self.fs.exists(&path)? {
            return Ok(Vec::new());
        }

        let blob = self.fs.load(&path)?;
        let records = self.codec.decode_all(&blob)?;
        let count = records.len().to_string();
        Logger::event(
            BACKEND_NAME,
            Event::RecordRead,
            &[("id", id.as_str()), ("records", count.as_str())],
        );
        Ok(records)
    }
}
