//! Record data model shared by every storage backend
//!
//! A record is a JSON-like mapping from field name to value. Two fields are
//! reserved: `id` carries the content fingerprint and `status` is set by the
//! backend that persisted the record.
//!
//! The input and output shapes of the storage operations are explicit sum
//! types: callers say whether they pass one record or a batch.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identity::Fingerprint;

/// Field holding the record fingerprint
pub const ID_FIELD: &str = "id";

/// Field holding the tag of the backend that stored the record
pub const STATUS_FIELD: &str = "status";

/// A single job metadata record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Returns the value of a field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Sets a field, returning the previous value
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    /// Removes a field, returning its value
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Returns true if the record declares the field
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Returns the stored `id`, if it is a string
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    /// Returns the stored `status`, if it is a string
    pub fn status(&self) -> Option<&str> {
        self.0.get(STATUS_FIELD).and_then(Value::as_str)
    }

    /// Stamps the record with the tag of the backend persisting it
    pub fn set_status(&mut self, tag: &str) {
        self.0.insert(STATUS_FIELD.to_string(), Value::String(tag.to_string()));
    }

    /// Borrow the underlying field map
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the record has no fields
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts the record into a JSON object value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl TryFrom<Value> for Record {
    type Error = Value;

    /// Succeeds for JSON objects; hands the value back otherwise.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(other),
        }
    }
}

/// A read request understood by some backend.
///
/// Fingerprint-shaped tokens address a single stored record. Structured
/// filters are meant for query-capable tiers; backends that cannot serve
/// them return an empty result.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// A bare token, normally a fingerprint
    Token(String),
    /// A structured filter document
    Filter(Value),
}

impl From<&str> for Query {
    fn from(token: &str) -> Self {
        Query::Token(token.to_string())
    }
}

impl From<String> for Query {
    fn from(token: String) -> Self {
        Query::Token(token)
    }
}

impl From<Fingerprint> for Query {
    fn from(id: Fingerprint) -> Self {
        Query::Token(id.into_string())
    }
}

impl From<&Fingerprint> for Query {
    fn from(id: &Fingerprint) -> Self {
        Query::Token(id.as_str().to_string())
    }
}

/// Input of `Storage::read`
#[derive(Debug, Clone, PartialEq)]
pub enum ReadSpec {
    /// Delegate one query straight to the backend
    Single(Query),
    /// Run each query in order and concatenate the non-empty results
    Batch(Vec<Query>),
}

impl ReadSpec {
    /// Batch read of the given fingerprints
    pub fn ids<'a>(ids: impl IntoIterator<Item = &'a Fingerprint>) -> Self {
        ReadSpec::Batch(ids.into_iter().map(Query::from).collect())
    }
}

impl From<Query> for ReadSpec {
    fn from(query: Query) -> Self {
        ReadSpec::Single(query)
    }
}

impl From<Vec<Query>> for ReadSpec {
    fn from(queries: Vec<Query>) -> Self {
        ReadSpec::Batch(queries)
    }
}

/// Input of `Storage::write`
///
/// A batch is consumed lazily, one record at a time.
pub enum WriteInput<'a> {
    /// Exactly one record; the write returns a single id
    Single(Record),
    /// Any number of records; the write returns ids in input order
    Batch(Box<dyn Iterator<Item = Record> + 'a>),
}

impl<'a> WriteInput<'a> {
    /// Wrap any record source as a batch
    pub fn batch<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Record>,
        I::IntoIter: 'a,
    {
        WriteInput::Batch(Box::new(records.into_iter()))
    }

    /// Returns true for the single-record variant
    pub fn is_single(&self) -> bool {
        matches!(self, WriteInput::Single(_))
    }
}

impl From<Record> for WriteInput<'_> {
    fn from(record: Record) -> Self {
        WriteInput::Single(record)
    }
}

impl From<Vec<Record>> for WriteInput<'_> {
    fn from(records: Vec<Record>) -> Self {
        WriteInput::batch(records)
    }
}

impl std::fmt::Debug for WriteInput<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteInput::Single(record) => f.debug_tuple("Single").field(record).finish(),
            WriteInput::Batch(_) => f.write_str("Batch(..)"),
        }
    }
}

/// Borrowed records for id projection
#[derive(Debug, Clone, Copy)]
pub enum RecordsRef<'a> {
    Single(&'a Record),
    Batch(&'a [Record]),
}

/// Fingerprints returned by a write, shaped like its input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ids {
    Single(Fingerprint),
    Many(Vec<Fingerprint>),
}

impl Ids {
    /// Flatten into a list
    pub fn into_vec(self) -> Vec<Fingerprint> {
        match self {
            Ids::Single(id) => vec![id],
            Ids::Many(ids) => ids,
        }
    }

    /// Borrow as a slice
    pub fn as_slice(&self) -> &[Fingerprint] {
        match self {
            Ids::Single(id) => std::slice::from_ref(id),
            Ids::Many(ids) => ids,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}
