//! Record schema subsystem
//!
//! Records are bound to an externally supplied Avro schema. The schema is
//! loaded once per storage handle, from a file that lives next to the stored
//! records, and shared read-only by every operation on that handle.
//!
//! The root of an archive schema must be a record that declares the `id` and
//! `status` fields.

mod errors;
mod loader;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult};
pub use loader::SchemaLoader;
pub use types::{EnumSchema, Field, FixedSchema, RecordSchema, Schema};
pub use validator::{accepts, is_byte_string, json_type_name};
