//! Avro schema type definitions
//!
//! Supported types:
//! - primitives: null, boolean, int, long, float, double, bytes, string
//! - record: ordered named fields, each with an optional default
//! - enum: named list of symbols
//! - array / map: homogeneous items / string-keyed values
//! - union: ordered list of alternative branches
//! - fixed: named byte string of constant size

use serde_json::Value;

use crate::record::{ID_FIELD, STATUS_FIELD};

/// A parsed schema.
///
/// Named type references are resolved at parse time, so a `Schema` is a
/// self-contained tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Null,
    Boolean,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 32-bit IEEE float
    Float,
    /// 64-bit IEEE float
    Double,
    /// Raw bytes
    Bytes,
    /// UTF-8 string
    String,
    Record(RecordSchema),
    Enum(EnumSchema),
    /// Array with the element type
    Array(Box<Schema>),
    /// String-keyed map with the value type
    Map(Box<Schema>),
    /// Union branches in declaration order
    Union(Vec<Schema>),
    Fixed(FixedSchema),
}

impl Schema {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Schema::Null => "null",
            Schema::Boolean => "boolean",
            Schema::Int => "int",
            Schema::Long => "long",
            Schema::Float => "float",
            Schema::Double => "double",
            Schema::Bytes => "bytes",
            Schema::String => "string",
            Schema::Record(_) => "record",
            Schema::Enum(_) => "enum",
            Schema::Array(_) => "array",
            Schema::Map(_) => "map",
            Schema::Union(_) => "union",
            Schema::Fixed(_) => "fixed",
        }
    }

    /// Maps a primitive type name to its schema
    pub fn primitive(name: &str) -> Option<Self> {
        match name {
            "null" => Some(Schema::Null),
            "boolean" => Some(Schema::Boolean),
            "int" => Some(Schema::Int),
            "long" => Some(Schema::Long),
            "float" => Some(Schema::Float),
            "double" => Some(Schema::Double),
            "bytes" => Some(Schema::Bytes),
            "string" => Some(Schema::String),
            _ => None,
        }
    }

    /// Returns the record definition if this is a record schema
    pub fn as_record(&self) -> Option<&RecordSchema> {
        match self {
            Schema::Record(record) => Some(record),
            _ => None,
        }
    }
}

/// Record field definition
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    /// Value written when the field is absent from a record
    pub default: Option<Value>,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Record definition
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// Full name, including the namespace when one was declared
    pub name: String,
    pub fields: Vec<Field>,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Looks up a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validates that the record can carry archive records: it must declare
    /// both the `id` and the `status` field.
    pub fn validate_archive_root(&self) -> Result<(), String> {
        for reserved in [ID_FIELD, STATUS_FIELD] {
            if self.field(reserved).is_none() {
                return Err(format!(
                    "Record '{}' must define a '{}' field",
                    self.name, reserved
                ));
            }
        }
        Ok(())
    }
}

/// Enum definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSchema {
    pub name: String,
    pub symbols: Vec<String>,
}

impl EnumSchema {
    /// Position of a symbol, which is what gets encoded
    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }
}

/// Fixed-size byte string definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedSchema {
    pub name: String,
    pub size: usize,
}
