//! Structural value checks against a schema
//!
//! Used to pick union branches and to produce readable encoding errors.
//! Checks never coerce: a string is not accepted where a number is expected.
//! Record values may carry fields the schema does not declare; those are
//! not part of the binary form.

use serde_json::Value;

use super::types::Schema;

/// Returns true if `value` can be encoded with `schema`.
pub fn accepts(schema: &Schema, value: &Value) -> bool {
    match schema {
        Schema::Null => value.is_null(),
        Schema::Boolean => value.is_boolean(),
        Schema::Int => value
            .as_i64()
            .map_or(false, |n| i32::try_from(n).is_ok()),
        Schema::Long => value.as_i64().is_some(),
        Schema::Float | Schema::Double => value.is_number(),
        Schema::Bytes => value.as_str().map_or(false, is_byte_string),
        Schema::String => value.is_string(),
        Schema::Record(record) => match value.as_object() {
            Some(obj) => record.fields.iter().all(|field| match obj.get(&field.name) {
                Some(v) => accepts(&field.schema, v),
                None => field.default.is_some() || accepts(&field.schema, &Value::Null),
            }),
            None => false,
        },
        Schema::Enum(e) => value.as_str().map_or(false, |s| e.index_of(s).is_some()),
        Schema::Array(items) => value
            .as_array()
            .map_or(false, |arr| arr.iter().all(|v| accepts(items, v))),
        Schema::Map(values) => value
            .as_object()
            .map_or(false, |obj| obj.values().all(|v| accepts(values, v))),
        Schema::Union(branches) => branches.iter().any(|b| accepts(b, value)),
        Schema::Fixed(fixed) => value
            .as_str()
            .map_or(false, |s| is_byte_string(s) && s.chars().count() == fixed.size),
    }
}

/// Byte strings are carried as text whose code points are all below 256.
pub fn is_byte_string(s: &str) -> bool {
    s.chars().all(|c| (c as u32) <= 0xFF)
}

/// Returns the JSON type name of a value for error messages
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
