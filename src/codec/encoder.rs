//! Avro binary encoder
//!
//! ```text
//! int, long      zig-zag varint
//! float, double  little-endian IEEE 754 (4 / 8 bytes)
//! bytes, string  long length + raw bytes
//! record         fields in schema order, no framing
//! enum           int symbol index
//! array, map     blocks of (long count, items), closed by a zero count
//! union          long branch index + value
//! fixed          raw bytes
//! ```

use serde_json::Value;

use super::errors::{CodecError, CodecResult};
use crate::record::Record;
use crate::schema::{accepts, is_byte_string, json_type_name, RecordSchema, Schema};

/// Encodes one record against the schema.
pub fn encode(record: &Record, schema: &Schema) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(256);
    match schema {
        Schema::Record(rs) => write_record(&mut buf, rs, record.fields())?,
        other => return Err(CodecError::mismatch(other.type_name(), "record")),
    }
    Ok(buf)
}

/// Appends the encoding of an arbitrary value.
pub fn encode_value(buf: &mut Vec<u8>, schema: &Schema, value: &Value) -> CodecResult<()> {
    match schema {
        Schema::Null => {
            if !value.is_null() {
                return Err(mismatch(schema, value));
            }
        }
        Schema::Boolean => {
            let b = value.as_bool().ok_or_else(|| mismatch(schema, value))?;
            buf.push(u8::from(b));
        }
        Schema::Int | Schema::Long => {
            if !accepts(schema, value) {
                return Err(mismatch(schema, value));
            }
            // accepts() guarantees an i64
            write_long(buf, value.as_i64().unwrap_or_default());
        }
        Schema::Float => {
            let n = value.as_f64().ok_or_else(|| mismatch(schema, value))?;
            buf.extend_from_slice(&(n as f32).to_le_bytes());
        }
        Schema::Double => {
            let n = value.as_f64().ok_or_else(|| mismatch(schema, value))?;
            buf.extend_from_slice(&n.to_le_bytes());
        }
        Schema::Bytes => {
            let bytes = byte_string(schema, value)?;
            write_long(buf, bytes.len() as i64);
            buf.extend_from_slice(&bytes);
        }
        Schema::String => {
            let s = value.as_str().ok_or_else(|| mismatch(schema, value))?;
            write_long(buf, s.len() as i64);
            buf.extend_from_slice(s.as_bytes());
        }
        Schema::Record(rs) => {
            let fields = value.as_object().ok_or_else(|| mismatch(schema, value))?;
            write_record(buf, rs, fields)?;
        }
        Schema::Enum(e) => {
            let index = value
                .as_str()
                .and_then(|s| e.index_of(s))
                .ok_or_else(|| CodecError::mismatch(format!("symbol of {}", e.name), value.to_string()))?;
            write_long(buf, index as i64);
        }
        Schema::Array(items) => {
            let arr = value.as_array().ok_or_else(|| mismatch(schema, value))?;
            if !arr.is_empty() {
                write_long(buf, arr.len() as i64);
                for (i, item) in arr.iter().enumerate() {
                    encode_value(buf, items, item).map_err(|e| e.within(&format!("[{}]", i)))?;
                }
            }
            write_long(buf, 0);
        }
        Schema::Map(values) => {
            let obj = value.as_object().ok_or_else(|| mismatch(schema, value))?;
            if !obj.is_empty() {
                write_long(buf, obj.len() as i64);
                for (key, item) in obj {
                    write_long(buf, key.len() as i64);
                    buf.extend_from_slice(key.as_bytes());
                    encode_value(buf, values, item).map_err(|e| e.within(key))?;
                }
            }
            write_long(buf, 0);
        }
        Schema::Union(branches) => {
            let index = branches
                .iter()
                .position(|b| accepts(b, value))
                .ok_or_else(|| mismatch(schema, value))?;
            write_long(buf, index as i64);
            encode_value(buf, &branches[index], value)?;
        }
        Schema::Fixed(fixed) => {
            let bytes = byte_string(schema, value)?;
            if bytes.len() != fixed.size {
                return Err(CodecError::mismatch(
                    format!("{} bytes for {}", fixed.size, fixed.name),
                    format!("{} bytes", bytes.len()),
                ));
            }
            buf.extend_from_slice(&bytes);
        }
    }
    Ok(())
}

fn write_record(
    buf: &mut Vec<u8>,
    schema: &RecordSchema,
    fields: &serde_json::Map<String, Value>,
) -> CodecResult<()> {
    for field in &schema.fields {
        let value = fields
            .get(&field.name)
            .or(field.default.as_ref())
            .unwrap_or(&Value::Null);
        encode_value(buf, &field.schema, value).map_err(|e| e.within(&field.name))?;
    }
    Ok(())
}

/// Writes a zig-zag varint.
pub fn write_long(buf: &mut Vec<u8>, n: i64) {
    let mut z = ((n << 1) ^ (n >> 63)) as u64;
    while z & !0x7F != 0 {
        buf.push(((z & 0x7F) | 0x80) as u8);
        z >>= 7;
    }
    buf.push(z as u8);
}

fn byte_string(schema: &Schema, value: &Value) -> CodecResult<Vec<u8>> {
    match value.as_str() {
        Some(s) if is_byte_string(s) => Ok(s.chars().map(|c| c as u8).collect()),
        _ => Err(mismatch(schema, value)),
    }
}

fn mismatch(schema: &Schema, value: &Value) -> CodecError {
    CodecError::mismatch(schema.type_name(), json_type_name(value))
}
