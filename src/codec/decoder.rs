//! Avro binary decoder and record stream framing
//!
//! A stored blob holds zero or more records encoded back to back with no
//! separators. [`RecordStream`] walks the blob record by record:
//!
//! - the blob ending exactly on a record boundary is a clean end of stream
//! - any failure inside a record is a decode error, reported under
//!   [`FramingPolicy::Strict`] and treated as end of stream under
//!   [`FramingPolicy::Lenient`]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::errors::{CodecError, CodecResult};
use crate::record::Record;
use crate::schema::{json_type_name, Schema};

/// Maximum bytes in a zig-zag varint for a 64-bit value
const MAX_VARINT_LEN: usize = 10;

/// Cap on items of a single array or map whose items may encode to no bytes
const MAX_ZERO_WIDTH_ITEMS: usize = 1 << 20;

/// What to do when a record in a stream cannot be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingPolicy {
    /// Report the failure
    #[default]
    Strict,
    /// Stop silently, keeping the records decoded so far
    Lenient,
}

/// Cursor over encoded bytes.
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current byte offset
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns true when every byte has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(CodecError::Truncated { offset: self.pos })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn malformed(&self, offset: usize, reason: impl Into<String>) -> CodecError {
        CodecError::Malformed {
            offset,
            reason: reason.into(),
        }
    }

    /// Reads a zig-zag varint.
    pub fn read_long(&mut self) -> CodecResult<i64> {
        let start = self.pos;
        let mut z: u64 = 0;
        for i in 0..MAX_VARINT_LEN {
            let byte = self.take(1)?[0];
            z |= u64::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(((z >> 1) as i64) ^ -((z & 1) as i64));
            }
        }
        Err(self.malformed(start, "varint longer than 10 bytes"))
    }

    fn read_int(&mut self) -> CodecResult<i32> {
        let start = self.pos;
        let n = self.read_long()?;
        i32::try_from(n).map_err(|_| self.malformed(start, format!("int out of range: {}", n)))
    }

    fn read_len(&mut self) -> CodecResult<usize> {
        let start = self.pos;
        let n = self.read_long()?;
        usize::try_from(n).map_err(|_| self.malformed(start, format!("negative length: {}", n)))
    }

    fn read_string(&mut self) -> CodecResult<String> {
        let len = self.read_len()?;
        let start = self.pos;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| self.malformed(start, format!("invalid UTF-8: {}", e)))
    }

    fn float(&self, offset: usize, n: f64) -> CodecResult<Value> {
        Number::from_f64(n)
            .map(Value::Number)
            .ok_or_else(|| self.malformed(offset, format!("non-finite float: {}", n)))
    }

    /// Reads the item count of the next array or map block; 0 ends the
    /// sequence.
    fn read_block_len(&mut self) -> CodecResult<usize> {
        let start = self.pos;
        let count = self.read_long()?;
        if count < 0 {
            // Negative count is followed by the block size in bytes
            self.read_long()?;
        }
        usize::try_from(count.unsigned_abs())
            .map_err(|_| self.malformed(start, format!("block count out of range: {}", count)))
    }

    /// Rejects a block count the remaining input cannot back.
    ///
    /// Each item needs at least `item_len` bytes; items that may take none
    /// are capped in total instead.
    fn check_block(&self, start: usize, count: usize, item_len: usize, decoded: usize) -> CodecResult<()> {
        let remaining = self.data.len().saturating_sub(self.pos);
        let fits = match item_len {
            0 => decoded.saturating_add(count) <= MAX_ZERO_WIDTH_ITEMS,
            n => count <= remaining / n,
        };
        if fits {
            Ok(())
        } else {
            Err(self.malformed(start, format!("block count {} exceeds remaining input", count)))
        }
    }

    /// Reads one value of the given schema.
    pub fn read_value(&mut self, schema: &Schema) -> CodecResult<Value> {
        let start = self.pos;
        match schema {
            Schema::Null => Ok(Value::Null),
            Schema::Boolean => match self.take(1)?[0] {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                other => Err(self.malformed(start, format!("invalid boolean byte {:#04x}", other))),
            },
            Schema::Int => Ok(Value::from(self.read_int()?)),
            Schema::Long => Ok(Value::from(self.read_long()?)),
            Schema::Float => {
                let raw = self.take(4)?;
                let n = f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
                self.float(start, f64::from(n))
            }
            Schema::Double => {
                let raw = self.take(8)?;
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(raw);
                self.float(start, f64::from_le_bytes(bytes))
            }
            Schema::Bytes => {
                let len = self.read_len()?;
                Ok(byte_string(self.take(len)?))
            }
            Schema::String => Ok(Value::String(self.read_string()?)),
            Schema::Record(rs) => {
                let mut fields = Map::new();
                for field in &rs.fields {
                    let value = self.read_value(&field.schema)?;
                    fields.insert(field.name.clone(), value);
                }
                Ok(Value::Object(fields))
            }
            Schema::Enum(e) => {
                let index = self.read_int()?;
                usize::try_from(index)
                    .ok()
                    .and_then(|i| e.symbols.get(i))
                    .map(|s| Value::String(s.clone()))
                    .ok_or_else(|| self.malformed(start, format!("enum index {} out of range for {}", index, e.name)))
            }
            Schema::Array(items) => {
                let item_len = min_encoded_len(items);
                let mut out = Vec::new();
                loop {
                    let count = self.read_block_len()?;
                    if count == 0 {
                        break;
                    }
                    self.check_block(start, count, item_len, out.len())?;
                    for _ in 0..count {
                        out.push(self.read_value(items)?);
                    }
                }
                Ok(Value::Array(out))
            }
            Schema::Map(values) => {
                // Keys are strings, at least one length byte each
                let item_len = 1 + min_encoded_len(values);
                let mut out = Map::new();
                loop {
                    let count = self.read_block_len()?;
                    if count == 0 {
                        break;
                    }
                    self.check_block(start, count, item_len, out.len())?;
                    for _ in 0..count {
                        let key = self.read_string()?;
                        let value = self.read_value(values)?;
                        out.insert(key, value);
                    }
                }
                Ok(Value::Object(out))
            }
            Schema::Union(branches) => {
                let index = self.read_long()?;
                let branch = usize::try_from(index)
                    .ok()
                    .and_then(|i| branches.get(i))
                    .ok_or_else(|| self.malformed(start, format!("union branch {} out of range", index)))?;
                self.read_value(branch)
            }
            Schema::Fixed(fixed) => Ok(byte_string(self.take(fixed.size)?)),
        }
    }
}

/// Fewest bytes any value of the schema encodes to.
fn min_encoded_len(schema: &Schema) -> usize {
    match schema {
        Schema::Null => 0,
        Schema::Float => 4,
        Schema::Double => 8,
        Schema::Fixed(fixed) => fixed.size,
        Schema::Record(record) => record.fields.iter().map(|f| min_encoded_len(&f.schema)).sum(),
        Schema::Boolean
        | Schema::Int
        | Schema::Long
        | Schema::Bytes
        | Schema::String
        | Schema::Enum(_)
        | Schema::Array(_)
        | Schema::Map(_)
        | Schema::Union(_) => 1,
    }
}

fn byte_string(bytes: &[u8]) -> Value {
    Value::String(bytes.iter().map(|b| char::from(*b)).collect())
}

/// Lazy sequence of records decoded from one blob.
pub struct RecordStream<'a> {
    decoder: Decoder<'a>,
    schema: &'a Schema,
    policy: FramingPolicy,
    finished: bool,
}

impl<'a> RecordStream<'a> {
    pub fn new(data: &'a [u8], schema: &'a Schema, policy: FramingPolicy) -> Self {
        Self {
            decoder: Decoder::new(data),
            schema,
            policy,
            finished: false,
        }
    }

    fn next_record(&mut self) -> CodecResult<Record> {
        let start = self.decoder.position();
        let value = self.decoder.read_value(self.schema)?;
        Record::try_from(value).map_err(|other| CodecError::Malformed {
            offset: start,
            reason: format!("decoded {} where a record was expected", json_type_name(&other)),
        })
    }
}

impl Iterator for RecordStream<'_> {
    type Item = CodecResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.decoder.is_exhausted() {
            self.finished = true;
            return None;
        }
        match self.next_record() {
            Ok(record) => Some(Ok(record)),
            Err(e) => {
                self.finished = true;
                match self.policy {
                    FramingPolicy::Strict => Some(Err(e)),
                    FramingPolicy::Lenient => None,
                }
            }
        }
    }
}

/// Decodes every record in a blob with strict framing.
pub fn decode<'a>(data: &'a [u8], schema: &'a Schema) -> RecordStream<'a> {
    RecordStream::new(data, schema, FramingPolicy::Strict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encoder::{encode, encode_value};
    use crate::schema::{Field, RecordSchema};
    use serde_json::json;

    fn job_schema() -> Schema {
        Schema::Record(RecordSchema::new(
            "Job",
            vec![
                Field::new("id", Schema::String),
                Field::new("status", Schema::String),
                Field::new("payload", Schema::String),
            ],
        ))
    }

    fn job(payload: &str) -> Record {
        Record::try_from(json!({"id": "a", "status": "hdfs", "payload": payload})).unwrap()
    }

    #[test]
    fn test_long_roundtrip_edges() {
        for n in [0, -1, 1, 63, -64, 64, i64::MAX, i64::MIN] {
            let mut buf = Vec::new();
            encode_value(&mut buf, &Schema::Long, &json!(n)).unwrap();
            assert_eq!(Decoder::new(&buf).read_long().unwrap(), n);
        }
    }

    #[test]
    fn test_empty_blob_has_no_records() {
        let schema = job_schema();
        assert_eq!(decode(&[], &schema).count(), 0);
    }

    #[test]
    fn test_concatenated_records() {
        let schema = job_schema();
        let mut blob = encode(&job("x"), &schema).unwrap();
        blob.extend(encode(&job("y"), &schema).unwrap());
        let records: Vec<_> = decode(&blob, &schema).collect::<CodecResult<_>>().unwrap();
        assert_eq!(records, vec![job("x"), job("y")]);
    }

    #[test]
    fn test_strict_rejects_truncated_tail() {
        let schema = job_schema();
        let mut blob = encode(&job("x"), &schema).unwrap();
        let second = encode(&job("y"), &schema).unwrap();
        blob.extend_from_slice(&second[..second.len() - 1]);

        let results: Vec<_> = decode(&blob, &schema).collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), &job("x"));
        assert!(matches!(results[1], Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn test_lenient_stops_at_truncated_tail() {
        let schema = job_schema();
        let mut blob = encode(&job("x"), &schema).unwrap();
        blob.push(0x40); // length prefix with no string bytes behind it

        let records: Vec<_> = RecordStream::new(&blob, &schema, FramingPolicy::Lenient)
            .collect::<CodecResult<_>>()
            .unwrap();
        assert_eq!(records, vec![job("x")]);
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let schema = Schema::String;
        let blob = [0x02, 0xFF];
        let err = Decoder::new(&blob).read_value(&schema).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { offset: 1, .. }));
    }

    #[test]
    fn test_overlong_varint_is_malformed() {
        let blob = [0xFF; 11];
        let err = Decoder::new(&blob).read_long().unwrap_err();
        assert!(matches!(err, CodecError::Malformed { offset: 0, .. }));
    }

    #[test]
    fn test_negative_block_count_with_size() {
        // -2 items, 2 bytes of block data, items 1 and 2, end of array
        let blob = [0x03, 0x04, 0x02, 0x04, 0x00];
        let value = Decoder::new(&blob)
            .read_value(&Schema::Array(Box::new(Schema::Long)))
            .unwrap();
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn test_union_branch_out_of_range() {
        let schema = Schema::Union(vec![Schema::Null]);
        let err = Decoder::new(&[0x02]).read_value(&schema).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn test_bytes_roundtrip_as_latin1_text() {
        let mut buf = Vec::new();
        encode_value(&mut buf, &Schema::Bytes, &json!("\u{0000}\u{00ff}")).unwrap();
        assert_eq!(buf, [0x04, 0x00, 0xFF]);
        assert_eq!(Decoder::new(&buf).read_value(&Schema::Bytes).unwrap(), json!("\u{0000}\u{00ff}"));
    }

    #[test]
    fn test_huge_block_of_zero_width_items_is_malformed() {
        let mut buf = Vec::new();
        crate::codec::encoder::write_long(&mut buf, 1 << 62);
        buf.push(0x00);
        let schema = Schema::Array(Box::new(Schema::Null));
        let err = Decoder::new(&buf).read_value(&schema).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn test_block_count_beyond_input_is_malformed() {
        let mut buf = Vec::new();
        crate::codec::encoder::write_long(&mut buf, 1_000);
        buf.extend_from_slice(&[0x02, 0x04]);
        for schema in [
            Schema::Array(Box::new(Schema::Long)),
            Schema::Map(Box::new(Schema::Null)),
        ] {
            let err = Decoder::new(&buf).read_value(&schema).unwrap_err();
            assert!(matches!(err, CodecError::Malformed { .. }), "{:?}", schema);
        }
    }

    #[test]
    fn test_array_of_nulls_decodes() {
        let schema = Schema::Array(Box::new(Schema::Null));
        let value = Decoder::new(&[0x06, 0x00]).read_value(&schema).unwrap();
        assert_eq!(value, json!([null, null, null]));
    }
}
