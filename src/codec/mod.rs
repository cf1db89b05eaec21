//! Record codec
//!
//! Serializes records against the storage handle's schema into Avro binary
//! datums and wraps the result in optional stream compression.
//!
//! ```text
//! write:  Record -> encode(schema) -> compress -> bytes
//! read:   bytes -> decompress -> decode(schema) -> [Record, ...]
//! ```

mod compression;
mod decoder;
mod encoder;
mod errors;

pub use compression::Compression;
pub use decoder::{decode, Decoder, FramingPolicy, RecordStream};
pub use encoder::{encode, encode_value, write_long};
pub use errors::{CodecError, CodecResult};

use crate::record::Record;
use crate::schema::Schema;

/// Schema-bound codec with its compression and framing settings.
#[derive(Debug, Clone)]
pub struct RecordCodec {
    schema: Schema,
    compression: Compression,
    framing: FramingPolicy,
}

impl RecordCodec {
    pub fn new(schema: Schema, compression: Compression, framing: FramingPolicy) -> Self {
        Self {
            schema,
            compression,
            framing,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn framing(&self) -> FramingPolicy {
        self.framing
    }

    /// Encodes and compresses one record into a complete blob.
    pub fn encode(&self, record: &Record) -> CodecResult<Vec<u8>> {
        let encoded = encode(record, &self.schema)?;
        self.compression.compress(encoded)
    }

    /// Returns the record as a decode of its own encoding yields it.
    ///
    /// Absent fields take their schema defaults, numbers take the width of
    /// their field and fields the schema does not declare are dropped.
    pub fn normalize(&self, record: &Record) -> CodecResult<Record> {
        let encoded = encode(record, &self.schema)?;
        RecordStream::new(&encoded, &self.schema, FramingPolicy::Strict)
            .next()
            .unwrap_or_else(|| Ok(Record::new()))
    }

    /// Decompresses a blob and decodes every record in it.
    pub fn decode_all(&self, blob: &[u8]) -> CodecResult<Vec<Record>> {
        let data = self.compression.decompress(blob)?;
        RecordStream::new(&data, &self.schema, self.framing).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaLoader;
    use serde_json::json;

    const SCHEMA: &str = r#"{
        "type": "record", "name": "Job", "fields": [
            {"name": "id", "type": "string"},
            {"name": "status", "type": "string"},
            {"name": "payload", "type": "string"},
            {"name": "exit_code", "type": ["null", "int"], "default": null},
            {"name": "steps", "type": {"type": "array", "items": {
                "type": "record", "name": "Step", "fields": [
                    {"name": "name", "type": "string"},
                    {"name": "wall_time", "type": "double"}
                ]
            }}, "default": []}
        ]
    }"#;

    fn record() -> Record {
        Record::try_from(json!({
            "id": "0123456789abcdef0123456789abcdef",
            "status": "hdfs",
            "payload": "x",
            "exit_code": 0,
            "steps": [{"name": "cmsRun1", "wall_time": 12.5}],
        }))
        .unwrap()
    }

    fn codec(compression: Compression) -> RecordCodec {
        RecordCodec::new(SchemaLoader::parse_str(SCHEMA).unwrap(), compression, FramingPolicy::Strict)
    }

    #[test]
    fn test_roundtrip_each_compression() {
        for compression in [Compression::None, Compression::Gzip, Compression::Zstd] {
            let codec = codec(compression);
            let blob = codec.encode(&record()).unwrap();
            assert_eq!(codec.decode_all(&blob).unwrap(), vec![record()], "{:?}", compression);
        }
    }

    #[test]
    fn test_defaults_fill_absent_fields() {
        let codec = codec(Compression::None);
        let sparse = Record::try_from(json!({"id": "a", "status": "hdfs", "payload": "x"})).unwrap();
        let decoded = codec.decode_all(&codec.encode(&sparse).unwrap()).unwrap();
        assert_eq!(decoded[0].get("exit_code"), Some(&json!(null)));
        assert_eq!(decoded[0].get("steps"), Some(&json!([])));
    }

    #[test]
    fn test_normalize_matches_read_back() {
        let codec = codec(Compression::Gzip);
        let sparse = Record::try_from(json!({
            "id": "0123456789abcdef0123456789abcdef",
            "status": "hdfs",
            "payload": "x",
            "steps": [{"name": "cmsRun1", "wall_time": 3}],
            "undeclared": true,
        }))
        .unwrap();
        let normalized = codec.normalize(&sparse).unwrap();
        assert_eq!(normalized.get("exit_code"), Some(&json!(null)));
        assert_eq!(normalized.get("steps"), Some(&json!([{"name": "cmsRun1", "wall_time": 3.0}])));
        assert!(!normalized.contains("undeclared"));

        let read_back = codec.decode_all(&codec.encode(&sparse).unwrap()).unwrap();
        assert_eq!(read_back, vec![normalized]);
    }

    #[test]
    fn test_corrupt_compressed_blob_is_error() {
        let codec = codec(Compression::Gzip);
        let mut blob = codec.encode(&record()).unwrap();
        blob.truncate(blob.len() / 2);
        assert!(codec.decode_all(&blob).is_err());
    }
}
