//! Schema loader
//!
//! Parses Avro schema documents (`.avsc`, JSON text) into a resolved
//! [`Schema`] tree. Named types may be referenced after their definition by
//! short name or by full `namespace.name`.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use super::errors::{SchemaError, SchemaResult};
use super::types::{EnumSchema, Field, FixedSchema, RecordSchema, Schema};

/// Schema parser holding the named types defined so far.
#[derive(Debug, Default)]
pub struct SchemaLoader {
    /// Completed named types, by full name and by short name
    names: HashMap<String, Schema>,
    /// Named types whose definition is in progress
    pending: HashSet<String>,
}

impl SchemaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses schema text.
    pub fn parse_str(text: &str) -> SchemaResult<Schema> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| SchemaError::malformed(format!("Invalid JSON: {}", e)))?;
        Self::new().parse(&value, None)
    }

    /// Parses schema bytes read from `location`, tagging errors with it.
    pub fn load(location: &str, bytes: &[u8]) -> SchemaResult<Schema> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| SchemaError::malformed(format!("Schema is not UTF-8: {}", e)).at(location))?;
        Self::parse_str(text).map_err(|e| e.at(location))
    }

    /// Parses a schema and checks it can describe archive records.
    pub fn load_archive_schema(location: &str, bytes: &[u8]) -> SchemaResult<Schema> {
        let schema = Self::load(location, bytes)?;
        let record = schema.as_record().ok_or_else(|| {
            SchemaError::root_invalid(format!(
                "Root schema must be a record, found {}",
                schema.type_name()
            ))
            .at(location)
        })?;
        record
            .validate_archive_root()
            .map_err(|reason| SchemaError::root_invalid(reason).at(location))?;
        Ok(schema)
    }

    /// Parses one schema node.
    pub fn parse(&mut self, value: &Value, namespace: Option<&str>) -> SchemaResult<Schema> {
        match value {
            Value::String(name) => self.resolve(name, namespace),
            Value::Array(branches) => {
                let mut parsed = Vec::with_capacity(branches.len());
                for branch in branches {
                    let schema = self.parse(branch, namespace)?;
                    if matches!(schema, Schema::Union(_)) {
                        return Err(SchemaError::malformed("Unions may not immediately contain unions"));
                    }
                    parsed.push(schema);
                }
                Ok(Schema::Union(parsed))
            }
            Value::Object(obj) => self.parse_object(obj, namespace),
            other => Err(SchemaError::malformed(format!("Unexpected schema node: {}", other))),
        }
    }

    fn parse_object(&mut self, obj: &Map<String, Value>, namespace: Option<&str>) -> SchemaResult<Schema> {
        let type_name = match obj.get("type") {
            Some(Value::String(name)) => name.as_str(),
            Some(nested) => return self.parse(nested, namespace),
            None => return Err(SchemaError::malformed("Schema object is missing 'type'")),
        };

        match type_name {
            "record" | "error" => self.parse_record(obj, namespace),
            "enum" => self.parse_enum(obj, namespace),
            "fixed" => self.parse_fixed(obj, namespace),
            "array" => {
                let items = obj
                    .get("items")
                    .ok_or_else(|| SchemaError::malformed("Array schema is missing 'items'"))?;
                Ok(Schema::Array(Box::new(self.parse(items, namespace)?)))
            }
            "map" => {
                let values = obj
                    .get("values")
                    .ok_or_else(|| SchemaError::malformed("Map schema is missing 'values'"))?;
                Ok(Schema::Map(Box::new(self.parse(values, namespace)?)))
            }
            other => self.resolve(other, namespace),
        }
    }

    fn parse_record(&mut self, obj: &Map<String, Value>, namespace: Option<&str>) -> SchemaResult<Schema> {
        let (fullname, own_namespace) = Self::fullname(obj, namespace)?;
        self.begin_definition(&fullname)?;

        let raw_fields = obj
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| SchemaError::malformed(format!("Record '{}' is missing 'fields'", fullname)))?;

        let mut fields = Vec::with_capacity(raw_fields.len());
        let mut seen = HashSet::new();
        for raw in raw_fields {
            let name = raw
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| SchemaError::malformed(format!("Field in '{}' is missing 'name'", fullname)))?;
            if !seen.insert(name.to_string()) {
                return Err(SchemaError::malformed(format!(
                    "Duplicate field '{}' in record '{}'",
                    name, fullname
                )));
            }
            let field_type = raw
                .get("type")
                .ok_or_else(|| SchemaError::malformed(format!("Field '{}' is missing 'type'", name)))?;
            let schema = self.parse(field_type, own_namespace.as_deref())?;
            fields.push(Field {
                name: name.to_string(),
                schema,
                default: raw.get("default").cloned(),
            });
        }

        let schema = Schema::Record(RecordSchema::new(fullname.clone(), fields));
        self.finish_definition(&fullname, &schema);
        Ok(schema)
    }

    fn parse_enum(&mut self, obj: &Map<String, Value>, namespace: Option<&str>) -> SchemaResult<Schema> {
        let (fullname, _) = Self::fullname(obj, namespace)?;
        self.begin_definition(&fullname)?;

        let symbols = obj
            .get("symbols")
            .and_then(Value::as_array)
            .ok_or_else(|| SchemaError::malformed(format!("Enum '{}' is missing 'symbols'", fullname)))?
            .iter()
            .map(|s| {
                s.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| SchemaError::malformed(format!("Enum '{}' has a non-string symbol", fullname)))
            })
            .collect::<SchemaResult<Vec<_>>>()?;

        let schema = Schema::Enum(EnumSchema {
            name: fullname.clone(),
            symbols,
        });
        self.finish_definition(&fullname, &schema);
        Ok(schema)
    }

    fn parse_fixed(&mut self, obj: &Map<String, Value>, namespace: Option<&str>) -> SchemaResult<Schema> {
        let (fullname, _) = Self::fullname(obj, namespace)?;
        self.begin_definition(&fullname)?;

        let size = obj
            .get("size")
            .and_then(Value::as_u64)
            .ok_or_else(|| SchemaError::malformed(format!("Fixed '{}' is missing 'size'", fullname)))?;

        let schema = Schema::Fixed(FixedSchema {
            name: fullname.clone(),
            size: size as usize,
        });
        self.finish_definition(&fullname, &schema);
        Ok(schema)
    }

    /// Computes the full name of a named type and the namespace its
    /// children inherit.
    fn fullname(obj: &Map<String, Value>, namespace: Option<&str>) -> SchemaResult<(String, Option<String>)> {
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::malformed("Named type is missing 'name'"))?;

        if let Some((ns, _)) = name.rsplit_once('.') {
            return Ok((name.to_string(), Some(ns.to_string())));
        }

        let ns = obj
            .get("namespace")
            .and_then(Value::as_str)
            .or(namespace)
            .filter(|ns| !ns.is_empty());

        match ns {
            Some(ns) => Ok((format!("{}.{}", ns, name), Some(ns.to_string()))),
            None => Ok((name.to_string(), None)),
        }
    }

    fn begin_definition(&mut self, fullname: &str) -> SchemaResult<()> {
        if self.names.contains_key(fullname) || self.pending.contains(fullname) {
            return Err(SchemaError::malformed(format!("Type '{}' is defined twice", fullname)));
        }
        self.pending.insert(fullname.to_string());
        Ok(())
    }

    fn finish_definition(&mut self, fullname: &str, schema: &Schema) {
        self.pending.remove(fullname);
        if let Some((_, short)) = fullname.rsplit_once('.') {
            self.names.entry(short.to_string()).or_insert_with(|| schema.clone());
        }
        self.names.insert(fullname.to_string(), schema.clone());
    }

    /// Resolves a primitive or previously defined named type.
    fn resolve(&self, name: &str, namespace: Option<&str>) -> SchemaResult<Schema> {
        if let Some(schema) = Schema::primitive(name) {
            return Ok(schema);
        }

        let mut candidates = Vec::with_capacity(2);
        if let Some(ns) = namespace.filter(|_| !name.contains('.')) {
            candidates.push(format!("{}.{}", ns, name));
        }
        candidates.push(name.to_string());

        for candidate in &candidates {
            if self.pending.contains(candidate) {
                return Err(SchemaError::recursive(candidate.as_str()));
            }
            if let Some(schema) = self.names.get(candidate) {
                return Ok(schema.clone());
            }
        }
        Err(SchemaError::unknown_type(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaErrorCode;

    const JOB_SCHEMA: &str = r#"{
        "type": "record",
        "name": "Job",
        "namespace": "archive.jobs",
        "fields": [
            {"name": "id", "type": "string"},
            {"name": "status", "type": "string"},
            {"name": "payload", "type": "string", "doc": "free text"}
        ]
    }"#;

    #[test]
    fn test_parse_archive_schema() {
        let schema = SchemaLoader::load_archive_schema("mem", JOB_SCHEMA.as_bytes()).unwrap();
        let record = schema.as_record().unwrap();
        assert_eq!(record.name, "archive.jobs.Job");
        let names: Vec<_> = record.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "status", "payload"]);
    }

    #[test]
    fn test_named_type_reference() {
        let text = r#"{
            "type": "record", "name": "Report", "fields": [
                {"name": "first", "type": {"type": "record", "name": "Step", "fields": [
                    {"name": "name", "type": "string"}
                ]}},
                {"name": "rest", "type": {"type": "array", "items": "Step"}}
            ]
        }"#;
        let schema = SchemaLoader::parse_str(text).unwrap();
        let record = schema.as_record().unwrap();
        let step = &record.field("first").unwrap().schema;
        assert_eq!(record.field("rest").unwrap().schema, Schema::Array(Box::new(step.clone())));
    }

    #[test]
    fn test_namespace_qualified_reference() {
        let text = r#"{
            "type": "record", "name": "Outer", "namespace": "a.b", "fields": [
                {"name": "kind", "type": {"type": "enum", "name": "Kind", "symbols": ["x", "y"]}},
                {"name": "again", "type": "a.b.Kind"}
            ]
        }"#;
        let schema = SchemaLoader::parse_str(text).unwrap();
        let again = &schema.as_record().unwrap().field("again").unwrap().schema;
        assert!(matches!(again, Schema::Enum(e) if e.name == "a.b.Kind"));
    }

    #[test]
    fn test_union_and_default() {
        let text = r#"{
            "type": "record", "name": "R", "fields": [
                {"name": "maybe", "type": ["null", "long"], "default": null},
                {"name": "tags", "type": {"type": "map", "values": "string"}},
                {"name": "digest", "type": {"type": "fixed", "name": "Digest", "size": 4}}
            ]
        }"#;
        let schema = SchemaLoader::parse_str(text).unwrap();
        let record = schema.as_record().unwrap();
        let maybe = record.field("maybe").unwrap();
        assert_eq!(maybe.schema, Schema::Union(vec![Schema::Null, Schema::Long]));
        assert_eq!(maybe.default, Some(Value::Null));
        assert!(matches!(record.field("digest").unwrap().schema, Schema::Fixed(ref f) if f.size == 4));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = SchemaLoader::parse_str(r#"{"type": "record", "name": "R", "fields": [
            {"name": "x", "type": "Missing"}
        ]}"#)
        .unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::ArchiveSchemaUnknownType);
    }

    #[test]
    fn test_recursive_type_rejected() {
        let err = SchemaLoader::parse_str(r#"{"type": "record", "name": "Node", "fields": [
            {"name": "next", "type": ["null", "Node"]}
        ]}"#)
        .unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::ArchiveSchemaRecursive);
    }

    #[test]
    fn test_invalid_json_rejected() {
        let err = SchemaLoader::load("/root/schema.avsc", b"{not json").unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::ArchiveSchemaMalformed);
        assert_eq!(err.location(), Some("/root/schema.avsc"));
    }

    #[test]
    fn test_archive_root_must_be_record() {
        let err = SchemaLoader::load_archive_schema("mem", br#""string""#).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::ArchiveSchemaRootInvalid);
    }

    #[test]
    fn test_archive_root_needs_reserved_fields() {
        let text = br#"{"type": "record", "name": "R", "fields": [{"name": "id", "type": "string"}]}"#;
        let err = SchemaLoader::load_archive_schema("mem", text).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::ArchiveSchemaRootInvalid);
    }

    #[test]
    fn test_duplicate_definition_rejected() {
        let err = SchemaLoader::parse_str(r#"{"type": "record", "name": "R", "fields": [
            {"name": "a", "type": {"type": "fixed", "name": "F", "size": 1}},
            {"name": "b", "type": {"type": "fixed", "name": "F", "size": 2}}
        ]}"#)
        .unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::ArchiveSchemaMalformed);
    }
}
