//! Storage trait shared by all backends
//!
//! A backend supplies two primitives: a single-record write and a
//! single-query read. Bulk dispatch, id assignment, logging and safe-write
//! verification are provided on top of them, so every backend behaves the
//! same way.

use serde_json::{Map, Value};

use super::errors::{StorageError, StorageResult};
use crate::identity::{self, Fingerprint, IdentityError};
use crate::observability::{Event, Logger};
use crate::record::{Ids, Query, ReadSpec, Record, RecordsRef, WriteInput};

/// Abstract record storage.
pub trait Storage {
    /// Implementation name used to tag log lines
    fn backend_name(&self) -> &str;

    /// Persists one record that already carries its `id`.
    ///
    /// Backends may stamp backend-owned fields such as `status` on the
    /// record; the caller sees those changes.
    fn write_record(&self, record: &mut Record) -> StorageResult<()>;

    /// Brings a record into the exact form the backend stores.
    ///
    /// Runs before the fingerprint is assigned, so the `id` always hashes
    /// what a later read returns. Backends that store records verbatim keep
    /// the default.
    fn normalize(&self, record: Record) -> StorageResult<Record> {
        Ok(record)
    }

    /// Serves one query. Backends without read support return nothing.
    fn read_query(&self, query: &Query) -> StorageResult<Vec<Record>> {
        let _ = query;
        Ok(Vec::new())
    }

    /// Writes one record or a batch and returns their ids in input order.
    ///
    /// Records without `id` get their fingerprint attached first. A batch
    /// is consumed one record at a time. With `safe` set, every written
    /// record is read back by id and compared; a difference fails with
    /// `DataMismatch`. The write is not rolled back in that case.
    fn write(&self, data: WriteInput<'_>, safe: bool) -> StorageResult<Ids> {
        match data {
            WriteInput::Single(mut record) => {
                let id = write_one(self, &mut record)?;
                if safe {
                    verify(self, &id, &record)?;
                }
                Ok(Ids::Single(id))
            }
            WriteInput::Batch(records) => {
                let mut ids = Vec::new();
                let mut written = Vec::new();
                for mut record in records {
                    let id = write_one(self, &mut record)?;
                    if safe {
                        written.push(record);
                    }
                    ids.push(id);
                }
                for (id, record) in ids.iter().zip(&written) {
                    verify(self, id, record)?;
                }
                Ok(Ids::Many(ids))
            }
        }
    }

    /// Reads one query, or a batch of queries in order.
    ///
    /// For a batch, each query is served independently and the results are
    /// concatenated; queries that match nothing are skipped.
    fn read(&self, spec: ReadSpec) -> StorageResult<Vec<Record>> {
        match spec {
            ReadSpec::Single(query) => self.read_query(&query),
            ReadSpec::Batch(queries) => {
                let mut out = Vec::new();
                for query in &queries {
                    let found = self.read_query(query)?;
                    if !found.is_empty() {
                        out.extend(found);
                    }
                }
                Ok(out)
            }
        }
    }

    /// Updates stored records.
    ///
    /// Stored records are immutable unless a backend overrides this; the
    /// request is logged and ignored.
    fn update(&self, ids: &[Fingerprint], spec: &Value) -> StorageResult<()> {
        let count = ids.len().to_string();
        let spec = spec.to_string();
        Logger::event(
            self.backend_name(),
            Event::UpdateIgnored,
            &[("ids", count.as_str()), ("spec", spec.as_str())],
        );
        Ok(())
    }

    /// Cross-checks a record against its `id`.
    fn check(&self, record: &Record) -> StorageResult<()> {
        identity::check(record).map_err(StorageError::from)
    }
}

/// Returns the `id` of one record or of each record in a batch.
pub fn getids(data: RecordsRef<'_>) -> StorageResult<Ids> {
    match data {
        RecordsRef::Single(record) => Ok(Ids::Single(id_of(record)?)),
        RecordsRef::Batch(records) => records
            .iter()
            .map(id_of)
            .collect::<StorageResult<Vec<_>>>()
            .map(Ids::Many),
    }
}

fn id_of(record: &Record) -> StorageResult<Fingerprint> {
    let token = record.id().ok_or(IdentityError::MissingId)?;
    Ok(Fingerprint::parse(token)?)
}

fn write_one<S: Storage + ?Sized>(storage: &S, record: &mut Record) -> StorageResult<Fingerprint> {
    *record = storage.normalize(std::mem::take(record))?;
    let id = identity::assign(record)?;
    Logger::event(storage.backend_name(), Event::RecordWrite, &[("id", id.as_str())]);
    storage.write_record(record)?;
    Ok(id)
}

fn verify<S: Storage + ?Sized>(storage: &S, id: &Fingerprint, expected: &Record) -> StorageResult<()> {
    let found = storage.read_query(&Query::from(id))?;
    let reason = match found.as_slice() {
        [actual] if records_match(expected, actual) => {
            Logger::event(storage.backend_name(), Event::SafeWriteVerified, &[("id", id.as_str())]);
            return Ok(());
        }
        [_] => "read-back record differs from written record".to_string(),
        [] => "record could not be read back".to_string(),
        many => format!("{} records stored under one id", many.len()),
    };
    Logger::event(
        storage.backend_name(),
        Event::SafeWriteMismatch,
        &[("id", id.as_str()), ("reason", reason.as_str())],
    );
    Err(StorageError::data_mismatch(id.as_str(), reason))
}

/// Field-wise record comparison used by safe writes.
///
/// Both records must hold the same fields. Numbers compare by value, so `3`
/// matches `3.0`.
pub fn records_match(expected: &Record, actual: &Record) -> bool {
    objects_match(expected.fields(), actual.fields())
}

fn objects_match(xs: &Map<String, Value>, ys: &Map<String, Value>) -> bool {
    xs.len() == ys.len()
        && xs
            .iter()
            .all(|(key, x)| ys.get(key).is_some_and(|y| values_match(x, y)))
}

fn values_match(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i == j,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_match(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => objects_match(xs, ys),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::fingerprint;
    use crate::observability::Logger;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Keeps records in a map keyed by id; optionally corrupts what it stores.
    #[derive(Default)]
    struct MapStorage {
        records: RefCell<HashMap<String, Record>>,
        writes: RefCell<Vec<String>>,
        corrupt: bool,
        fill_defaults: bool,
    }

    impl Storage for MapStorage {
        fn backend_name(&self) -> &str {
            "MapStorage"
        }

        fn write_record(&self, record: &mut Record) -> StorageResult<()> {
            record.set_status("map");
            let id = record.id().unwrap_or_default().to_string();
            let mut stored = record.clone();
            if self.corrupt {
                stored.insert("payload", "corrupted");
            }
            self.writes.borrow_mut().push(id.clone());
            self.records.borrow_mut().insert(id, stored);
            Ok(())
        }

        fn normalize(&self, mut record: Record) -> StorageResult<Record> {
            if self.fill_defaults && !record.contains("wall") {
                record.insert("wall", 0.0);
            }
            Ok(record)
        }

        fn read_query(&self, query: &Query) -> StorageResult<Vec<Record>> {
            match query {
                Query::Token(id) => Ok(self.records.borrow().get(id).cloned().into_iter().collect()),
                Query::Filter(_) => Ok(Vec::new()),
            }
        }
    }

    /// Implements only the write primitive.
    struct WriteOnly;

    impl Storage for WriteOnly {
        fn backend_name(&self) -> &str {
            "WriteOnly"
        }

        fn write_record(&self, _record: &mut Record) -> StorageResult<()> {
            Ok(())
        }
    }

    fn record(payload: &str) -> Record {
        Record::try_from(json!({"payload": payload})).unwrap()
    }

    fn quiet() {
        Logger::set_enabled(false);
    }

    #[test]
    fn test_single_write_returns_single_id() {
        quiet();
        let storage = MapStorage::default();
        let ids = storage.write(record("x").into(), false).unwrap();
        let expected = fingerprint(&record("x")).unwrap();
        assert_eq!(ids, Ids::Single(expected));
    }

    #[test]
    fn test_batch_write_preserves_order() {
        quiet();
        let storage = MapStorage::default();
        let ids = storage
            .write(vec![record("a"), record("b"), record("c")].into(), false)
            .unwrap()
            .into_vec();
        let written: Vec<String> = storage.writes.borrow().clone();
        let returned: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        assert_eq!(written, returned);
        assert_eq!(ids[1], fingerprint(&record("b")).unwrap());
    }

    #[test]
    fn test_batch_write_consumes_lazy_iterator() {
        quiet();
        let storage = MapStorage::default();
        let source = (0..3).map(|i| record(&format!("r{}", i)));
        let ids = storage.write(WriteInput::batch(source), true).unwrap();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_existing_id_is_kept() {
        quiet();
        let storage = MapStorage::default();
        let mut r = record("x");
        r.insert("id", "ffffffffffffffffffffffffffffffff");
        let ids = storage.write(r.into(), false).unwrap();
        assert_eq!(ids.as_slice()[0].as_str(), "ffffffffffffffffffffffffffffffff");
    }

    #[test]
    fn test_safe_write_passes_on_faithful_backend() {
        quiet();
        let storage = MapStorage::default();
        assert!(storage.write(vec![record("a"), record("b")].into(), true).is_ok());
    }

    #[test]
    fn test_safe_write_detects_corruption() {
        quiet();
        let storage = MapStorage {
            corrupt: true,
            ..Default::default()
        };
        let err = storage.write(record("x").into(), true).unwrap_err();
        assert_eq!(err.code(), "ARCHIVE_DATA_MISMATCH");
        // The write itself landed
        assert_eq!(storage.records.borrow().len(), 1);
    }

    #[test]
    fn test_unsafe_write_does_not_verify() {
        quiet();
        let storage = MapStorage {
            corrupt: true,
            ..Default::default()
        };
        assert!(storage.write(record("x").into(), false).is_ok());
    }

    #[test]
    fn test_safe_write_fails_when_backend_cannot_read() {
        quiet();
        let err = WriteOnly.write(record("x").into(), true).unwrap_err();
        assert!(matches!(err, StorageError::DataMismatch { .. }));
    }

    #[test]
    fn test_batch_read_skips_missing_and_keeps_order() {
        quiet();
        let storage = MapStorage::default();
        let ids = storage
            .write(vec![record("a"), record("b")].into(), false)
            .unwrap()
            .into_vec();
        let spec = ReadSpec::Batch(vec![
            Query::from(&ids[1]),
            Query::from("0123456789abcdef0123456789abcdef"),
            Query::from(&ids[0]),
        ]);
        let found = storage.read(spec).unwrap();
        let payloads: Vec<_> = found.iter().map(|r| r.get("payload").cloned()).collect();
        assert_eq!(payloads, vec![Some(json!("b")), Some(json!("a"))]);
    }

    #[test]
    fn test_single_read_may_be_empty() {
        quiet();
        let storage = MapStorage::default();
        assert!(storage.read(Query::from("nothing").into()).unwrap().is_empty());
    }

    #[test]
    fn test_default_read_is_empty() {
        assert!(WriteOnly.read_query(&Query::from("x")).unwrap().is_empty());
    }

    #[test]
    fn test_update_is_noop() {
        quiet();
        let storage = MapStorage::default();
        storage.write(record("x").into(), false).unwrap();
        let before = storage.records.borrow().clone();
        storage.update(&[], &json!({"payload": "y"})).unwrap();
        assert_eq!(*storage.records.borrow(), before);
    }

    #[test]
    fn test_check_through_trait() {
        quiet();
        let storage = MapStorage::default();
        let mut r = record("x");
        identity::assign(&mut r).unwrap();
        assert!(storage.check(&r).is_ok());
        r.insert("payload", "tampered");
        assert_eq!(storage.check(&r).unwrap_err().code(), "ARCHIVE_INTEGRITY_ERROR");
    }

    #[test]
    fn test_getids_shapes() {
        let mut a = record("a");
        let mut b = record("b");
        let id_a = identity::assign(&mut a).unwrap();
        let id_b = identity::assign(&mut b).unwrap();
        assert_eq!(getids(RecordsRef::Single(&a)).unwrap(), Ids::Single(id_a.clone()));
        let batch = [a, b];
        assert_eq!(getids(RecordsRef::Batch(&batch)).unwrap(), Ids::Many(vec![id_a, id_b]));
    }

    #[test]
    fn test_getids_requires_id() {
        let err = getids(RecordsRef::Single(&record("x"))).unwrap_err();
        assert!(matches!(err, StorageError::Integrity(IdentityError::MissingId)));
    }

    #[test]
    fn test_records_match_rules() {
        let a = Record::try_from(json!({"n": 3, "opt": null, "nested": {"f": 1.0}})).unwrap();
        let b = Record::try_from(json!({"opt": null, "n": 3.0, "nested": {"f": 1}})).unwrap();
        assert!(records_match(&a, &b));
        let c = Record::try_from(json!({"n": 4, "opt": null, "nested": {"f": 1}})).unwrap();
        assert!(!records_match(&a, &c));
    }

    #[test]
    fn test_records_match_requires_same_fields() {
        let a = Record::try_from(json!({"n": 3, "opt": null})).unwrap();
        let b = Record::try_from(json!({"n": 3})).unwrap();
        assert!(!records_match(&a, &b));
        assert!(!records_match(&b, &a));
        let nested_a = Record::try_from(json!({"o": {"x": null}})).unwrap();
        let nested_b = Record::try_from(json!({"o": {}})).unwrap();
        assert!(!records_match(&nested_a, &nested_b));
    }

    #[test]
    fn test_id_hashes_normalized_record() {
        quiet();
        let storage = MapStorage {
            fill_defaults: true,
            ..Default::default()
        };
        let ids = storage.write(record("x").into(), true).unwrap().into_vec();
        let stored = storage.read(ReadSpec::ids(&ids)).unwrap().remove(0);
        assert_eq!(stored.get("wall"), Some(&json!(0.0)));
        assert!(storage.check(&stored).is_ok());
        assert_ne!(ids[0], fingerprint(&record("x")).unwrap());
    }
}
