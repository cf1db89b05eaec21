//! Backend path layout
//!
//! ```text
//! {root}/
//! ├── job.avsc                 schema, defines the root
//! ├── {fingerprint}.avro       one record per file
//! └── {fingerprint}.avro.gz    compressed variant
//! ```
//!
//! A record's location is derived from its id alone.

use crate::codec::Compression;
use crate::identity::Fingerprint;

/// Serialization format extension of record files
pub const FORMAT_EXTENSION: &str = "avro";

/// Returns the backend path of a record file.
pub fn file_name(root: &str, id: &Fingerprint, compression: Compression) -> String {
    format!(
        "{}/{}.{}{}",
        root.trim_end_matches('/'),
        id,
        FORMAT_EXTENSION,
        compression.extension()
    )
}

/// Returns the parent directory of a backend path.
///
/// A file directly under `/` has `/` as its parent. `None` means the path
/// has no file component.
pub fn parent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some(("", name)) if !name.is_empty() => Some("/"),
        Some((dir, name)) if !name.is_empty() => Some(dir),
        None if !trimmed.is_empty() => Some("."),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> Fingerprint {
        Fingerprint::parse("0123456789abcdef0123456789abcdef").unwrap()
    }

    #[test]
    fn test_file_name_uncompressed() {
        assert_eq!(
            file_name("/archive/jobs", &id(), Compression::None),
            "/archive/jobs/0123456789abcdef0123456789abcdef.avro"
        );
    }

    #[test]
    fn test_file_name_compressed() {
        assert_eq!(
            file_name("/archive/jobs/", &id(), Compression::Gzip),
            "/archive/jobs/0123456789abcdef0123456789abcdef.avro.gz"
        );
        assert!(file_name("/a", &id(), Compression::Zstd).ends_with(".avro.zst"));
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent("/archive/jobs/job.avsc"), Some("/archive/jobs"));
        assert_eq!(parent("/job.avsc"), Some("/"));
        assert_eq!(parent("job.avsc"), Some("."));
        assert_eq!(parent("/"), None);
        assert_eq!(parent(""), None);
    }
}
