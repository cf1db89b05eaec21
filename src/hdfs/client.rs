//! # Filesystem client
//!
//! The narrow interface the HDFS adapter needs from a distributed
//! filesystem: whole-file load and dump, existence checks and directory
//! creation. There is no append, no random access and no in-place update.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

/// Result type for filesystem operations
pub type FsResult<T> = Result<T, FsError>;

/// Filesystem client errors
#[derive(Debug, Error)]
pub enum FsError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    fn from_io(path: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            FsError::NotFound(path.to_string())
        } else {
            FsError::Io {
                path: path.to_string(),
                source,
            }
        }
    }
}

/// Client of a filesystem-like storage backend.
///
/// Paths are `/`-separated strings, as on HDFS.
pub trait FileSystem: Send + Sync + Debug {
    /// Check if a file or directory exists
    fn exists(&self, path: &str) -> FsResult<bool>;

    /// Check if path is a directory
    fn is_dir(&self, path: &str) -> FsResult<bool>;

    /// Create a directory and any missing parents
    fn mkdir(&self, path: &str) -> FsResult<()>;

    /// Read the full content of a file
    fn load(&self, path: &str) -> FsResult<Vec<u8>>;

    /// Replace the full content of a file
    fn dump(&self, path: &str, data: &[u8]) -> FsResult<()>;
}

impl<F: FileSystem + ?Sized> FileSystem for Arc<F> {
    fn exists(&self, path: &str) -> FsResult<bool> {
        (**self).exists(path)
    }

    fn is_dir(&self, path: &str) -> FsResult<bool> {
        (**self).is_dir(path)
    }

    fn mkdir(&self, path: &str) -> FsResult<()> {
        (**self).mkdir(path)
    }

    fn load(&self, path: &str) -> FsResult<Vec<u8>> {
        (**self).load(path)
    }

    fn dump(&self, path: &str, data: &[u8]) -> FsResult<()> {
        (**self).dump(path, data)
    }
}

/// Local filesystem client.
///
/// Backend paths are resolved under `root`, which is how a mounted HDFS
/// gateway (or a test directory) is addressed.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    root: PathBuf,
}

impl LocalFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> FsResult<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(FsError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &str) -> FsResult<bool> {
        Ok(self.full_path(path)?.exists())
    }

    fn is_dir(&self, path: &str) -> FsResult<bool> {
        Ok(self.full_path(path)?.is_dir())
    }

    fn mkdir(&self, path: &str) -> FsResult<()> {
        fs::create_dir_all(self.full_path(path)?).map_err(|e| FsError::from_io(path, e))
    }

    fn load(&self, path: &str) -> FsResult<Vec<u8>> {
        fs::read(self.full_path(path)?).map_err(|e| FsError::from_io(path, e))
    }

    fn dump(&self, path: &str, data: &[u8]) -> FsResult<()> {
        let full_path = self.full_path(path)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(|e| FsError::from_io(path, e))?;
        }

        fs::write(&full_path, data).map_err(|e| FsError::from_io(path, e))
    }
}

/// In-process filesystem client, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
    dirs: RwLock<BTreeSet<String>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of all stored files, sorted
    pub fn files(&self) -> Vec<String> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        files.keys().cloned().collect()
    }

    fn normalize(path: &str) -> String {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &str) -> FsResult<bool> {
        let path = Self::normalize(path);
        let is_file = {
            let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
            files.contains_key(&path)
        };
        Ok(is_file || self.is_dir(&path)?)
    }

    fn is_dir(&self, path: &str) -> FsResult<bool> {
        let path = Self::normalize(path);
        let dirs = self.dirs.read().unwrap_or_else(PoisonError::into_inner);
        if dirs.contains(&path) {
            return Ok(true);
        }
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        Ok(files.keys().any(|f| f.starts_with(&prefix)))
    }

    fn mkdir(&self, path: &str) -> FsResult<()> {
        let path = Self::normalize(path);
        let mut dirs = self.dirs.write().unwrap_or_else(PoisonError::into_inner);
        let mut current = path.as_str();
        loop {
            dirs.insert(current.to_string());
            match current.rsplit_once('/') {
                Some((parent, _)) if !parent.is_empty() => current = parent,
                _ => break,
            }
        }
        Ok(())
    }

    fn load(&self, path: &str) -> FsResult<Vec<u8>> {
        let path = Self::normalize(path);
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        files.get(&path).cloned().ok_or(FsError::NotFound(path))
    }

    fn dump(&self, path: &str, data: &[u8]) -> FsResult<()> {
        let path = Self::normalize(path);
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        files.insert(path, data.to_vec());
        Ok(())
    }
}
