//! Distributed-filesystem backend
//!
//! - `client`: the filesystem operations the backend relies on
//! - `layout`: where each record file lives
//! - `adapter`: the storage contract over a filesystem client

mod adapter;
mod client;
pub mod layout;

pub use adapter::{HdfsOptions, HdfsStorage, OverwritePolicy, STATUS_TAG};
pub use client::{FileSystem, FsError, FsResult, LocalFileSystem, MemoryFileSystem};
