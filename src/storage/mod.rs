//! Storage interface
//!
//! The abstract contract every archive backend fulfils. A backend only
//! implements a single-record write and a single-query read; bulk writes,
//! bulk reads, safe-write verification and integrity checks are shared.
//!
//! # Guarantees
//!
//! - Bulk operations run strictly in input order, one record at a time
//! - A missing record is represented as absence, never as an error
//! - A safe write that fails verification has still landed on the backend
//! - Stored records are never updated in place

mod errors;
mod interface;

pub use errors::{StorageError, StorageResult};
pub use interface::{getids, records_match, Storage};
