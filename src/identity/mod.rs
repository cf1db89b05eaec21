//! Identity & hashing
//!
//! Every record is keyed by a deterministic fingerprint of its content. The
//! same fingerprint names the record's file on the backend and serves as the
//! integrity token checked by [`check`].

mod canonical;
mod errors;
mod fingerprint;

pub use canonical::canonical_json;
pub use errors::{IdentityError, IdentityResult};
pub use fingerprint::{
    assign, check, fingerprint, is_fingerprint, Fingerprint, FINGERPRINT_LEN, UNHASHED_FIELDS,
};
