//! Content fingerprints
//!
//! A fingerprint is the lowercase hex MD5 digest of a record's canonical JSON
//! text, computed with the reserved `id` and `status` fields left out. Key
//! order in the record never affects the result.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::canonical::canonical_json;
use super::errors::{IdentityError, IdentityResult};
use crate::record::{Record, ID_FIELD, STATUS_FIELD};

/// Fields that never contribute to a fingerprint
pub const UNHASHED_FIELDS: [&str; 2] = [ID_FIELD, STATUS_FIELD];

/// Length of a fingerprint in characters
pub const FINGERPRINT_LEN: usize = 32;

static FINGERPRINT_PATTERN: OnceLock<Regex> = OnceLock::new();

fn pattern() -> &'static Regex {
    FINGERPRINT_PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]{32}$").expect("fingerprint pattern is a valid regex")
    })
}

/// Returns true if the token has the shape of a fingerprint.
pub fn is_fingerprint(token: &str) -> bool {
    pattern().is_match(token)
}

/// A validated record fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parses a token, rejecting anything that is not 32 lowercase
    /// alphanumeric characters.
    pub fn parse(token: &str) -> IdentityResult<Self> {
        if is_fingerprint(token) {
            Ok(Self(token.to_string()))
        } else {
            Err(IdentityError::MalformedId(token.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_fingerprint(&value) {
            Ok(Self(value))
        } else {
            Err(IdentityError::MalformedId(value))
        }
    }
}

impl From<Fingerprint> for String {
    fn from(id: Fingerprint) -> Self {
        id.0
    }
}

impl std::str::FromStr for Fingerprint {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Computes the fingerprint of a record.
pub fn fingerprint(record: &Record) -> IdentityResult<Fingerprint> {
    let hashed: Map<String, Value> = record
        .fields()
        .iter()
        .filter(|(key, _)| !UNHASHED_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let text = canonical_json(&Value::Object(hashed)).map_err(IdentityError::Canonical)?;
    Ok(Fingerprint(format!("{:x}", md5::compute(text.as_bytes()))))
}

/// Ensures the record carries an `id`.
///
/// A record without `id` gets its fingerprint attached. A record that already
/// has one keeps it, provided it is a well-formed fingerprint.
pub fn assign(record: &mut Record) -> IdentityResult<Fingerprint> {
    match record.get(ID_FIELD) {
        None | Some(Value::Null) => {
            let id = fingerprint(record)?;
            record.insert(ID_FIELD, id.as_str());
            Ok(id)
        }
        Some(Value::String(token)) => Fingerprint::parse(token),
        Some(other) => Err(IdentityError::MalformedId(other.to_string())),
    }
}

/// Cross-checks a record against its stored `id`.
///
/// A record with no `id` always fails: the empty string never matches a
/// digest.
pub fn check(record: &Record) -> IdentityResult<()> {
    let stored = record.id().unwrap_or_default();
    let computed = fingerprint(record)?;
    if computed.as_str() != stored {
        return Err(IdentityError::Mismatch {
            stored: stored.to_string(),
            computed: computed.into_string(),
        });
    }
    Ok(())
}
