//! Identity types for Encore records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Prefix reserved for locally generated identifiers.
///
/// The remote store never hands out identifiers starting with this prefix,
/// so a record carrying one is always a pending, unconfirmed record.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Identifier of the user that owns a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(Uuid);

impl OwnerId {
    /// Generate a new UUIDv7 owner id (timestamp-sortable).
    pub fn new_v7() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a record in a collection.
///
/// A record is either still pending with a locally generated token, or it
/// carries the identifier the remote store assigned when it persisted it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordId {
    /// Session-local placeholder, rendered as `temp-N`.
    Temporary(u64),
    /// Identifier assigned by the remote store.
    Remote(String),
}

impl RecordId {
    /// Build an identifier from a value returned by the remote store.
    ///
    /// Anything using the reserved `temp-N` shape parses as temporary, which
    /// lets callers reject it as an invalid remote response.
    pub fn remote(id: impl Into<String>) -> Self {
        let id = id.into();
        match parse_temporary(&id) {
            Some(n) => Self::Temporary(n),
            None => Self::Remote(id),
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

fn parse_temporary(raw: &str) -> Option<u64> {
    let digits = raw.strip_prefix(TEMP_ID_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temporary(n) => write!(f, "{}{}", TEMP_ID_PREFIX, n),
            Self::Remote(id) => f.write_str(id),
        }
    }
}

impl FromStr for RecordId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::remote(s))
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::remote(s)
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::remote(raw))
    }
}

/// Monotonic source of temporary identifiers for one session.
#[derive(Debug)]
pub struct TempIdGenerator {
    next: AtomicU64,
}

impl TempIdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Hand out the next unused temporary identifier.
    pub fn next_id(&self) -> RecordId {
        RecordId::Temporary(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TempIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
