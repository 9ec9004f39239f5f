use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::script::AtomicScript;

/// Server-side set algebra operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetOp {
    Intersect,
    Union,
    /// First key minus every following key.
    Diff,
}

impl SetOp {
    /// Read-only command name.
    pub fn command(self) -> &'static str {
        match self {
            Self::Intersect => "SINTER",
            Self::Union => "SUNION",
            Self::Diff => "SDIFF",
        }
    }

    /// Persisting command name.
    pub fn store_command(self) -> &'static str {
        match self {
            Self::Intersect => "SINTERSTORE",
            Self::Union => "SUNIONSTORE",
            Self::Diff => "SDIFFSTORE",
        }
    }
}

/// Remaining lifetime of a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "seconds", rename_all = "snake_case")]
pub enum KeyTtl {
    /// The key expires in this many seconds.
    Expires(i64),
    /// The key exists without an expiry.
    Persistent,
    /// The key does not exist (never created, deleted, or already expired).
    Missing,
}

impl KeyTtl {
    /// Interpret a raw `TTL` reply (`-2` missing, `-1` no expiry).
    pub fn from_reply(raw: i64) -> Self {
        match raw {
            -2 => Self::Missing,
            r if r < 0 => Self::Persistent,
            secs => Self::Expires(secs),
        }
    }

    pub fn seconds(self) -> Option<i64> {
        match self {
            Self::Expires(secs) => Some(secs),
            _ => None,
        }
    }
}

/// Reject non-positive TTLs before anything reaches the store.
pub fn validate_ttl(ttl_seconds: i64) -> StoreResult<()> {
    if ttl_seconds <= 0 {
        return Err(StoreError::InvalidArgument(format!(
            "ttl_seconds must be > 0, got {ttl_seconds}"
        )));
    }
    Ok(())
}

/// Reject empty key lists before anything reaches the store.
pub fn validate_keys(op: &str, keys: &[String]) -> StoreResult<()> {
    if keys.is_empty() {
        return Err(StoreError::InvalidArgument(format!(
            "{op} requires at least one key"
        )));
    }
    Ok(())
}

/// Synchronous command surface of the backing key-value/set store.
///
/// Methods take `&mut self`: one handle carries one command at a time and
/// has no internal lock, so concurrent callers use one handle each.
/// Expected failures come back as [`StoreError`]; empty key lists and
/// non-positive TTLs are rejected with `InvalidArgument` before any I/O.
pub trait SetStore: Send {
    /// Round-trip liveness check.
    fn ping(&mut self) -> StoreResult<()>;

    /// Set a hash field (binary safe). Returns the number of new fields.
    fn hash_set(&mut self, key: &str, field: &str, value: &[u8]) -> StoreResult<i64>;

    /// Read a hash field. `NotFound` if the key or field is absent.
    fn hash_get(&mut self, key: &str, field: &str) -> StoreResult<Vec<u8>>;

    /// Add a member. Returns 1 if it was newly added.
    fn set_add(&mut self, key: &str, member: &str) -> StoreResult<i64>;

    /// Remove a member. Returns 1 if it was present.
    fn set_remove(&mut self, key: &str, member: &str) -> StoreResult<i64>;

    /// All members of a set (empty for a missing key).
    fn set_members(&mut self, key: &str) -> StoreResult<Vec<String>>;

    /// Cardinality of a set (0 for a missing key).
    fn set_card(&mut self, key: &str) -> StoreResult<i64>;

    /// Compute set algebra without persisting the result.
    fn set_algebra(&mut self, op: SetOp, keys: &[String]) -> StoreResult<Vec<String>>;

    /// Compute set algebra into `dest`, returning its cardinality.
    fn set_algebra_store(&mut self, op: SetOp, dest: &str, keys: &[String]) -> StoreResult<i64>;

    /// Give an existing key a lifetime. `NotFound` if the key does not exist.
    fn expire(&mut self, key: &str, ttl_seconds: i64) -> StoreResult<()>;

    /// Remaining lifetime of a key.
    fn ttl(&mut self, key: &str) -> StoreResult<KeyTtl>;

    /// Execute one registered script as a single indivisible operation.
    fn run_atomic(
        &mut self,
        script: AtomicScript,
        keys: &[String],
        args: &[Vec<u8>],
    ) -> StoreResult<i64>;

    /// Delete a key. Returns the number of keys removed.
    fn delete(&mut self, key: &str) -> StoreResult<i64>;

    /// Set a text hash field.
    fn hash_set_str(&mut self, key: &str, field: &str, value: &str) -> StoreResult<i64> {
        self.hash_set(key, field, value.as_bytes())
    }

    /// Read a text hash field.
    fn hash_get_str(&mut self, key: &str, field: &str) -> StoreResult<String> {
        let raw = self.hash_get(key, field)?;
        String::from_utf8(raw)
            .map_err(|_| StoreError::reply_type("HGET", "UTF-8 text", "binary data"))
    }

    fn set_intersect(&mut self, keys: &[String]) -> StoreResult<Vec<String>> {
        self.set_algebra(SetOp::Intersect, keys)
    }

    fn set_union(&mut self, keys: &[String]) -> StoreResult<Vec<String>> {
        self.set_algebra(SetOp::Union, keys)
    }

    /// First key minus every following key.
    fn set_diff(&mut self, keys: &[String]) -> StoreResult<Vec<String>> {
        self.set_algebra(SetOp::Diff, keys)
    }

    fn set_intersect_store(&mut self, dest: &str, keys: &[String]) -> StoreResult<i64> {
        self.set_algebra_store(SetOp::Intersect, dest, keys)
    }

    fn set_union_store(&mut self, dest: &str, keys: &[String]) -> StoreResult<i64> {
        self.set_algebra_store(SetOp::Union, dest, keys)
    }

    fn set_diff_store(&mut self, dest: &str, keys: &[String]) -> StoreResult<i64> {
        self.set_algebra_store(SetOp::Diff, dest, keys)
    }
}
