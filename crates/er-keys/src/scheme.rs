use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use er_types::Bit;

use crate::error::{KeyError, Result};

/// Namespace used when none is configured.
pub const DEFAULT_PREFIX: &str = "er";

/// Normalize and validate a namespace prefix.
///
/// Surrounding `:` separators are trimmed, so `"er:"` and `"er"` name the
/// same namespace. The remainder must be non-empty and free of whitespace.
pub fn validate_prefix(prefix: &str) -> Result<String> {
    let trimmed = prefix.trim_matches(':');
    if trimmed.is_empty() {
        return Err(KeyError::InvalidPrefix {
            prefix: prefix.to_string(),
            reason: "prefix must not be empty".into(),
        });
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(KeyError::InvalidPrefix {
            prefix: prefix.to_string(),
            reason: "prefix must not contain whitespace".into(),
        });
    }
    Ok(trimmed.to_string())
}

/// Universe set of all known element names.
pub fn universe(prefix: &str) -> String {
    format!("{prefix}:all")
}

/// Record key for one element.
pub fn element(name: &str, prefix: &str) -> String {
    format!("{prefix}:element:{name}")
}

/// Inverted index for one bit position.
pub fn index_bit(bit: Bit, prefix: &str) -> String {
    format!("{prefix}:idx:bit:{bit}")
}

fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty() {
        return Err(KeyError::InvalidTag {
            tag: tag.to_string(),
            reason: "tag must not be empty".into(),
        });
    }
    if tag.contains(':') || tag.chars().any(char::is_whitespace) {
        return Err(KeyError::InvalidTag {
            tag: tag.to_string(),
            reason: "tag must not contain ':' or whitespace".into(),
        });
    }
    Ok(())
}

/// Process-wide counter appended to every temporary key, so schemes in one
/// process never collide even with equal stamps and nonces.
static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Prefix-bound key factory.
///
/// The pure key functions only need the prefix. Temporary keys additionally
/// need a stamp that never repeats: each call takes
/// `max(wall_clock_ns, last + 1)`, so stamps from one scheme are strictly
/// increasing even when the wall clock stalls or steps backwards. A
/// process-wide sequence number keeps schemes of one process apart, and a
/// random per-scheme nonce keeps two processes that hit the same nanosecond
/// apart.
pub struct KeyScheme {
    prefix: String,
    last_stamp: Mutex<u128>,
    nonce: u32,
}

impl KeyScheme {
    /// Create a scheme for a (validated, normalized) prefix.
    pub fn new(prefix: &str) -> Result<Self> {
        Ok(Self {
            prefix: validate_prefix(prefix)?,
            last_stamp: Mutex::new(0),
            nonce: rand::random(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn universe(&self) -> String {
        universe(&self.prefix)
    }

    pub fn element(&self, name: &str) -> String {
        element(name, &self.prefix)
    }

    pub fn index_bit(&self, bit: Bit) -> String {
        index_bit(bit, &self.prefix)
    }

    /// Index keys for a list of bits, in the given order.
    pub fn index_bits(&self, bits: &[Bit]) -> Vec<String> {
        bits.iter().map(|b| self.index_bit(*b)).collect()
    }

    /// Namespace every temporary key lives under, including the trailing `:`.
    pub fn temp_namespace(&self) -> String {
        format!("{}:tmp:", self.prefix)
    }

    /// A fresh temporary key: `{prefix}:tmp:{tag}:{stamp}:{nonce}:{seq}`.
    /// No two calls in one process return the same key.
    pub fn temp(&self, tag: &str) -> Result<String> {
        validate_tag(tag)?;
        let stamp = self.next_stamp();
        let seq = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Ok(format!(
            "{}{tag}:{stamp}:{:08x}:{seq}",
            self.temp_namespace(),
            self.nonce
        ))
    }

    /// Returns `true` if `key` is a temporary key of this namespace.
    pub fn is_temp(&self, key: &str) -> bool {
        key.strip_prefix(&self.temp_namespace())
            .is_some_and(|rest| !rest.is_empty())
    }

    fn next_stamp(&self) -> u128 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let mut last = self.last_stamp.lock().expect("key clock mutex poisoned");
        let stamp = wall.max(*last + 1);
        *last = stamp;
        stamp
    }
}

impl Default for KeyScheme {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            last_stamp: Mutex::new(0),
            nonce: rand::random(),
        }
    }
}

impl std::fmt::Debug for KeyScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyScheme")
            .field("prefix", &self.prefix)
            .finish()
    }
}
