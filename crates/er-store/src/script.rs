//! Registry of the server-side scripts the registry runs atomically.
//!
//! Each [`AtomicScript`] pairs a stable name and version with its Lua body
//! and a fixed KEYS/ARGV contract. Call sites refer to scripts only through
//! this enum, so two nominally identical operations can never drift apart.
//! Backends execute the catalog either by sending the body (`EVAL`) or by
//! running the same semantics natively under one lock.
//!
//! | Script | KEYS | ARGV |
//! |---|---|---|
//! | `store_all` | dest, src1..srcN (N >= 1) | ttl |
//! | `store_any` | dest, src1..srcN (N >= 1) | ttl |
//! | `store_not` | dest, universe, ex1..exN (N >= 1) | ttl |
//! | `store_all_not` | dest, scratch, include, universe, ex1..exN (N >= 1) | ttl, scratch_ttl |
//! | `upsert_element` | record, universe, idx1..idxN (N >= 0) | name, flags_bin, expected_flags_bin, removed_count |
//!
//! The store scripts return the destination cardinality. `upsert_element`
//! returns 1 when applied and -1 when the record's `flags_bin` no longer
//! matches `expected_flags_bin` (empty meaning "absent").

use crate::error::{StoreError, StoreResult};
use crate::traits::validate_ttl;

/// Version of the script catalog. Bump when any body changes.
pub const SCRIPT_CATALOG_VERSION: u32 = 1;

/// Lifetime given to the `store_all_not` scratch key when the caller's
/// scratch TTL is missing or non-positive.
pub const DEFAULT_SCRATCH_TTL_SECS: i64 = 30;

/// Value returned by `upsert_element` when the record changed underneath.
pub const UPSERT_CONFLICT: i64 = -1;

/// Record hash field holding the element name.
pub const RECORD_NAME_FIELD: &str = "name";

/// Record hash field holding the 512-byte big-endian flags.
pub const RECORD_FLAGS_FIELD: &str = "flags_bin";

const STORE_ALL_LUA: &str = r#"
local ttl = tonumber(ARGV[1])
if not ttl or ttl <= 0 then
  return redis.error_reply('ERR ttl must be > 0')
end
local card = redis.call('SINTERSTORE', KEYS[1], unpack(KEYS, 2))
if card > 0 then
  redis.call('EXPIRE', KEYS[1], ttl)
end
return card
"#;

const STORE_ANY_LUA: &str = r#"
local ttl = tonumber(ARGV[1])
if not ttl or ttl <= 0 then
  return redis.error_reply('ERR ttl must be > 0')
end
local card = redis.call('SUNIONSTORE', KEYS[1], unpack(KEYS, 2))
if card > 0 then
  redis.call('EXPIRE', KEYS[1], ttl)
end
return card
"#;

const STORE_NOT_LUA: &str = r#"
local ttl = tonumber(ARGV[1])
if not ttl or ttl <= 0 then
  return redis.error_reply('ERR ttl must be > 0')
end
local card = redis.call('SDIFFSTORE', KEYS[1], unpack(KEYS, 2))
if card > 0 then
  redis.call('EXPIRE', KEYS[1], ttl)
end
return card
"#;

const STORE_ALL_NOT_LUA: &str = r#"
local ttl = tonumber(ARGV[1])
if not ttl or ttl <= 0 then
  return redis.error_reply('ERR ttl must be > 0')
end
local scratch_ttl = tonumber(ARGV[2])
if not scratch_ttl or scratch_ttl <= 0 then
  scratch_ttl = 30
end
redis.call('SDIFFSTORE', KEYS[2], KEYS[4], unpack(KEYS, 5))
redis.call('EXPIRE', KEYS[2], scratch_ttl)
local card = redis.call('SINTERSTORE', KEYS[1], KEYS[3], KEYS[2])
if card > 0 then
  redis.call('EXPIRE', KEYS[1], ttl)
end
redis.call('DEL', KEYS[2])
return card
"#;

const UPSERT_ELEMENT_LUA: &str = r#"
local current = redis.call('HGET', KEYS[1], 'flags_bin')
if not current then
  current = ''
end
if current ~= ARGV[3] then
  return -1
end
local removed = tonumber(ARGV[4])
for i = 3, 2 + removed do
  redis.call('SREM', KEYS[i], ARGV[1])
end
for i = 3 + removed, #KEYS do
  redis.call('SADD', KEYS[i], ARGV[1])
end
redis.call('HSET', KEYS[1], 'name', ARGV[1], 'flags_bin', ARGV[2])
redis.call('SADD', KEYS[2], ARGV[1])
return 1
"#;

/// A registered atomic script.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AtomicScript {
    StoreAll,
    StoreAny,
    StoreNot,
    StoreAllNot,
    UpsertElement,
}

impl AtomicScript {
    /// Every registered script.
    pub const ALL: [AtomicScript; 5] = [
        Self::StoreAll,
        Self::StoreAny,
        Self::StoreNot,
        Self::StoreAllNot,
        Self::UpsertElement,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::StoreAll => "store_all",
            Self::StoreAny => "store_any",
            Self::StoreNot => "store_not",
            Self::StoreAllNot => "store_all_not",
            Self::UpsertElement => "upsert_element",
        }
    }

    pub fn version(self) -> u32 {
        SCRIPT_CATALOG_VERSION
    }

    /// Lua source sent to the server.
    pub fn body(self) -> &'static str {
        match self {
            Self::StoreAll => STORE_ALL_LUA,
            Self::StoreAny => STORE_ANY_LUA,
            Self::StoreNot => STORE_NOT_LUA,
            Self::StoreAllNot => STORE_ALL_NOT_LUA,
            Self::UpsertElement => UPSERT_ELEMENT_LUA,
        }
    }

    /// Minimum number of KEYS.
    pub fn min_keys(self) -> usize {
        match self {
            Self::StoreAll | Self::StoreAny => 2,
            Self::StoreNot => 3,
            Self::StoreAllNot => 5,
            Self::UpsertElement => 2,
        }
    }

    /// Exact number of ARGV entries.
    pub fn arg_count(self) -> usize {
        match self {
            Self::StoreAll | Self::StoreAny | Self::StoreNot => 1,
            Self::StoreAllNot => 2,
            Self::UpsertElement => 4,
        }
    }

    /// Returns `true` for the store-with-expiry family.
    pub fn is_store(self) -> bool {
        !matches!(self, Self::UpsertElement)
    }

    /// Check an invocation against the contract before it is sent.
    pub fn validate(self, keys: &[String], args: &[Vec<u8>]) -> StoreResult<()> {
        if keys.len() < self.min_keys() {
            return Err(StoreError::InvalidArgument(format!(
                "{} requires at least {} keys, got {}",
                self.name(),
                self.min_keys(),
                keys.len()
            )));
        }
        if args.len() != self.arg_count() {
            return Err(StoreError::InvalidArgument(format!(
                "{} takes {} arguments, got {}",
                self.name(),
                self.arg_count(),
                args.len()
            )));
        }
        if self.is_store() {
            validate_ttl(int_arg(self, &args[0])?)?;
        } else {
            let removed = int_arg(self, &args[3])?;
            if removed < 0 || removed as usize > keys.len() - 2 {
                return Err(StoreError::InvalidArgument(format!(
                    "{}: removed_count {removed} out of range",
                    self.name()
                )));
            }
        }
        Ok(())
    }
}

/// Parse a decimal script argument.
pub(crate) fn int_arg(script: AtomicScript, raw: &[u8]) -> StoreResult<i64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            StoreError::InvalidArgument(format!(
                "{}: expected integer argument, got {:?}",
                script.name(),
                String::from_utf8_lossy(raw)
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use er_types::ErrorKind;

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("k{i}")).collect()
    }

    fn args(values: &[&str]) -> Vec<Vec<u8>> {
        values.iter().map(|v| v.as_bytes().to_vec()).collect()
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<&str> = AtomicScript::ALL.iter().map(|s| s.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), AtomicScript::ALL.len());
    }

    #[test]
    fn every_store_script_sets_expiry() {
        for script in AtomicScript::ALL.iter().filter(|s| s.is_store()) {
            assert!(script.body().contains("EXPIRE"), "{} lacks EXPIRE", script.name());
            assert_eq!(script.version(), SCRIPT_CATALOG_VERSION);
        }
    }

    #[test]
    fn upsert_body_uses_record_fields() {
        let body = AtomicScript::UpsertElement.body();
        assert!(body.contains(&format!("'{RECORD_NAME_FIELD}'")));
        assert!(body.contains(&format!("'{RECORD_FLAGS_FIELD}'")));
    }

    #[test]
    fn all_not_cleans_up_scratch() {
        let body = AtomicScript::StoreAllNot.body();
        assert!(body.contains("redis.call('DEL', KEYS[2])"));
        assert!(body.contains(&format!("scratch_ttl = {DEFAULT_SCRATCH_TTL_SECS}")));
    }

    #[test]
    fn validate_accepts_contract() {
        assert!(AtomicScript::StoreAll.validate(&keys(2), &args(&["10"])).is_ok());
        assert!(AtomicScript::StoreAllNot
            .validate(&keys(5), &args(&["10", "10"]))
            .is_ok());
        assert!(AtomicScript::UpsertElement
            .validate(&keys(4), &args(&["n", "", "", "2"]))
            .is_ok());
    }

    #[test]
    fn validate_rejects_short_keys_and_bad_ttl() {
        let err = AtomicScript::StoreAll.validate(&keys(1), &args(&["10"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = AtomicScript::StoreNot.validate(&keys(3), &args(&["0"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = AtomicScript::StoreAny.validate(&keys(3), &args(&["x"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn validate_rejects_removed_count_overflow() {
        let err = AtomicScript::UpsertElement
            .validate(&keys(3), &args(&["n", "", "", "2"]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
