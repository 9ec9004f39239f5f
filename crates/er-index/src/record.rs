//! Element record layout and flag loading.
//!
//! A record is a hash with `name` and `flags_bin` (512 raw bytes). Records
//! written by older deployments may carry only `flags_hex`; that field is
//! read as a fallback and never written.

use er_store::{SetStore, StoreError};
use er_types::BitVector;
use tracing::warn;

use crate::error::{IndexError, IndexResult};

pub use er_store::RECORD_FLAGS_FIELD as FLAGS_FIELD;
pub use er_store::RECORD_NAME_FIELD as NAME_FIELD;

/// Legacy hex-encoded flags field, read-only.
pub const LEGACY_HEX_FIELD: &str = "flags_hex";

/// Where a record's flags were read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagSource {
    Binary,
    LegacyHex,
    /// No flags field exists; the flags are all clear.
    Absent,
}

/// Flags as currently stored for one element.
#[derive(Clone, Debug)]
pub struct StoredFlags {
    pub flags: BitVector,
    pub source: FlagSource,
    raw_bin: Option<Vec<u8>>,
}

impl StoredFlags {
    fn absent() -> Self {
        Self {
            flags: BitVector::new(),
            source: FlagSource::Absent,
            raw_bin: None,
        }
    }

    pub fn exists(&self) -> bool {
        self.source != FlagSource::Absent
    }

    /// The exact `flags_bin` bytes seen, or empty if the field was absent.
    /// Atomic upserts compare against this.
    pub fn observed_bin(&self) -> &[u8] {
        self.raw_bin.as_deref().unwrap_or_default()
    }
}

/// Read a hash field, mapping "absent" to `None`.
fn optional_field<S: SetStore + ?Sized>(
    store: &mut S,
    key: &str,
    field: &str,
) -> IndexResult<Option<Vec<u8>>> {
    match store.hash_get(key, field) {
        Ok(v) => Ok(Some(v)),
        Err(StoreError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Load an element's flags: `flags_bin` first, then `flags_hex`, else clear.
///
/// A `flags_bin` of the wrong length falls back to `flags_hex`; when that is
/// missing or malformed too, the record is reported as corrupt.
pub fn load_flags<S: SetStore + ?Sized>(
    store: &mut S,
    record_key: &str,
    name: &str,
) -> IndexResult<StoredFlags> {
    let raw_bin = optional_field(store, record_key, FLAGS_FIELD)?;
    let decoded_bin = raw_bin.as_deref().map(BitVector::from_bytes_be);
    let bin_error = match decoded_bin {
        Some(Ok(flags)) => {
            return Ok(StoredFlags {
                flags,
                source: FlagSource::Binary,
                raw_bin,
            })
        }
        Some(Err(e)) => {
            warn!(element = name, error = %e, "flags_bin undecodable, trying flags_hex");
            Some(e.to_string())
        }
        None => None,
    };

    let Some(raw_hex) = optional_field(store, record_key, LEGACY_HEX_FIELD)? else {
        return match bin_error {
            Some(reason) => Err(IndexError::CorruptRecord {
                name: name.to_string(),
                reason,
            }),
            None => Ok(StoredFlags::absent()),
        };
    };
    let decoded = std::str::from_utf8(&raw_hex)
        .map_err(|_| "flags_hex is not text".to_string())
        .and_then(|s| BitVector::from_hex(s).map_err(|e| e.to_string()));
    match decoded {
        Ok(flags) => Ok(StoredFlags {
            flags,
            source: FlagSource::LegacyHex,
            raw_bin,
        }),
        Err(reason) => Err(IndexError::CorruptRecord {
            name: name.to_string(),
            reason,
        }),
    }
}

/// Write the canonical record fields.
pub fn write_record<S: SetStore + ?Sized>(
    store: &mut S,
    record_key: &str,
    name: &str,
    flags: &BitVector,
) -> IndexResult<()> {
    store.hash_set_str(record_key, NAME_FIELD, name)?;
    store.hash_set(record_key, FLAGS_FIELD, &flags.to_bytes_be())?;
    Ok(())
}
