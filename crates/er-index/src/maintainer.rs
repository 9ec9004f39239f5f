//! Upsert, get and delete of element records with their bit indexes.
//!
//! An upsert only touches the indexes of bits that changed between the
//! stored flags and the new ones, so its cost follows the size of the
//! change rather than the width of the vector.

use er_keys::KeyScheme;
use er_store::{AtomicScript, SetStore, UPSERT_CONFLICT};
use er_types::{validate_name, Bit, BitVector, ElementView};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::delta::FlagDelta;
use crate::error::{IndexError, IndexResult};
use crate::record::{load_flags, write_record, StoredFlags};

/// How an upsert applies its writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertMode {
    /// Independent commands: index deltas, record, universe. A concurrent
    /// reader may see the indexes updated before the record.
    #[default]
    Sequential,
    /// One script applies the whole delta, and only if the record still
    /// holds the flags the delta was computed from.
    Atomic,
}

/// Outcome of an upsert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertReport {
    pub name: String,
    /// Number of bits set in the stored flags.
    pub written_bits: usize,
    /// Indexes the name was added to.
    pub added: usize,
    /// Indexes the name was removed from.
    pub removed: usize,
}

/// How a delete cleaned up the bit indexes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexScrub {
    /// Removed from the indexes of the stored flags.
    Stored,
    /// Flags were unreadable; removed from every possible index.
    Forced,
    /// Flags were unreadable and force was off; indexes untouched.
    Skipped,
}

/// Outcome of a delete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReport {
    pub name: String,
    pub scrub: IndexScrub,
    /// Index sets that actually contained the name.
    pub unindexed: usize,
    pub record_deleted: bool,
}

impl DeleteReport {
    /// Returns `true` if index entries may have been left behind.
    pub fn needs_force(&self) -> bool {
        self.scrub == IndexScrub::Skipped
    }
}

/// Keeps element records, bit indexes and the universe set in step.
///
/// Borrows one store handle for its lifetime; concurrent writers each use
/// their own handle and maintainer.
pub struct IndexMaintainer<'a, S: SetStore + ?Sized> {
    store: &'a mut S,
    keys: &'a KeyScheme,
    mode: UpsertMode,
}

impl<'a, S: SetStore + ?Sized> IndexMaintainer<'a, S> {
    pub fn new(store: &'a mut S, keys: &'a KeyScheme) -> Self {
        Self {
            store,
            keys,
            mode: UpsertMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: UpsertMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> UpsertMode {
        self.mode
    }

    // ---------------------------------------------------------------
    // Upsert
    // ---------------------------------------------------------------

    /// Store `name` with exactly the given bits set.
    ///
    /// Every position is validated before the first store command, so an
    /// out-of-range bit leaves the store untouched.
    pub fn upsert(&mut self, name: &str, bits: &[usize]) -> IndexResult<UpsertReport> {
        validate_name(name)?;
        let new_flags = BitVector::from_bits(bits.iter().copied())?;
        let record = self.keys.element(name);

        let old = load_flags(&mut *self.store, &record, name)?;
        let delta = FlagDelta::between(&old.flags, &new_flags);
        debug!(
            element = name,
            removed = delta.removed.len(),
            added = delta.added.len(),
            mode = ?self.mode,
            "index delta"
        );

        match self.mode {
            UpsertMode::Sequential => self.apply_sequential(name, &record, &new_flags, &delta)?,
            UpsertMode::Atomic => self.apply_atomic(name, &record, &new_flags, &delta, &old)?,
        }

        Ok(UpsertReport {
            name: name.to_string(),
            written_bits: new_flags.count_ones(),
            added: delta.added.len(),
            removed: delta.removed.len(),
        })
    }

    fn apply_sequential(
        &mut self,
        name: &str,
        record: &str,
        flags: &BitVector,
        delta: &FlagDelta,
    ) -> IndexResult<()> {
        for bit in &delta.removed {
            self.store.set_remove(&self.keys.index_bit(*bit), name)?;
        }
        for bit in &delta.added {
            self.store.set_add(&self.keys.index_bit(*bit), name)?;
        }
        write_record(&mut *self.store, record, name, flags)?;
        self.store.set_add(&self.keys.universe(), name)?;
        Ok(())
    }

    fn apply_atomic(
        &mut self,
        name: &str,
        record: &str,
        flags: &BitVector,
        delta: &FlagDelta,
        old: &StoredFlags,
    ) -> IndexResult<()> {
        let mut keys = Vec::with_capacity(2 + delta.len());
        keys.push(record.to_string());
        keys.push(self.keys.universe());
        keys.extend(self.keys.index_bits(&delta.removed));
        keys.extend(self.keys.index_bits(&delta.added));
        let args = vec![
            name.as_bytes().to_vec(),
            flags.to_bytes_be().to_vec(),
            old.observed_bin().to_vec(),
            delta.removed.len().to_string().into_bytes(),
        ];
        match self.store.run_atomic(AtomicScript::UpsertElement, &keys, &args)? {
            UPSERT_CONFLICT => Err(IndexError::Conflict(name.to_string())),
            _ => Ok(()),
        }
    }

    // ---------------------------------------------------------------
    // Read
    // ---------------------------------------------------------------

    /// Current flags of `name`, or `NotFound` if it has no flags field.
    pub fn load(&mut self, name: &str) -> IndexResult<BitVector> {
        validate_name(name)?;
        let stored = load_flags(&mut *self.store, &self.keys.element(name), name)?;
        if !stored.exists() {
            return Err(IndexError::NotFound(name.to_string()));
        }
        Ok(stored.flags)
    }

    /// Set bits of `name`, ascending and truncated to `limit`.
    pub fn get(&mut self, name: &str, limit: usize) -> IndexResult<ElementView> {
        let flags = self.load(name)?;
        let mut bits = flags.set_bits();
        let count = bits.len();
        bits.truncate(limit);
        Ok(ElementView {
            name: name.to_string(),
            bits,
            count,
        })
    }

    // ---------------------------------------------------------------
    // Delete
    // ---------------------------------------------------------------

    /// Remove `name` from its indexes, the universe, and delete its record.
    ///
    /// When the stored flags cannot be read, `force` scrubs all 4096 index
    /// sets; without it the indexes are left alone and the report says so.
    pub fn delete(&mut self, name: &str, force: bool) -> IndexResult<DeleteReport> {
        validate_name(name)?;
        let record = self.keys.element(name);

        let stored = match load_flags(&mut *self.store, &record, name) {
            Ok(stored) if stored.exists() => Some(stored.flags),
            Ok(_) => None,
            Err(IndexError::CorruptRecord { reason, .. }) => {
                warn!(element = name, reason = %reason, "record flags unreadable");
                None
            }
            Err(e) => return Err(e),
        };

        let (scrub, targets): (IndexScrub, Vec<Bit>) = match (stored, force) {
            (Some(flags), _) => (IndexScrub::Stored, flags.set_bits()),
            (None, true) => (IndexScrub::Forced, Bit::all().collect()),
            (None, false) => {
                warn!(
                    element = name,
                    "flags unavailable; index sets not scrubbed (use force to scrub all)"
                );
                (IndexScrub::Skipped, Vec::new())
            }
        };

        let mut unindexed = 0;
        for bit in targets {
            unindexed += self.store.set_remove(&self.keys.index_bit(bit), name)? as usize;
        }
        self.store.set_remove(&self.keys.universe(), name)?;
        let record_deleted = self.store.delete(&record)? > 0;
        debug!(element = name, ?scrub, unindexed, record_deleted, "element deleted");

        Ok(DeleteReport {
            name: name.to_string(),
            scrub,
            unindexed,
            record_deleted,
        })
    }
}

impl<S: SetStore + ?Sized> std::fmt::Debug for IndexMaintainer<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexMaintainer")
            .field("prefix", &self.keys.prefix())
            .field("mode", &self.mode)
            .finish()
    }
}
