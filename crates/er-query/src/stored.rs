//! Stored results: set algebra persisted under a fresh temporary key with
//! an expiry, each variant one atomic script execution.

use er_store::{validate_ttl, AtomicScript, KeyTtl, SetStore};
use er_types::Bit;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::{index_keys, require, QueryEngine};
use crate::error::{QueryError, QueryResult};

/// Handle to a stored, expiring result set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResult {
    pub dest_key: String,
    pub ttl_seconds: i64,
    /// Members in the result. When zero, no key was created.
    pub cardinality: i64,
}

/// A stored result as read back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    pub dest_key: String,
    /// Total members.
    pub count: i64,
    /// Members sorted ascending, truncated to the requested limit.
    pub members: Vec<String>,
    pub ttl_remaining: KeyTtl,
}

impl<S: SetStore + ?Sized> QueryEngine<'_, S> {
    /// Persist the elements having every listed bit.
    pub fn store_all(&mut self, ttl_seconds: i64, bits: &[usize]) -> QueryResult<StoredResult> {
        require("store_all bits", bits.len(), 1)?;
        let sources = index_keys(self.keys, bits)?;
        self.run_store(AtomicScript::StoreAll, "all", ttl_seconds, sources, Vec::new())
    }

    /// Persist the elements having at least one listed bit.
    pub fn store_any(&mut self, ttl_seconds: i64, bits: &[usize]) -> QueryResult<StoredResult> {
        require("store_any bits", bits.len(), 1)?;
        let sources = index_keys(self.keys, bits)?;
        self.run_store(AtomicScript::StoreAny, "any", ttl_seconds, sources, Vec::new())
    }

    /// Persist the known elements having none of `excludes`.
    pub fn store_not(&mut self, ttl_seconds: i64, excludes: &[usize]) -> QueryResult<StoredResult> {
        require("store_not excludes", excludes.len(), 1)?;
        let mut sources = vec![self.keys.universe()];
        sources.extend(index_keys(self.keys, excludes)?);
        self.run_store(AtomicScript::StoreNot, "not", ttl_seconds, sources, Vec::new())
    }

    /// Persist the elements having `include` and none of `excludes`, via a
    /// scratch key that the same script creates, bounds and deletes.
    pub fn store_all_not(
        &mut self,
        ttl_seconds: i64,
        include: usize,
        excludes: &[usize],
    ) -> QueryResult<StoredResult> {
        require("store_all_not excludes", excludes.len(), 1)?;
        validate_ttl(ttl_seconds)?;
        let include_key = self.keys.index_bit(Bit::new(include)?);
        let exclude_keys = index_keys(self.keys, excludes)?;

        let scratch = self.keys.temp("scratch")?;
        let mut sources = vec![scratch, include_key, self.keys.universe()];
        sources.extend(exclude_keys);
        let extra = vec![ttl_seconds.to_string().into_bytes()];
        self.run_store(AtomicScript::StoreAllNot, "allnot", ttl_seconds, sources, extra)
    }

    /// KEYS = fresh destination + `sources`; ARGV = ttl + `extra_args`.
    fn run_store(
        &mut self,
        script: AtomicScript,
        tag: &str,
        ttl_seconds: i64,
        sources: Vec<String>,
        extra_args: Vec<Vec<u8>>,
    ) -> QueryResult<StoredResult> {
        validate_ttl(ttl_seconds)?;
        let dest_key = self.keys.temp(tag)?;
        let mut keys = Vec::with_capacity(1 + sources.len());
        keys.push(dest_key.clone());
        keys.extend(sources);
        let mut args = vec![ttl_seconds.to_string().into_bytes()];
        args.extend(extra_args);

        let cardinality = self.store.run_atomic(script, &keys, &args)?;
        info!(script = script.name(), dest = %dest_key, cardinality, ttl_seconds, "stored result");
        Ok(StoredResult {
            dest_key,
            ttl_seconds,
            cardinality,
        })
    }

    fn check_temp(&self, dest_key: &str) -> QueryResult<()> {
        if !self.keys.is_temp(dest_key) {
            return Err(QueryError::InvalidArgument(format!(
                "{dest_key:?} is not a stored result key (expected prefix {:?})",
                self.keys.temp_namespace()
            )));
        }
        Ok(())
    }

    /// Read back a stored result.
    pub fn inspect(&mut self, dest_key: &str, limit: usize) -> QueryResult<Inspection> {
        self.check_temp(dest_key)?;
        let mut members = self.store.set_members(dest_key)?;
        members.sort_unstable();
        let count = members.len() as i64;
        members.truncate(limit);
        let ttl_remaining = self.store.ttl(dest_key)?;
        Ok(Inspection {
            dest_key: dest_key.to_string(),
            count,
            members,
            ttl_remaining,
        })
    }

    /// Delete a stored result before it expires. Returns the keys removed.
    pub fn delete_stored(&mut self, dest_key: &str) -> QueryResult<i64> {
        self.check_temp(dest_key)?;
        Ok(self.store.delete(dest_key)?)
    }
}
