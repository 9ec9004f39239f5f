//! Live queries: computed on every call, nothing persisted.

use std::collections::HashSet;

use er_keys::KeyScheme;
use er_store::SetStore;
use er_types::Bit;
use tracing::debug;

use crate::error::{QueryError, QueryResult};

/// Set-algebra queries over the bit indexes.
///
/// Results are member names sorted ascending. Every bit is range-checked
/// and every minimum input count enforced before the store is contacted.
pub struct QueryEngine<'a, S: SetStore + ?Sized> {
    pub(crate) store: &'a mut S,
    pub(crate) keys: &'a KeyScheme,
}

/// Validate positions and map them to index keys.
pub(crate) fn index_keys(keys: &KeyScheme, bits: &[usize]) -> QueryResult<Vec<String>> {
    bits.iter()
        .map(|&b| Ok(keys.index_bit(Bit::new(b)?)))
        .collect()
}

pub(crate) fn require(what: &str, got: usize, min: usize) -> QueryResult<()> {
    if got < min {
        return Err(QueryError::InvalidArgument(format!(
            "{what} needs at least {min}, got {got}"
        )));
    }
    Ok(())
}

fn sorted(mut names: Vec<String>) -> Vec<String> {
    names.sort_unstable();
    names
}

impl<'a, S: SetStore + ?Sized> QueryEngine<'a, S> {
    pub fn new(store: &'a mut S, keys: &'a KeyScheme) -> Self {
        Self { store, keys }
    }

    /// Members of one bit index.
    pub fn find(&mut self, bit: usize) -> QueryResult<Vec<String>> {
        let key = self.keys.index_bit(Bit::new(bit)?);
        Ok(sorted(self.store.set_members(&key)?))
    }

    /// Elements having every listed bit.
    pub fn find_all(&mut self, bits: &[usize]) -> QueryResult<Vec<String>> {
        require("find_all bits", bits.len(), 1)?;
        let keys = index_keys(self.keys, bits)?;
        Ok(sorted(self.store.set_intersect(&keys)?))
    }

    /// Elements having at least one listed bit.
    pub fn find_any(&mut self, bits: &[usize]) -> QueryResult<Vec<String>> {
        require("find_any bits", bits.len(), 1)?;
        let keys = index_keys(self.keys, bits)?;
        Ok(sorted(self.store.set_union(&keys)?))
    }

    /// Elements having `include` and none of `excludes`.
    pub fn find_not(&mut self, include: usize, excludes: &[usize]) -> QueryResult<Vec<String>> {
        require("find_not excludes", excludes.len(), 1)?;
        let mut keys = index_keys(self.keys, &[include])?;
        keys.extend(index_keys(self.keys, excludes)?);
        Ok(sorted(self.store.set_diff(&keys)?))
    }

    /// Known elements having none of `excludes`.
    pub fn universe_not(&mut self, excludes: &[usize]) -> QueryResult<Vec<String>> {
        require("universe_not excludes", excludes.len(), 1)?;
        let mut keys = vec![self.keys.universe()];
        keys.extend(index_keys(self.keys, excludes)?);
        Ok(sorted(self.store.set_diff(&keys)?))
    }

    /// Elements having `include` that are in the universe minus `excludes`.
    ///
    /// Both sides are fetched and intersected here, probing with the larger
    /// side against a hash set of the smaller.
    pub fn all_not(&mut self, include: usize, excludes: &[usize]) -> QueryResult<Vec<String>> {
        require("all_not excludes", excludes.len(), 1)?;
        let include_key = self.keys.index_bit(Bit::new(include)?);
        let mut rest = vec![self.keys.universe()];
        rest.extend(index_keys(self.keys, excludes)?);

        let included = self.store.set_members(&include_key)?;
        let remaining = self.store.set_diff(&rest)?;
        let (small, large) = if included.len() <= remaining.len() {
            (included, remaining)
        } else {
            (remaining, included)
        };
        debug!(small = small.len(), large = large.len(), "all_not client-side intersect");
        let probe: HashSet<String> = small.into_iter().collect();
        Ok(sorted(
            large.into_iter().filter(|m| probe.contains(m)).collect(),
        ))
    }
}

impl<S: SetStore + ?Sized> std::fmt::Debug for QueryEngine<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("prefix", &self.keys.prefix())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use er_index::IndexMaintainer;
    use er_store::InMemorySetStore;
    use er_types::ErrorKind;

    fn fixture(elements: &[(&str, &[usize])]) -> (InMemorySetStore, KeyScheme) {
        let mut store = InMemorySetStore::new();
        let keys = KeyScheme::default();
        let mut m = IndexMaintainer::new(&mut store, &keys);
        for (name, bits) in elements {
            m.upsert(name, bits).unwrap();
        }
        (store, keys)
    }

    fn greek() -> (InMemorySetStore, KeyScheme) {
        fixture(&[("alpha", &[1, 2, 3][..]), ("beta", &[2, 4][..]), ("gamma", &[3, 5][..])])
    }

    fn people() -> (InMemorySetStore, KeyScheme) {
        fixture(&[("alice", &[1, 7, 42][..]), ("bob", &[1, 7][..]), ("carol", &[7, 42][..])])
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    // ---------------------------------------------------------------
    // Fixture semantics
    // ---------------------------------------------------------------

    #[test]
    fn greek_fixture() {
        let (mut store, keys) = greek();
        let mut q = QueryEngine::new(&mut store, &keys);
        assert_eq!(q.find_all(&[2]).unwrap(), names(&["alpha", "beta"]));
        assert_eq!(q.find_any(&[4, 5]).unwrap(), names(&["beta", "gamma"]));
        assert_eq!(q.universe_not(&[2]).unwrap(), names(&["gamma"]));
        assert_eq!(q.find(3).unwrap(), names(&["alpha", "gamma"]));
    }

    #[test]
    fn people_fixture() {
        let (mut store, keys) = people();
        let mut q = QueryEngine::new(&mut store, &keys);
        assert_eq!(q.find_all(&[1, 42]).unwrap(), names(&["alice"]));
        assert_eq!(q.find_any(&[7, 42]).unwrap(), names(&["alice", "bob", "carol"]));
        assert_eq!(q.find_not(42, &[7]).unwrap(), Vec::<String>::new());
        assert_eq!(q.find_not(1, &[42]).unwrap(), names(&["bob"]));
    }

    #[test]
    fn all_not_matches_find_not_on_indexed_elements() {
        let (mut store, keys) = people();
        let mut q = QueryEngine::new(&mut store, &keys);
        assert_eq!(q.all_not(7, &[1]).unwrap(), names(&["carol"]));
        assert_eq!(q.all_not(7, &[1]).unwrap(), q.find_not(7, &[1]).unwrap());
        assert!(q.all_not(100, &[1]).unwrap().is_empty());
    }

    #[test]
    fn all_not_respects_universe() {
        let (mut store, keys) = people();
        // An index entry whose element was removed from the universe is
        // invisible to all_not but not to find_not.
        store.set_remove("er:all", "carol").unwrap();
        let mut q = QueryEngine::new(&mut store, &keys);
        assert!(q.all_not(42, &[1]).unwrap().is_empty());
        assert_eq!(q.find_not(42, &[1]).unwrap(), names(&["carol"]));
    }

    #[test]
    fn empty_store_yields_empty_results() {
        let mut store = InMemorySetStore::new();
        let keys = KeyScheme::default();
        let mut q = QueryEngine::new(&mut store, &keys);
        assert!(q.find(0).unwrap().is_empty());
        assert!(q.universe_not(&[0]).unwrap().is_empty());
        assert!(q.all_not(0, &[1]).unwrap().is_empty());
    }

    // ---------------------------------------------------------------
    // Validation
    // ---------------------------------------------------------------

    #[test]
    fn rejects_bad_inputs_before_io() {
        let mut store = InMemorySetStore::new();
        let keys = KeyScheme::default();
        let mut q = QueryEngine::new(&mut store, &keys);
        assert_eq!(q.find(4096).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(q.find_all(&[]).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(q.find_any(&[1, 5000]).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(q.find_not(1, &[]).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(q.universe_not(&[]).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(q.all_not(4096, &[1]).unwrap_err().kind(), ErrorKind::InvalidArgument);
    }
}
