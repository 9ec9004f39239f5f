use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::{StoreError, StoreResult};
use crate::script::{
    int_arg, AtomicScript, DEFAULT_SCRATCH_TTL_SECS, RECORD_FLAGS_FIELD, RECORD_NAME_FIELD,
    UPSERT_CONFLICT,
};
use crate::traits::{validate_keys, validate_ttl, KeyTtl, SetOp, SetStore};

enum Value {
    Hash(HashMap<String, Vec<u8>>),
    Set(BTreeSet<String>),
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
    /// Added to the wall clock so tests can expire keys without sleeping.
    skew: Duration,
}

impl State {
    fn now(&self) -> Instant {
        Instant::now() + self.skew
    }

    /// Drop `key` if its deadline has passed. Returns whether it still exists.
    fn purge(&mut self, key: &str) -> bool {
        let now = self.now();
        match self.entries.get(key) {
            Some(entry) if entry.expires_at.is_some_and(|at| at <= now) => {
                self.entries.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    fn purge_all(&mut self) {
        let now = self.now();
        self.entries
            .retain(|_, e| e.expires_at.map_or(true, |at| at > now));
    }

    fn set(&mut self, cmd: &str, key: &str) -> StoreResult<Option<&BTreeSet<String>>> {
        self.purge(key);
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry { value: Value::Set(set), .. }) => Ok(Some(set)),
            Some(_) => Err(StoreError::wrong_type(cmd)),
        }
    }

    fn set_mut(&mut self, cmd: &str, key: &str) -> StoreResult<&mut BTreeSet<String>> {
        self.purge(key);
        let entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Set(BTreeSet::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Set(set) => Ok(set),
            Value::Hash(_) => Err(StoreError::wrong_type(cmd)),
        }
    }

    fn hash_mut(&mut self, cmd: &str, key: &str) -> StoreResult<&mut HashMap<String, Vec<u8>>> {
        self.purge(key);
        let entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Hash(hash) => Ok(hash),
            Value::Set(_) => Err(StoreError::wrong_type(cmd)),
        }
    }

    fn hash_field(&mut self, cmd: &str, key: &str, field: &str) -> StoreResult<Option<Vec<u8>>> {
        self.purge(key);
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry { value: Value::Hash(hash), .. }) => Ok(hash.get(field).cloned()),
            Some(_) => Err(StoreError::wrong_type(cmd)),
        }
    }

    fn add(&mut self, cmd: &str, key: &str, member: &str) -> StoreResult<i64> {
        Ok(self.set_mut(cmd, key)?.insert(member.to_string()) as i64)
    }

    fn remove(&mut self, cmd: &str, key: &str, member: &str) -> StoreResult<i64> {
        let removed = match self.set(cmd, key)? {
            Some(set) => set.contains(member),
            None => return Ok(0),
        };
        if removed {
            let set = self.set_mut(cmd, key)?;
            set.remove(member);
            if set.is_empty() {
                self.entries.remove(key);
            }
        }
        Ok(removed as i64)
    }

    fn algebra(&mut self, op: SetOp, keys: &[String]) -> StoreResult<BTreeSet<String>> {
        let cmd = op.command();
        let empty = BTreeSet::new();
        let mut operands = Vec::with_capacity(keys.len());
        for key in keys {
            operands.push(self.set(cmd, key)?.cloned().unwrap_or_default());
        }
        let Some((first, rest)) = operands.split_first() else {
            return Ok(empty);
        };
        let result = match op {
            SetOp::Intersect => first
                .iter()
                .filter(|m| rest.iter().all(|s| s.contains(*m)))
                .cloned()
                .collect(),
            SetOp::Union => rest.iter().fold(first.clone(), |mut acc, s| {
                acc.extend(s.iter().cloned());
                acc
            }),
            SetOp::Diff => first
                .iter()
                .filter(|m| !rest.iter().any(|s| s.contains(*m)))
                .cloned()
                .collect(),
        };
        Ok(result)
    }

    /// Overwrite `dest` with the result; an empty result leaves no key.
    fn store(&mut self, op: SetOp, dest: &str, keys: &[String]) -> StoreResult<i64> {
        let result = self.algebra(op, keys)?;
        let card = result.len() as i64;
        self.entries.remove(dest);
        if !result.is_empty() {
            self.entries.insert(
                dest.to_string(),
                Entry { value: Value::Set(result), expires_at: None },
            );
        }
        Ok(card)
    }

    /// Instant `ttl_seconds` from now; a TTL past what the clock can
    /// represent is refused the way the server refuses it.
    fn deadline(&self, command: &str, ttl_seconds: i64) -> StoreResult<Instant> {
        u64::try_from(ttl_seconds)
            .ok()
            .and_then(|secs| self.now().checked_add(Duration::from_secs(secs)))
            .ok_or_else(|| {
                StoreError::protocol(command, "ERR invalid expire time in 'expire' command")
            })
    }

    fn expire_at(&mut self, key: &str, deadline: Instant) -> bool {
        if !self.purge(key) {
            return false;
        }
        if let Some(entry) = self.entries.get_mut(key) {
            entry.expires_at = Some(deadline);
        }
        true
    }

    fn expire(&mut self, key: &str, ttl_seconds: i64) -> StoreResult<bool> {
        let deadline = self.deadline("EXPIRE", ttl_seconds)?;
        Ok(self.expire_at(key, deadline))
    }

    fn ttl(&mut self, key: &str) -> KeyTtl {
        if !self.purge(key) {
            return KeyTtl::Missing;
        }
        let now = self.now();
        match self.entries.get(key).and_then(|e| e.expires_at) {
            Some(at) => {
                let left = at.saturating_duration_since(now);
                let secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);
                KeyTtl::Expires(secs as i64)
            }
            None => KeyTtl::Persistent,
        }
    }

    fn delete(&mut self, key: &str) -> i64 {
        let existed = self.purge(key);
        self.entries.remove(key);
        existed as i64
    }

    fn store_script(&mut self, script: AtomicScript, keys: &[String], args: &[Vec<u8>]) -> StoreResult<i64> {
        let deadline = self.deadline(script.name(), int_arg(script, &args[0])?)?;
        let op = match script {
            AtomicScript::StoreAll => SetOp::Intersect,
            AtomicScript::StoreAny => SetOp::Union,
            _ => SetOp::Diff,
        };
        let card = self.store(op, &keys[0], &keys[1..])?;
        if card > 0 {
            self.expire_at(&keys[0], deadline);
        }
        Ok(card)
    }

    fn store_all_not(&mut self, keys: &[String], args: &[Vec<u8>]) -> StoreResult<i64> {
        let script = AtomicScript::StoreAllNot;
        let deadline = self.deadline(script.name(), int_arg(script, &args[0])?)?;
        let scratch_ttl = match int_arg(script, &args[1]) {
            Ok(t) if t > 0 => t,
            _ => DEFAULT_SCRATCH_TTL_SECS,
        };
        let scratch_deadline = self.deadline(script.name(), scratch_ttl)?;
        let (dest, scratch, include) = (&keys[0], &keys[1], &keys[2]);

        let mut minus = vec![keys[3].clone()];
        minus.extend_from_slice(&keys[4..]);
        self.store(SetOp::Diff, scratch, &minus)?;
        self.expire_at(scratch, scratch_deadline);

        let card = self.store(SetOp::Intersect, dest, &[include.clone(), scratch.clone()])?;
        if card > 0 {
            self.expire_at(dest, deadline);
        }
        self.entries.remove(scratch.as_str());
        Ok(card)
    }

    fn upsert_element(&mut self, keys: &[String], args: &[Vec<u8>]) -> StoreResult<i64> {
        let script = AtomicScript::UpsertElement;
        let name = std::str::from_utf8(&args[0]).map_err(|_| {
            StoreError::InvalidArgument(format!("{}: element name is not UTF-8", script.name()))
        })?;
        let removed = int_arg(script, &args[3])? as usize;
        let (record, universe) = (&keys[0], &keys[1]);

        let current = self
            .hash_field("HGET", record, RECORD_FLAGS_FIELD)?
            .unwrap_or_default();
        if current != args[2] {
            return Ok(UPSERT_CONFLICT);
        }

        // Type-check every touched key before the first write so a failure
        // leaves nothing half-applied.
        for key in &keys[2..] {
            self.set("SADD", key)?;
        }
        self.set("SADD", universe)?;
        self.hash_field("HSET", record, RECORD_FLAGS_FIELD)?;

        let (drop_from, add_to) = keys[2..].split_at(removed);
        for key in drop_from {
            self.remove("SREM", key, name)?;
        }
        for key in add_to {
            self.add("SADD", key, name)?;
        }
        let hash = self.hash_mut("HSET", record)?;
        hash.insert(RECORD_NAME_FIELD.to_string(), args[0].clone());
        hash.insert(RECORD_FLAGS_FIELD.to_string(), args[1].clone());
        self.add("SADD", universe, name)?;
        Ok(1)
    }
}

/// In-process store with the same observable semantics as the Redis
/// backend, for tests and embedding.
///
/// Clones share one keyspace, so each thread can own a handle while all of
/// them see the same data. Every command, scripts included, runs under a
/// single lock and is therefore atomic. Expiry is evaluated lazily against
/// a clock that [`fast_forward`](Self::fast_forward) can advance.
#[derive(Clone, Default)]
pub struct InMemorySetStore {
    state: Arc<Mutex<State>>,
}

impl InMemorySetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance this keyspace's clock, expiring keys whose deadline passes.
    pub fn fast_forward(&self, by: Duration) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.skew += by;
        state.purge_all();
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let mut state = self.state.lock().expect("lock poisoned");
        state.purge_all();
        state.entries.len()
    }

    /// Returns `true` if no live key exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.state.lock().expect("lock poisoned").purge(key)
    }

    /// Sorted list of live keys.
    pub fn keys(&self) -> Vec<String> {
        let mut state = self.state.lock().expect("lock poisoned");
        state.purge_all();
        let mut keys: Vec<String> = state.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn with<T>(&self, f: impl FnOnce(&mut State) -> StoreResult<T>) -> StoreResult<T> {
        let mut state = self.state.lock().expect("lock poisoned");
        f(&mut state)
    }
}

impl std::fmt::Debug for InMemorySetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySetStore")
            .field("key_count", &self.len())
            .finish()
    }
}

impl SetStore for InMemorySetStore {
    fn ping(&mut self) -> StoreResult<()> {
        Ok(())
    }

    fn hash_set(&mut self, key: &str, field: &str, value: &[u8]) -> StoreResult<i64> {
        self.with(|s| {
            let hash = s.hash_mut("HSET", key)?;
            Ok(hash.insert(field.to_string(), value.to_vec()).is_none() as i64)
        })
    }

    fn hash_get(&mut self, key: &str, field: &str) -> StoreResult<Vec<u8>> {
        self.with(|s| {
            s.hash_field("HGET", key, field)?
                .ok_or_else(|| StoreError::NotFound(format!("{key} {field}")))
        })
    }

    fn set_add(&mut self, key: &str, member: &str) -> StoreResult<i64> {
        self.with(|s| s.add("SADD", key, member))
    }

    fn set_remove(&mut self, key: &str, member: &str) -> StoreResult<i64> {
        self.with(|s| s.remove("SREM", key, member))
    }

    fn set_members(&mut self, key: &str) -> StoreResult<Vec<String>> {
        self.with(|s| {
            Ok(s.set("SMEMBERS", key)?
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default())
        })
    }

    fn set_card(&mut self, key: &str) -> StoreResult<i64> {
        self.with(|s| Ok(s.set("SCARD", key)?.map_or(0, |set| set.len() as i64)))
    }

    fn set_algebra(&mut self, op: SetOp, keys: &[String]) -> StoreResult<Vec<String>> {
        validate_keys(op.command(), keys)?;
        self.with(|s| Ok(s.algebra(op, keys)?.into_iter().collect()))
    }

    fn set_algebra_store(&mut self, op: SetOp, dest: &str, keys: &[String]) -> StoreResult<i64> {
        validate_keys(op.store_command(), keys)?;
        self.with(|s| s.store(op, dest, keys))
    }

    fn expire(&mut self, key: &str, ttl_seconds: i64) -> StoreResult<()> {
        validate_ttl(ttl_seconds)?;
        self.with(|s| {
            if s.expire(key, ttl_seconds)? {
                Ok(())
            } else {
                Err(StoreError::NotFound(format!("EXPIRE: key {key} not found")))
            }
        })
    }

    fn ttl(&mut self, key: &str) -> StoreResult<KeyTtl> {
        self.with(|s| Ok(s.ttl(key)))
    }

    fn run_atomic(
        &mut self,
        script: AtomicScript,
        keys: &[String],
        args: &[Vec<u8>],
    ) -> StoreResult<i64> {
        script.validate(keys, args)?;
        self.with(|s| match script {
            AtomicScript::StoreAll | AtomicScript::StoreAny | AtomicScript::StoreNot => {
                s.store_script(script, keys, args)
            }
            AtomicScript::StoreAllNot => s.store_all_not(keys, args),
            AtomicScript::UpsertElement => s.upsert_element(keys, args),
        })
    }

    fn delete(&mut self, key: &str) -> StoreResult<i64> {
        self.with(|s| Ok(s.delete(key)))
    }
}
