use er_index::{DeleteReport, IndexMaintainer, UpsertReport};
use er_keys::KeyScheme;
use er_query::{Inspection, QueryEngine, StoredResult};
use er_store::{RedisClient, SetStore};
use er_types::ElementView;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::RegistryConfig;
use crate::error::{SdkError, SdkResult};

/// Names returned by a live query, with the size before truncation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPage {
    /// Matching elements in total.
    pub count: usize,
    /// Length of `names`.
    pub returned: usize,
    /// Limit that was applied.
    pub limit: usize,
    /// Names sorted ascending.
    pub names: Vec<String>,
}

impl QueryPage {
    fn new(mut names: Vec<String>, limit: usize) -> Self {
        let count = names.len();
        names.truncate(limit);
        Self {
            count,
            returned: names.len(),
            limit,
            names,
        }
    }
}

/// The element registry over one store handle.
///
/// Owns its handle; for concurrent use open one registry per thread.
pub struct Registry<S: SetStore> {
    store: S,
    keys: KeyScheme,
    config: RegistryConfig,
}

impl Registry<RedisClient> {
    /// Validate `config` and connect to the configured store.
    pub fn connect(config: RegistryConfig) -> SdkResult<Self> {
        config.validate()?;
        let client = RedisClient::connect(&config.store)?;
        Self::with_store(client, config)
    }
}

impl<S: SetStore> Registry<S> {
    /// Use an already opened store handle.
    pub fn with_store(store: S, config: RegistryConfig) -> SdkResult<Self> {
        config.validate()?;
        let keys = KeyScheme::new(&config.prefix)?;
        info!(prefix = keys.prefix(), mode = ?config.upsert_mode, "registry ready");
        Ok(Self { store, keys, config })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn keys(&self) -> &KeyScheme {
        &self.keys
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn maintainer(&mut self) -> IndexMaintainer<'_, S> {
        IndexMaintainer::new(&mut self.store, &self.keys).with_mode(self.config.upsert_mode)
    }

    fn engine(&mut self) -> QueryEngine<'_, S> {
        QueryEngine::new(&mut self.store, &self.keys)
    }

    fn limit(&self, requested: Option<usize>, max: usize) -> SdkResult<usize> {
        let limit = requested.unwrap_or(self.config.limits.default_limit);
        if limit == 0 || limit > max {
            return Err(SdkError::InvalidArgument(format!(
                "limit must be in 1..={max}, got {limit}"
            )));
        }
        Ok(limit)
    }

    fn ttl(&self, ttl_seconds: i64) -> SdkResult<i64> {
        let max = self.config.limits.ttl_max_sec;
        if ttl_seconds <= 0 || ttl_seconds > max {
            return Err(SdkError::InvalidArgument(format!(
                "ttl must be in 1..={max} seconds, got {ttl_seconds}"
            )));
        }
        Ok(ttl_seconds)
    }

    fn page(&self, names: Vec<String>, limit: Option<usize>) -> SdkResult<QueryPage> {
        let limit = self.limit(limit, self.config.limits.max_query_limit)?;
        Ok(QueryPage::new(names, limit))
    }

    // ---- Elements ----

    pub fn ping(&mut self) -> SdkResult<()> {
        Ok(self.store.ping()?)
    }

    pub fn upsert(&mut self, name: &str, bits: &[usize]) -> SdkResult<UpsertReport> {
        Ok(self.maintainer().upsert(name, bits)?)
    }

    pub fn get(&mut self, name: &str, limit: Option<usize>) -> SdkResult<ElementView> {
        let limit = self.limit(limit, self.config.limits.max_get_limit)?;
        Ok(self.maintainer().get(name, limit)?)
    }

    pub fn delete(&mut self, name: &str, force: bool) -> SdkResult<DeleteReport> {
        Ok(self.maintainer().delete(name, force)?)
    }

    // ---- Live queries ----
    //
    // Limits are checked before the store is queried.

    pub fn find(&mut self, bit: usize, limit: Option<usize>) -> SdkResult<QueryPage> {
        self.limit(limit, self.config.limits.max_query_limit)?;
        let names = self.engine().find(bit)?;
        self.page(names, limit)
    }

    pub fn find_all(&mut self, bits: &[usize], limit: Option<usize>) -> SdkResult<QueryPage> {
        self.limit(limit, self.config.limits.max_query_limit)?;
        let names = self.engine().find_all(bits)?;
        self.page(names, limit)
    }

    pub fn find_any(&mut self, bits: &[usize], limit: Option<usize>) -> SdkResult<QueryPage> {
        self.limit(limit, self.config.limits.max_query_limit)?;
        let names = self.engine().find_any(bits)?;
        self.page(names, limit)
    }

    pub fn find_not(
        &mut self,
        include: usize,
        excludes: &[usize],
        limit: Option<usize>,
    ) -> SdkResult<QueryPage> {
        self.limit(limit, self.config.limits.max_query_limit)?;
        let names = self.engine().find_not(include, excludes)?;
        self.page(names, limit)
    }

    pub fn universe_not(&mut self, excludes: &[usize], limit: Option<usize>) -> SdkResult<QueryPage> {
        self.limit(limit, self.config.limits.max_query_limit)?;
        let names = self.engine().universe_not(excludes)?;
        self.page(names, limit)
    }

    pub fn all_not(
        &mut self,
        include: usize,
        excludes: &[usize],
        limit: Option<usize>,
    ) -> SdkResult<QueryPage> {
        self.limit(limit, self.config.limits.max_query_limit)?;
        let names = self.engine().all_not(include, excludes)?;
        self.page(names, limit)
    }

    // ---- Stored results ----

    pub fn store_all(&mut self, ttl_seconds: i64, bits: &[usize]) -> SdkResult<StoredResult> {
        let ttl = self.ttl(ttl_seconds)?;
        Ok(self.engine().store_all(ttl, bits)?)
    }

    pub fn store_any(&mut self, ttl_seconds: i64, bits: &[usize]) -> SdkResult<StoredResult> {
        let ttl = self.ttl(ttl_seconds)?;
        Ok(self.engine().store_any(ttl, bits)?)
    }

    pub fn store_not(&mut self, ttl_seconds: i64, excludes: &[usize]) -> SdkResult<StoredResult> {
        let ttl = self.ttl(ttl_seconds)?;
        Ok(self.engine().store_not(ttl, excludes)?)
    }

    pub fn store_all_not(
        &mut self,
        ttl_seconds: i64,
        include: usize,
        excludes: &[usize],
    ) -> SdkResult<StoredResult> {
        let ttl = self.ttl(ttl_seconds)?;
        Ok(self.engine().store_all_not(ttl, include, excludes)?)
    }

    pub fn inspect(&mut self, dest_key: &str, limit: Option<usize>) -> SdkResult<Inspection> {
        let limit = self.limit(limit, self.config.limits.max_query_limit)?;
        Ok(self.engine().inspect(dest_key, limit)?)
    }

    pub fn delete_stored(&mut self, dest_key: &str) -> SdkResult<i64> {
        Ok(self.engine().delete_stored(dest_key)?)
    }
}

impl<S: SetStore> std::fmt::Debug for Registry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("prefix", &self.keys.prefix())
            .field("store", &self.config.store.address())
            .finish()
    }
}
