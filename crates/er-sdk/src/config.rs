use std::path::Path;

use er_index::UpsertMode;
use er_keys::{validate_prefix, DEFAULT_PREFIX};
use er_store::ConnectionConfig;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Size and lifetime bounds applied to caller input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Largest TTL accepted by the store variants.
    pub ttl_max_sec: i64,
    /// Result limit used when the caller gives none.
    pub default_limit: usize,
    /// Largest result limit for queries and inspect.
    pub max_query_limit: usize,
    /// Largest result limit for `get`.
    pub max_get_limit: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            ttl_max_sec: 86_400,
            default_limit: 200,
            max_query_limit: 5_000,
            max_get_limit: 4_096,
        }
    }
}

/// Registry configuration: file, then environment, then validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub prefix: String,
    pub store: ConnectionConfig,
    pub limits: Limits,
    pub upsert_mode: UpsertMode,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.into(),
            store: ConnectionConfig::default(),
            limits: Limits::default(),
            upsert_mode: UpsertMode::default(),
        }
    }
}

impl RegistryConfig {
    /// Parse TOML. Missing fields keep their defaults.
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SdkError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Overlay `ER_*` variables from the process environment.
    pub fn apply_env(&mut self) -> SdkResult<()> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Overlay `ER_*` variables from `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> SdkResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ER_PREFIX") {
            self.prefix = v;
        }
        if let Some(v) = lookup("ER_REDIS_HOST") {
            self.store.host = v;
        }
        if let Some(v) = lookup("ER_REDIS_PORT") {
            self.store.port = parse_env("ER_REDIS_PORT", &v)?;
        }
        if let Some(v) = lookup("ER_REDIS_TIMEOUT_MS") {
            self.store.timeout_ms = parse_env("ER_REDIS_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("ER_TTL_MAX_SEC") {
            self.limits.ttl_max_sec = parse_env("ER_TTL_MAX_SEC", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> SdkResult<()> {
        validate_prefix(&self.prefix)?;
        self.store.validate()?;
        let l = &self.limits;
        if l.ttl_max_sec <= 0 {
            return Err(SdkError::Config("limits.ttl_max_sec must be > 0".into()));
        }
        if l.default_limit == 0 || l.max_query_limit == 0 || l.max_get_limit == 0 {
            return Err(SdkError::Config("limits must be > 0".into()));
        }
        if l.default_limit > l.max_query_limit {
            return Err(SdkError::Config(format!(
                "limits.default_limit {} exceeds max_query_limit {}",
                l.default_limit, l.max_query_limit
            )));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> SdkResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SdkError::Config(format!("{name}={value:?} is not a valid number")))
}
