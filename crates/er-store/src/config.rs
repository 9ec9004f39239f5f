use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Where and how to reach the backing store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Connect and per-command timeout.
    pub timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 6379,
            timeout_ms: 2000,
        }
    }
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Reject settings that can never connect.
    pub fn validate(&self) -> StoreResult<()> {
        if self.host.trim().is_empty() {
            return Err(StoreError::InvalidArgument("store host is empty".into()));
        }
        if self.host.chars().any(char::is_whitespace) {
            return Err(StoreError::InvalidArgument(format!(
                "store host {:?} contains whitespace",
                self.host
            )));
        }
        if self.port == 0 {
            return Err(StoreError::InvalidArgument("store port must be > 0".into()));
        }
        if self.timeout_ms == 0 {
            return Err(StoreError::InvalidArgument("timeout_ms must be > 0".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// `host:port`, for logs and messages.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use er_types::ErrorKind;

    #[test]
    fn default_config() {
        let c = ConnectionConfig::default();
        assert_eq!(c.address(), "127.0.0.1:6379");
        assert_eq!(c.timeout(), Duration::from_secs(2));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_bad_settings() {
        let mut c = ConnectionConfig::new("", 6379);
        assert_eq!(c.validate().unwrap_err().kind(), ErrorKind::InvalidArgument);
        c.host = "red is".into();
        assert!(c.validate().is_err());
        c = ConnectionConfig::new("redis", 0);
        assert!(c.validate().is_err());
        c = ConnectionConfig { timeout_ms: 0, ..ConnectionConfig::default() };
        assert!(c.validate().is_err());
    }

    #[test]
    fn partial_deserialize_uses_defaults() {
        let c: ConnectionConfig = serde_json::from_str(r#"{"host":"redis"}"#).unwrap();
        assert_eq!(c.host, "redis");
        assert_eq!(c.port, 6379);
    }
}
