//! Backing-store access for the element registry.
//!
//! The registry keeps everything in a Redis-compatible key-value/set store:
//! one hash per element, one set per flag bit, a universe set, and
//! short-lived result sets. This crate owns the narrow command surface the
//! rest of the workspace needs and nothing more.
//!
//! # Backends
//!
//! All backends implement the [`SetStore`] trait:
//!
//! - [`RedisClient`] -- blocking RESP client over one TCP connection
//! - [`InMemorySetStore`] -- shared in-process keyspace for tests and embedding
//!
//! # Atomic scripts
//!
//! Multi-step operations that must not interleave with other clients run as
//! one [`AtomicScript`]. The Redis backend sends the Lua body with `EVAL`;
//! the in-memory backend runs the same semantics under its lock.
//!
//! # Rules
//!
//! 1. Empty key lists and non-positive TTLs are rejected before any I/O.
//! 2. An error reply from the store is a `Protocol` error, a reply of the
//!    wrong shape is a `ReplyType` error; neither is ever returned as data.
//! 3. Hash values are binary safe end to end.

pub mod config;
pub mod error;
pub mod memory;
pub mod redis;
pub mod script;
pub mod traits;

pub use config::ConnectionConfig;
pub use error::{StoreError, StoreResult};
pub use memory::InMemorySetStore;
pub use redis::RedisClient;
pub use script::{
    AtomicScript, DEFAULT_SCRATCH_TTL_SECS, RECORD_FLAGS_FIELD, RECORD_NAME_FIELD,
    SCRIPT_CATALOG_VERSION, UPSERT_CONFLICT,
};
pub use traits::{validate_keys, validate_ttl, KeyTtl, SetOp, SetStore};
