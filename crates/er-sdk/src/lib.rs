//! High-level SDK for the element registry.
//!
//! [`Registry`] is the single entry point for applications: it binds a
//! store handle to a key namespace and exposes element maintenance, live
//! queries and stored results with caller-facing limits applied.
//!
//! ```no_run
//! use er_sdk::{Registry, RegistryConfig};
//!
//! let mut registry = Registry::connect(RegistryConfig::default())?;
//! registry.upsert("alice", &[1, 7, 42])?;
//! let page = registry.find_all(&[1, 42], None)?;
//! assert_eq!(page.names, vec!["alice"]);
//! # Ok::<(), er_sdk::SdkError>(())
//! ```

pub mod config;
pub mod error;
pub mod registry;

pub use config::{Limits, RegistryConfig};
pub use error::{SdkError, SdkResult};
pub use registry::{QueryPage, Registry};

// Re-export key types
pub use er_index::{DeleteReport, IndexScrub, UpsertMode, UpsertReport};
pub use er_query::{Inspection, StoredResult};
pub use er_store::{ConnectionConfig, InMemorySetStore, KeyTtl, RedisClient, SetStore};
pub use er_types::{Bit, BitVector, ElementView, ErrorKind};
