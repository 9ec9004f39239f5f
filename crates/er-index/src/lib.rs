//! Index maintenance for the element registry.
//!
//! Every element has a record (`name`, `flags_bin`) plus one membership per
//! set bit in the matching `idx:bit:{n}` set, and one in the universe set.
//! This crate keeps those three views consistent.
//!
//! # Key Types
//!
//! - [`IndexMaintainer`] -- upsert / get / delete against a [`er_store::SetStore`]
//! - [`FlagDelta`] -- the index writes needed between two flag vectors
//! - [`UpsertMode`] -- sequential commands or one compare-and-apply script
//! - [`StoredFlags`] -- flags as read back, with their source field

pub mod delta;
pub mod error;
pub mod maintainer;
pub mod record;

pub use delta::FlagDelta;
pub use error::{IndexError, IndexResult};
pub use maintainer::{DeleteReport, IndexMaintainer, IndexScrub, UpsertMode, UpsertReport};
pub use record::{load_flags, FlagSource, StoredFlags, LEGACY_HEX_FIELD};
