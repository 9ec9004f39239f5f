//! Key naming for the element registry.
//!
//! Every key the registry touches in the backing store is produced here and
//! nowhere else. The layout under a prefix `p` is:
//!
//! - `p:all` -- the universe set of element names
//! - `p:element:{name}` -- one element record (hash)
//! - `p:idx:bit:{n}` -- inverted index for bit `n`
//! - `p:tmp:{tag}:{stamp}:{nonce}:{seq}` -- a temporary, expiring result set
//!
//! # Modules
//!
//! - [`scheme`] — pure key functions and the stateful [`KeyScheme`]
//! - [`error`] — prefix and tag validation errors

pub mod error;
pub mod scheme;

pub use error::{KeyError, Result};
pub use scheme::{element, index_bit, universe, validate_prefix, KeyScheme, DEFAULT_PREFIX};
