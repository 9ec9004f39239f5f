//! Composite query engine for the element registry.
//!
//! [`QueryEngine`] answers two kinds of question over the bit indexes:
//!
//! - live queries (`find`, `find_all`, `find_any`, `find_not`,
//!   `universe_not`, `all_not`) that return member names and persist nothing
//! - stored queries (`store_all`, `store_any`, `store_not`, `store_all_not`)
//!   that write the result under a fresh temporary key with an expiry, in a
//!   single atomic script, and return a [`StoredResult`] handle
//!
//! Stored results are read back with `inspect` and removed early with
//! `delete_stored`; both only accept keys in the temporary namespace.

pub mod engine;
pub mod error;
pub mod stored;

pub use engine::QueryEngine;
pub use error::{QueryError, QueryResult};
pub use stored::{Inspection, StoredResult};
