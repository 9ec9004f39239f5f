//! Error types for key construction.

use er_types::ErrorKind;
use thiserror::Error;

/// Errors that can occur while building a key scheme.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// The namespace prefix is unusable.
    #[error("invalid key prefix {prefix:?}: {reason}")]
    InvalidPrefix { prefix: String, reason: String },

    /// A temporary-key tag is unusable.
    #[error("invalid temp tag {tag:?}: {reason}")]
    InvalidTag { tag: String, reason: String },
}

impl KeyError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}

/// Convenience type alias for key operations.
pub type Result<T> = std::result::Result<T, KeyError>;
