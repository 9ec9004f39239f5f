//! Error types for the index crate.

use er_keys::KeyError;
use er_store::StoreError;
use er_types::{ErrorKind, TypeError};

/// Errors that can occur while maintaining element records and indexes.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Bad name or bit position.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Bad prefix or key tag.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// No record exists for the element.
    #[error("element not found: {0}")]
    NotFound(String),

    /// The record exists but neither flags field decodes.
    #[error("corrupt record for {name}: {reason} (delete with force to scrub it)")]
    CorruptRecord { name: String, reason: String },

    /// An atomic upsert found the record changed since its flags were read.
    #[error("concurrent update of {0}; retry the upsert")]
    Conflict(String),
}

impl IndexError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Type(e) => e.kind(),
            Self::Key(e) => e.kind(),
            Self::Store(e) => e.kind(),
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::CorruptRecord { .. } | Self::Conflict(_) => ErrorKind::Internal,
        }
    }
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
