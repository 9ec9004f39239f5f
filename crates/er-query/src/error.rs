use er_keys::KeyError;
use er_store::StoreError;
use er_types::{ErrorKind, TypeError};

/// Errors from live queries and stored results.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Too few inputs, or a key outside the temporary namespace.
    #[error("invalid query: {0}")]
    InvalidArgument(String),
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Type(e) => e.kind(),
            Self::Key(e) => e.kind(),
            Self::Store(e) => e.kind(),
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
