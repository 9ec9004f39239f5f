use std::path::PathBuf;

use er_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Type(#[from] er_types::TypeError),

    #[error(transparent)]
    Key(#[from] er_keys::KeyError),

    #[error(transparent)]
    Store(#[from] er_store::StoreError),

    #[error(transparent)]
    Index(#[from] er_index::IndexError),

    #[error(transparent)]
    Query(#[from] er_query::QueryError),
}

impl SdkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::Config(_) | Self::ConfigParse(_) => {
                ErrorKind::InvalidArgument
            }
            Self::ConfigRead { .. } => ErrorKind::Io,
            Self::Type(e) => e.kind(),
            Self::Key(e) => e.kind(),
            Self::Store(e) => e.kind(),
            Self::Index(e) => e.kind(),
            Self::Query(e) => e.kind(),
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
