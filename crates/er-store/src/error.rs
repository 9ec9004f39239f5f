use std::io;

use er_protocol::ProtocolError;
use er_types::ErrorKind;

/// Errors from backing-store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Rejected client-side before any network traffic.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The key, field, or record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport failure.
    #[error("I/O error: {0}")]
    Io(io::Error),

    /// A connect or command timeout elapsed.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The store answered with an error reply.
    #[error("{command}: {message}")]
    Protocol { command: String, message: String },

    /// The store answered with a reply of the wrong shape.
    #[error("{command}: expected {expected} reply, got {actual}")]
    ReplyType {
        command: String,
        expected: &'static str,
        actual: String,
    },

    /// The reply stream could not be framed.
    #[error("malformed reply: {0}")]
    Framing(#[from] ProtocolError),

    /// The client is in a state where it cannot serve commands.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Io(_) => ErrorKind::Io,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::ReplyType { .. } | Self::Framing(_) => ErrorKind::ReplyType,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn protocol(command: &str, message: impl Into<String>) -> Self {
        Self::Protocol {
            command: command.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn reply_type(command: &str, expected: &'static str, actual: impl Into<String>) -> Self {
        Self::ReplyType {
            command: command.to_string(),
            expected,
            actual: actual.into(),
        }
    }

    pub(crate) fn wrong_type(command: &str) -> Self {
        Self::protocol(
            command,
            "WRONGTYPE Operation against a key holding the wrong kind of value",
        )
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout(err.to_string()),
            _ => Self::Io(err),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
