use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Discriminant shared by every error type in the workspace.
///
/// Each crate defines its own error enum, but all of them classify into
/// one of these kinds via a `kind()` method so callers can branch on the
/// failure class without matching on layer-specific variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad bit index, oversized name, non-positive TTL, empty key set.
    InvalidArgument,
    /// Missing record, field, or key.
    NotFound,
    /// Transport failure.
    Io,
    /// The backing store returned an error reply (including script errors).
    Protocol,
    /// The backing store replied with an unexpected shape.
    ReplyType,
    /// Invalid internal state.
    Internal,
    /// A connect or command timeout elapsed.
    Timeout,
}

impl ErrorKind {
    /// Stable snake_case name, used in JSON envelopes and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::Io => "io",
            Self::Protocol => "protocol",
            Self::ReplyType => "reply_type",
            Self::Internal => "internal",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by value-type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("bit out of range (0..4095): {0}")]
    BitOutOfRange(usize),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid element name: {0}")]
    InvalidName(String),
}

impl TypeError {
    /// Every type-level failure is a caller mistake.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_snake_case() {
        assert_eq!(ErrorKind::InvalidArgument.as_str(), "invalid_argument");
        assert_eq!(ErrorKind::ReplyType.to_string(), "reply_type");
    }

    #[test]
    fn kind_serializes_as_snake_case() {
        let json = serde_json::to_string(&ErrorKind::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");
    }

    #[test]
    fn type_errors_are_invalid_argument() {
        assert_eq!(TypeError::BitOutOfRange(4096).kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            TypeError::InvalidLength { expected: 512, actual: 3 }.kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            TypeError::BitOutOfRange(5000).to_string(),
            "bit out of range (0..4095): 5000"
        );
    }
}
