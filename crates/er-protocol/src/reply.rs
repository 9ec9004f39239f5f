/// A decoded RESP2 reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// `+OK`, `+PONG`, ...
    Status(String),
    /// `-ERR ...`, `-WRONGTYPE ...`, script failures.
    Error(String),
    /// `:42`
    Integer(i64),
    /// `$n` payload, or `None` for the nil bulk `$-1`.
    Bulk(Option<Vec<u8>>),
    /// `*n` elements, or `None` for the nil array `*-1`.
    Array(Option<Vec<Reply>>),
}

impl Reply {
    /// Short name of the reply shape, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Error(_) => "error",
            Self::Integer(_) => "integer",
            Self::Bulk(Some(_)) => "bulk",
            Self::Bulk(None) => "nil",
            Self::Array(Some(_)) => "array",
            Self::Array(None) => "nil-array",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Bulk(None) | Self::Array(None))
    }
}
