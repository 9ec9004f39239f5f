use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid reply type byte: 0x{0:02x}")]
    InvalidReplyType(u8),

    #[error("bulk payload too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("framing error: {0}")]
    FramingError(String),

    #[error("empty command")]
    EmptyCommand,
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
