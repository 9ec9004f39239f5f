//! Wire protocol for the element registry.
//!
//! Commands are ordered vectors of opaque byte buffers, never format
//! strings, so binary payloads such as the 512-byte flag encoding travel
//! unchanged even when they contain zero bytes or CRLF sequences. Replies are
//! decoded from RESP2 framing.

pub mod codec;
pub mod command;
pub mod error;
pub mod reply;

pub use codec::{ReplyDecoder, RespCodec, MAX_BULK_SIZE, MAX_LINE_LENGTH};
pub use command::Command;
pub use error::{ProtocolError, ProtocolResult};
pub use reply::Reply;
