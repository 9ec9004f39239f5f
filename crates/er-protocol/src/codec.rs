use bytes::{BufMut, BytesMut};

use crate::command::Command;
use crate::error::{ProtocolError, ProtocolResult};
use crate::reply::Reply;

/// Largest bulk payload accepted from the server (matches the server default).
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Longest header line accepted before a CRLF must appear.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Codec for RESP2 request encoding and reply decoding.
pub struct RespCodec;

impl RespCodec {
    /// Encode a command as an array of bulk strings.
    pub fn encode(cmd: &Command) -> ProtocolResult<BytesMut> {
        let mut buf = BytesMut::new();
        Self::encode_into(cmd, &mut buf)?;
        Ok(buf)
    }

    /// Append the encoding of `cmd` to `buf`.
    pub fn encode_into(cmd: &Command, buf: &mut BytesMut) -> ProtocolResult<()> {
        if cmd.is_empty() {
            return Err(ProtocolError::EmptyCommand);
        }
        let payload: usize = cmd.parts().iter().map(|a| a.len() + 16).sum();
        buf.reserve(16 + payload);
        buf.put_slice(format!("*{}\r\n", cmd.len()).as_bytes());
        for arg in cmd.parts() {
            buf.put_slice(format!("${}\r\n", arg.len()).as_bytes());
            buf.put_slice(arg);
            buf.put_slice(b"\r\n");
        }
        Ok(())
    }

    /// Decode one reply from the front of `data`.
    ///
    /// Returns `Ok(None)` when `data` holds only part of a reply; the caller
    /// should read more and retry. On success returns the reply and the
    /// number of bytes it occupied. Each call starts from scratch; use a
    /// [`ReplyDecoder`] when a reply arrives in many reads.
    pub fn decode(data: &[u8]) -> ProtocolResult<Option<(Reply, usize)>> {
        ReplyDecoder::new().decode(data)
    }
}

/// Resumable reply decoder.
///
/// Remembers the offset of the first unparsed element and the arrays still
/// being filled, so a reply fed in chunks is parsed once in total. Between
/// calls the buffer may only grow at the end; once a reply (or an error) is
/// returned the decoder is reset and the caller drops the consumed prefix.
#[derive(Debug, Default)]
pub struct ReplyDecoder {
    pos: usize,
    pending: Vec<PendingArray>,
}

#[derive(Debug)]
struct PendingArray {
    remaining: usize,
    items: Vec<Reply>,
}

enum Element {
    Value(Reply),
    ArrayHeader(usize),
}

impl ReplyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue decoding the reply at the front of `data`.
    pub fn decode(&mut self, data: &[u8]) -> ProtocolResult<Option<(Reply, usize)>> {
        let result = self.resume(data);
        if !matches!(result, Ok(None)) {
            self.reset();
        }
        result
    }

    /// Forget any partially decoded reply.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.pending.clear();
    }

    /// True when part of a reply has been consumed.
    pub fn in_progress(&self) -> bool {
        self.pos > 0
    }

    fn resume(&mut self, data: &[u8]) -> ProtocolResult<Option<(Reply, usize)>> {
        loop {
            let Some((element, next)) = parse_element(data, self.pos)? else {
                return Ok(None);
            };
            self.pos = next;
            let mut value = match element {
                Element::Value(reply) => reply,
                Element::ArrayHeader(count) => {
                    self.pending.push(PendingArray {
                        remaining: count,
                        items: Vec::with_capacity(count.min(1024)),
                    });
                    continue;
                }
            };
            // Fold the finished value into its parents, closing every array
            // it completes.
            loop {
                let Some(top) = self.pending.last_mut() else {
                    return Ok(Some((value, self.pos)));
                };
                top.items.push(value);
                top.remaining -= 1;
                if top.remaining > 0 {
                    break;
                }
                let items = self.pending.pop().map(|a| a.items).unwrap_or_default();
                value = Reply::Array(Some(items));
            }
        }
    }
}

/// Parse one scalar, bulk or array header at `pos`.
fn parse_element(data: &[u8], pos: usize) -> ProtocolResult<Option<(Element, usize)>> {
    let Some((line, next)) = read_line(data, pos)? else {
        return Ok(None);
    };
    let (tag, body) = (line[0], &line[1..]);
    let value = match tag {
        b'+' => Reply::Status(utf8(body)?),
        b'-' => Reply::Error(utf8(body)?),
        b':' => Reply::Integer(number(body)?),
        b'$' => return Ok(parse_bulk(data, body, next)?.map(|(r, n)| (Element::Value(r), n))),
        b'*' => match number(body)? {
            -1 => Reply::Array(None),
            0 => Reply::Array(Some(Vec::new())),
            count => {
                let count = usize::try_from(count).map_err(|_| {
                    ProtocolError::FramingError(format!("negative array length {count}"))
                })?;
                return Ok(Some((Element::ArrayHeader(count), next)));
            }
        },
        other => return Err(ProtocolError::InvalidReplyType(other)),
    };
    Ok(Some((Element::Value(value), next)))
}

/// A bulk whose payload is still arriving is reported as incomplete
/// without consuming its header.
fn parse_bulk(data: &[u8], header: &[u8], start: usize) -> ProtocolResult<Option<(Reply, usize)>> {
    let len = number(header)?;
    if len == -1 {
        return Ok(Some((Reply::Bulk(None), start)));
    }
    let len = usize::try_from(len)
        .map_err(|_| ProtocolError::FramingError(format!("negative bulk length {len}")))?;
    if len > MAX_BULK_SIZE {
        return Err(ProtocolError::MessageTooLarge { size: len, max: MAX_BULK_SIZE });
    }
    let end = start + len;
    if data.len() < end + 2 {
        return Ok(None);
    }
    if &data[end..end + 2] != b"\r\n" {
        return Err(ProtocolError::FramingError("bulk payload not terminated by CRLF".into()));
    }
    Ok(Some((Reply::Bulk(Some(data[start..end].to_vec())), end + 2)))
}

/// Find the CRLF-terminated line starting at `pos`. Returns the line
/// (without CRLF, at least one byte) and the offset just past the CRLF.
fn read_line(data: &[u8], pos: usize) -> ProtocolResult<Option<(&[u8], usize)>> {
    let rest = &data[pos.min(data.len())..];
    match rest.windows(2).position(|w| w == b"\r\n") {
        Some(0) => Err(ProtocolError::FramingError("empty header line".into())),
        Some(i) => Ok(Some((&rest[..i], pos + i + 2))),
        None if rest.len() > MAX_LINE_LENGTH => Err(ProtocolError::FramingError(format!(
            "no CRLF within {MAX_LINE_LENGTH} bytes"
        ))),
        None => Ok(None),
    }
}

fn utf8(body: &[u8]) -> ProtocolResult<String> {
    String::from_utf8(body.to_vec())
        .map_err(|e| ProtocolError::FramingError(format!("non UTF-8 line: {e}")))
}

fn number(body: &[u8]) -> ProtocolResult<i64> {
    std::str::from_utf8(body)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            ProtocolError::FramingError(format!(
                "invalid integer {:?}",
                String::from_utf8_lossy(body)
            ))
        })
}
