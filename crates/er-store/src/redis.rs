use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use bytes::{Buf, BytesMut};
use er_protocol::{Command, Reply, ReplyDecoder, RespCodec};
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::error::{StoreError, StoreResult};
use crate::script::AtomicScript;
use crate::traits::{validate_keys, validate_ttl, KeyTtl, SetOp, SetStore};

const READ_CHUNK: usize = 8 * 1024;

/// Blocking RESP client over one TCP connection.
///
/// Commands are written as argument vectors and the reply is read before
/// the call returns, so exactly one command is in flight. After a transport
/// failure the reply stream may be out of step with the request stream, so
/// the client refuses further commands; reconnect instead.
pub struct RedisClient {
    stream: TcpStream,
    read_buf: BytesMut,
    decoder: ReplyDecoder,
    config: ConnectionConfig,
    broken: bool,
}

impl RedisClient {
    /// Validate the config, connect with its timeout, and apply the same
    /// timeout to every read and write.
    pub fn connect(config: &ConnectionConfig) -> StoreResult<Self> {
        config.validate()?;
        let timeout = config.timeout();
        let addrs = (config.host.as_str(), config.port).to_socket_addrs()?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    stream.set_nodelay(true)?;
                    info!(addr = %addr, "connected to store");
                    return Ok(Self {
                        stream,
                        read_buf: BytesMut::with_capacity(READ_CHUNK),
                        decoder: ReplyDecoder::new(),
                        config: config.clone(),
                        broken: false,
                    });
                }
                Err(e) => {
                    debug!(addr = %addr, error = %e, "connect attempt failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err
            .map(StoreError::from)
            .unwrap_or_else(|| StoreError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} resolved to no addresses", config.address()),
            ))))
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Send one command and wait for its reply.
    ///
    /// Error replies are returned as `Ok(Reply::Error(..))`; interpreting
    /// them is up to the caller.
    pub fn execute(&mut self, cmd: &Command) -> StoreResult<Reply> {
        if self.broken {
            return Err(StoreError::Internal(format!(
                "connection to {} failed earlier; reconnect",
                self.config.address()
            )));
        }
        let frame = RespCodec::encode(cmd)?;
        debug!(command = %cmd.name(), args = cmd.len() - 1, "store command");
        let result = self
            .stream
            .write_all(&frame)
            .map_err(StoreError::from)
            .and_then(|_| self.read_reply());
        if let Err(e) = &result {
            warn!(command = %cmd.name(), error = %e, "store command failed; connection disabled");
            self.broken = true;
        }
        result
    }

    fn read_reply(&mut self) -> StoreResult<Reply> {
        loop {
            if let Some((reply, used)) = self.decoder.decode(&self.read_buf)? {
                self.read_buf.advance(used);
                return Ok(reply);
            }
            let mut chunk = [0u8; READ_CHUNK];
            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                return Err(StoreError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by store",
                )));
            }
            self.read_buf.extend_from_slice(&chunk[..n]);
        }
    }

    fn integer(&mut self, cmd: &Command) -> StoreResult<i64> {
        let name = cmd.name();
        expect_integer(&name, self.execute(cmd)?)
    }

    fn members(&mut self, cmd: &Command) -> StoreResult<Vec<String>> {
        let name = cmd.name();
        expect_members(&name, self.execute(cmd)?)
    }
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient")
            .field("address", &self.config.address())
            .field("broken", &self.broken)
            .finish()
    }
}

impl SetStore for RedisClient {
    fn ping(&mut self) -> StoreResult<()> {
        match self.execute(&Command::new("PING"))? {
            Reply::Status(s) if s == "PONG" => Ok(()),
            Reply::Error(msg) => Err(StoreError::protocol("PING", msg)),
            other => Err(StoreError::reply_type("PING", "PONG", other.type_name())),
        }
    }

    fn hash_set(&mut self, key: &str, field: &str, value: &[u8]) -> StoreResult<i64> {
        self.integer(&Command::new("HSET").arg(key).arg(field).arg(value))
    }

    fn hash_get(&mut self, key: &str, field: &str) -> StoreResult<Vec<u8>> {
        match self.execute(&Command::new("HGET").arg(key).arg(field))? {
            Reply::Bulk(Some(data)) => Ok(data),
            Reply::Bulk(None) => Err(StoreError::NotFound(format!("{key} {field}"))),
            Reply::Error(msg) => Err(StoreError::protocol("HGET", msg)),
            other => Err(StoreError::reply_type("HGET", "bulk", other.type_name())),
        }
    }

    fn set_add(&mut self, key: &str, member: &str) -> StoreResult<i64> {
        self.integer(&Command::new("SADD").arg(key).arg(member))
    }

    fn set_remove(&mut self, key: &str, member: &str) -> StoreResult<i64> {
        self.integer(&Command::new("SREM").arg(key).arg(member))
    }

    fn set_members(&mut self, key: &str) -> StoreResult<Vec<String>> {
        self.members(&Command::new("SMEMBERS").arg(key))
    }

    fn set_card(&mut self, key: &str) -> StoreResult<i64> {
        self.integer(&Command::new("SCARD").arg(key))
    }

    fn set_algebra(&mut self, op: SetOp, keys: &[String]) -> StoreResult<Vec<String>> {
        validate_keys(op.command(), keys)?;
        self.members(&Command::new(op.command()).args(keys))
    }

    fn set_algebra_store(&mut self, op: SetOp, dest: &str, keys: &[String]) -> StoreResult<i64> {
        validate_keys(op.store_command(), keys)?;
        self.integer(&Command::new(op.store_command()).arg(dest).args(keys))
    }

    fn expire(&mut self, key: &str, ttl_seconds: i64) -> StoreResult<()> {
        validate_ttl(ttl_seconds)?;
        match self.integer(&Command::new("EXPIRE").arg(key).int_arg(ttl_seconds))? {
            0 => Err(StoreError::NotFound(format!("EXPIRE: key {key} not found"))),
            _ => Ok(()),
        }
    }

    fn ttl(&mut self, key: &str) -> StoreResult<KeyTtl> {
        Ok(KeyTtl::from_reply(self.integer(&Command::new("TTL").arg(key))?))
    }

    fn run_atomic(
        &mut self,
        script: AtomicScript,
        keys: &[String],
        args: &[Vec<u8>],
    ) -> StoreResult<i64> {
        script.validate(keys, args)?;
        let cmd = Command::new("EVAL")
            .arg(script.body())
            .arg(keys.len().to_string())
            .args(keys)
            .args(args);
        debug!(script = script.name(), keys = keys.len(), "running atomic script");
        let label = format!("EVAL({})", script.name());
        expect_integer(&label, self.execute(&cmd)?)
    }

    fn delete(&mut self, key: &str) -> StoreResult<i64> {
        self.integer(&Command::new("DEL").arg(key))
    }
}

fn expect_integer(command: &str, reply: Reply) -> StoreResult<i64> {
    match reply {
        Reply::Integer(n) => Ok(n),
        Reply::Error(msg) => Err(StoreError::protocol(command, msg)),
        other => Err(StoreError::reply_type(command, "integer", other.type_name())),
    }
}

fn expect_members(command: &str, reply: Reply) -> StoreResult<Vec<String>> {
    let items = match reply {
        Reply::Array(Some(items)) => items,
        Reply::Error(msg) => return Err(StoreError::protocol(command, msg)),
        other => return Err(StoreError::reply_type(command, "array", other.type_name())),
    };
    items
        .into_iter()
        .map(|item| match item {
            Reply::Bulk(Some(data)) => String::from_utf8(data)
                .map_err(|_| StoreError::reply_type(command, "UTF-8 member", "binary data")),
            other => Err(StoreError::reply_type(command, "bulk member", other.type_name())),
        })
        .collect()
}
