//! RedisQueueWriter - RPUSH records onto a Redis list
//!
//! Speaks just enough of the Redis protocol (RESP) for `SELECT` and `RPUSH`.
//! The connection is opened on first use and dropped after any failure, so a
//! later call starts from a fresh connection.

use std::time::Duration;

use contracts::{ContractError, QueueConfig, QueueWriter};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

/// Largest bulk reply accepted; `SELECT` and `RPUSH` never answer with one
pub const MAX_BULK_LEN: usize = 64 * 1024;

/// Single reply as read off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Status(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
}

/// Encode a command as a RESP array of bulk strings
pub fn encode_command(args: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + args.iter().map(|a| a.len() + 16).sum::<usize>());
    out.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Read one non-aggregate reply
pub async fn read_reply<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<Reply> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(std::io::ErrorKind::UnexpectedEof.into());
    }
    let line = line.trim_end_matches(['\r', '\n']);
    let mut chars = line.chars();
    let kind = chars.next();
    let body = chars.as_str();

    match kind {
        Some('+') => Ok(Reply::Status(body.to_string())),
        Some('-') => Ok(Reply::Error(body.to_string())),
        Some(':') => body.parse().map(Reply::Integer).map_err(invalid_data),
        Some('$') => {
            let len: i64 = body.parse().map_err(invalid_data)?;
            if len < 0 {
                return Ok(Reply::Bulk(None));
            }
            let len = usize::try_from(len)
                .ok()
                .filter(|len| *len <= MAX_BULK_LEN)
                .ok_or_else(|| {
                    invalid_data(format!("bulk reply of {len} bytes exceeds {MAX_BULK_LEN}"))
                })?;
            let mut data = vec![0u8; len + 2];
            reader.read_exact(&mut data).await?;
            data.truncate(len);
            Ok(Reply::Bulk(Some(data)))
        }
        _ => Err(invalid_data(format!("unsupported reply: {line:?}"))),
    }
}

fn invalid_data(e: impl ToString) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
}

/// Send one command and wait for its reply
async fn execute<S>(stream: &mut S, args: &[&[u8]]) -> std::io::Result<Reply>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    stream.write_all(&encode_command(args)).await?;
    stream.flush().await?;
    read_reply(stream).await
}

/// Queue writer backed by a Redis list
pub struct RedisQueueWriter {
    name: String,
    host: String,
    port: u16,
    db: u32,
    timeout: Duration,
    conn: Mutex<Option<BufStream<TcpStream>>>,
}

impl RedisQueueWriter {
    pub const NAME: &'static str = "redis";

    /// Create the writer; the connection is opened lazily
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            name: Self::NAME.to_string(),
            host: config.host.clone(),
            port: config.port,
            db: config.db,
            timeout: Duration::from_millis(config.timeout_ms),
            conn: Mutex::new(None),
        }
    }

    async fn open(&self) -> Result<BufStream<TcpStream>, ContractError> {
        let tcp = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| ContractError::sink_connection(&self.name, e.to_string()))?;
        let mut stream = BufStream::new(tcp);

        if self.db != 0 {
            let db = self.db.to_string();
            match execute(&mut stream, &[b"SELECT", db.as_bytes()]).await? {
                Reply::Status(_) => {}
                other => return Err(self.unexpected("SELECT", other)),
            }
        }

        debug!(sink = %self.name, host = %self.host, port = self.port, db = self.db, "Connected");
        Ok(stream)
    }

    async fn rpush(
        &self,
        slot: &mut Option<BufStream<TcpStream>>,
        key: &str,
        records: &[String],
    ) -> Result<i64, ContractError> {
        if slot.is_none() {
            *slot = Some(self.open().await?);
        }
        let Some(stream) = slot.as_mut() else {
            return Err(ContractError::sink_connection(&self.name, "not connected"));
        };

        let mut args: Vec<&[u8]> = Vec::with_capacity(records.len() + 2);
        args.push(b"RPUSH");
        args.push(key.as_bytes());
        args.extend(records.iter().map(|r| r.as_bytes()));

        match execute(stream, &args).await? {
            Reply::Integer(len) => Ok(len),
            other => Err(self.unexpected("RPUSH", other)),
        }
    }

    fn unexpected(&self, command: &str, reply: Reply) -> ContractError {
        let message = match reply {
            Reply::Error(e) => format!("{command} failed: {e}"),
            other => format!("{command} unexpected reply: {other:?}"),
        };
        ContractError::sink_write(&self.name, message)
    }
}

impl QueueWriter for RedisQueueWriter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "redis_append_many",
        skip(self, records),
        fields(sink = %self.name, records = records.len())
    )]
    async fn append_many(&self, key: &str, records: &[String]) -> Result<(), ContractError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().await;
        let result = match timeout(self.timeout, self.rpush(&mut conn, key, records)).await {
            Ok(result) => result,
            Err(_) => Err(ContractError::sink_write(
                &self.name,
                format!("timed out after {:?}", self.timeout),
            )),
        };

        match result {
            Ok(len) => {
                debug!(sink = %self.name, key, list_len = len, "Records appended");
                Ok(())
            }
            Err(e) => {
                if conn.take().is_some() {
                    warn!(sink = %self.name, "Dropping connection after failure");
                }
                Err(e)
            }
        }
    }
}
