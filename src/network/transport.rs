// src/network/transport.rs
//
// One-shot request/response over TCP: connect, write one line, read one
// line, close. Every round trip runs under a single deadline.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::config::Config;
use crate::error::TransportError;
use crate::events::{emit_network_event, LogLevel};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `line` to `addr` and return the single reply line (without the
    /// trailing newline).
    async fn request(&self, addr: &str, line: &str) -> Result<String, TransportError>;
}

#[derive(Debug, Clone)]
pub struct TcpTransport {
    timeout: Duration,
    max_line_bytes: usize,
}

impl TcpTransport {
    pub fn new(timeout: Duration, max_line_bytes: usize) -> Self {
        Self {
            timeout,
            max_line_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.request_timeout(), config.max_line_bytes())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn round_trip(&self, addr: &str, line: &str) -> Result<String, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| TransportError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        let (read_half, mut write_half) = stream.into_split();
        write_line(&mut write_half, line)
            .await
            .map_err(|source| TransportError::Io {
                addr: addr.to_string(),
                source,
            })?;
        let mut reader = BufReader::new(read_half);
        match read_line_bounded(&mut reader, self.max_line_bytes).await {
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => Err(TransportError::Closed {
                addr: addr.to_string(),
            }),
            Err(ReadLineError::TooLong) => Err(TransportError::LineTooLong {
                addr: addr.to_string(),
                limit: self.max_line_bytes,
            }),
            Err(ReadLineError::Io(source)) => Err(TransportError::Io {
                addr: addr.to_string(),
                source,
            }),
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn request(&self, addr: &str, line: &str) -> Result<String, TransportError> {
        emit_network_event(
            "transport",
            LogLevel::Debug,
            "request_start",
            Some(addr.to_string()),
            Some(line.split(':').next().unwrap_or_default().to_string()),
        );
        // Dropping the round-trip future on expiry closes the socket.
        let result = match tokio::time::timeout(self.timeout, self.round_trip(addr, line)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                addr: addr.to_string(),
                after: self.timeout,
            }),
        };
        if let Err(e) = &result {
            emit_network_event(
                "transport",
                LogLevel::Warn,
                "request_failed",
                Some(addr.to_string()),
                Some(e.to_string()),
            );
        }
        result
    }
}

#[derive(Debug)]
pub(crate) enum ReadLineError {
    TooLong,
    Io(std::io::Error),
}

impl From<std::io::Error> for ReadLineError {
    fn from(e: std::io::Error) -> Self {
        ReadLineError::Io(e)
    }
}

/// Read a single `\n`-terminated line of at most `limit` bytes. A final line
/// without terminator is accepted at EOF. `Ok(None)` means the peer closed
/// before sending anything.
pub(crate) async fn read_line_bounded<R>(
    reader: &mut R,
    limit: usize,
) -> Result<Option<String>, ReadLineError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = (&mut *reader)
        .take(limit as u64 + 1)
        .read_until(b'\n', &mut buf)
        .await?;
    if n == 0 {
        return Ok(None);
    }
    if buf.last() != Some(&b'\n') && buf.len() > limit {
        return Err(ReadLineError::TooLong);
    }
    let text = String::from_utf8(buf)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(Some(
        text.trim_end_matches(|c| c == '\r' || c == '\n').to_string(),
    ))
}

pub(crate) async fn write_line<W>(writer: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut framed = String::with_capacity(line.len() + 1);
    framed.push_str(line);
    framed.push('\n');
    writer.write_all(framed.as_bytes()).await?;
    writer.flush().await
}
