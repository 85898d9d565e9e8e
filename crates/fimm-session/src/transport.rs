//! Framed transport over the engine's console socket.
//!
//! Wire format: one newline-free command line out (NUL-terminated), one
//! response blob back, terminated by a single NUL sentinel.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Sentinel byte terminating each side's message.
const SENTINEL: u8 = 0;

/// Line-out/blob-in framing over some byte stream.
///
/// This is the seam to the raw read/write layer: callers hand over one
/// command line and receive one completed response blob, never partial
/// data.
#[async_trait]
pub trait Transport: Send {
    /// Send a single command line (framing added here).
    async fn send_line(&mut self, line: &str) -> io::Result<()>;

    /// Receive one complete response blob, sentinel stripped.
    async fn recv_blob(&mut self) -> io::Result<String>;
}

/// TCP transport used against a live engine.
pub struct TcpTransport {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TcpTransport {
    #[must_use]
    pub fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(&[SENTINEL]).await?;
        self.writer.flush().await
    }

    async fn recv_blob(&mut self) -> io::Result<String> {
        let mut buf = Vec::new();
        let read = self.reader.read_until(SENTINEL, &mut buf).await?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "engine closed the connection",
            ));
        }
        if buf.last() == Some(&SENTINEL) {
            buf.pop();
        }
        String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}
