//! TCP line transport
//!
//! One LF-terminated line per command in each direction. The stream is split
//! so a subscriber's writer task can own the write half while the session
//! keeps reading.

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::client::{Connection, LineSink, LineSource, normalize_line};
use crate::utils::ConnectionError;

pub struct TcpLineSource {
    reader: BufReader<OwnedReadHalf>,
    max_line_bytes: usize,
}

#[async_trait]
impl LineSource for TcpLineSource {
    async fn receive_line(&mut self) -> Result<Option<String>, ConnectionError> {
        Ok(read_bounded_line(&mut self.reader, self.max_line_bytes).await?)
    }
}

pub struct TcpLineSink {
    writer: OwnedWriteHalf,
}

#[async_trait]
impl LineSink for TcpLineSink {
    async fn send(&mut self, line: &str) -> Result<(), ConnectionError> {
        let mut framed = String::with_capacity(line.len() + 1);
        framed.push_str(line);
        framed.push('\n');
        self.writer.write_all(framed.as_bytes()).await?;
        Ok(())
    }

    async fn close(&mut self) {
        let _ = self.writer.shutdown().await;
    }
}

pub fn connection(stream: TcpStream, peer: SocketAddr, max_line_bytes: usize) -> Connection {
    let (read, write) = stream.into_split();
    Connection::new(
        peer.to_string(),
        TcpLineSource {
            reader: BufReader::new(read),
            max_line_bytes,
        },
        TcpLineSink { writer: write },
    )
}

/// Read one line of at most `max` bytes.
///
/// A longer line is truncated and the rest of it, up to and including its
/// LF, is discarded. A final line without LF is still returned.
pub async fn read_bounded_line<R>(reader: &mut R, max: usize) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = (&mut *reader)
        .take(max as u64)
        .read_until(b'\n', &mut buf)
        .await?;
    if n == 0 {
        return Ok(None);
    }
    if buf.last() != Some(&b'\n') && buf.len() >= max {
        discard_rest_of_line(reader).await?;
    }
    Ok(Some(normalize_line(&buf, max)))
}

async fn discard_rest_of_line<R>(reader: &mut R) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|b| *b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}
