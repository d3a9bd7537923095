//! Connection abstraction
//!
//! Every transport adapter (TCP, UDP, WebSocket, in-memory) produces a
//! `Connection`. The session layer only ever talks to the two trait objects
//! it carries, so the broker core never sees sockets, frames or datagrams.

use std::fmt;

use async_trait::async_trait;
use uuid::Uuid;

use crate::utils::ConnectionError;

/// Opaque identity of one live connection, usable as a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Inbound half: yields one protocol line at a time.
///
/// `Ok(None)` means the peer is gone (EOF, close frame, dropped channel).
#[async_trait]
pub trait LineSource: Send {
    async fn receive_line(&mut self) -> Result<Option<String>, ConnectionError>;
}

/// Outbound half. `line` never carries a terminator; adapters add their own.
#[async_trait]
pub trait LineSink: Send {
    async fn send(&mut self, line: &str) -> Result<(), ConnectionError>;

    async fn close(&mut self) {}
}

/// One attached peer.
pub struct Connection {
    pub id: ConnectionId,
    pub peer: String,
    pub source: Box<dyn LineSource>,
    pub sink: Box<dyn LineSink>,
}

impl Connection {
    pub fn new(
        peer: impl Into<String>,
        source: impl LineSource + 'static,
        sink: impl LineSink + 'static,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            peer: peer.into(),
            source: Box::new(source),
            sink: Box::new(sink),
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

/// Turns raw bytes of one line into protocol text.
///
/// Strips the trailing LF (and CR), replaces invalid UTF-8, and truncates to
/// at most `max_bytes` on a character boundary.
pub fn normalize_line(raw: &[u8], max_bytes: usize) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let mut line = String::from_utf8_lossy(raw).into_owned();
    if line.len() > max_bytes {
        let mut cut = max_bytes;
        while !line.is_char_boundary(cut) {
            cut -= 1;
        }
        line.truncate(cut);
    }
    line
}
