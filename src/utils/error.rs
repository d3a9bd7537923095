//! Error types shared by the broker layers.
//!
//! Each layer gets its own enum: `ConnectionError` for transport adapters,
//! `ProtocolError` for a peer's malformed first line, and `ServerError` for
//! the startup failures that abort the process.

use std::io;

use thiserror::Error;

/// Failure reading from or writing to one peer.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("connection closed")]
    Closed,

    #[error("idle timeout")]
    IdleTimeout,

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}

/// A first line that does not classify the peer.
///
/// The `Display` output is the exact reply sent back to the peer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("ERR protocol: use 'SUBSCRIBE <topic>' or 'PUBLISH <topic>'")]
    Malformed,

    #[error("ERR unknown role")]
    UnknownRole(String),
}

/// Fatal startup errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {transport} listener on {addr}: {source}")]
    Bind {
        transport: &'static str,
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
