//! In-process transport
//!
//! `pair` returns a broker-side `Connection` and the `MemoryPeer` that plays
//! the remote end. Lines travel over unbounded channels, so this adapter is
//! used to embed the broker in another process and to drive sessions in
//! tests without sockets.

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::client::{Connection, LineSink, LineSource};
use crate::utils::ConnectionError;

pub struct MemorySource {
    rx: UnboundedReceiver<String>,
}

#[async_trait]
impl LineSource for MemorySource {
    async fn receive_line(&mut self) -> Result<Option<String>, ConnectionError> {
        Ok(self.rx.recv().await)
    }
}

pub struct MemorySink {
    tx: Option<UnboundedSender<String>>,
}

#[async_trait]
impl LineSink for MemorySink {
    async fn send(&mut self, line: &str) -> Result<(), ConnectionError> {
        let tx = self.tx.as_ref().ok_or(ConnectionError::Closed)?;
        tx.send(line.to_string()).map_err(|_| ConnectionError::Closed)
    }

    async fn close(&mut self) {
        self.tx = None;
    }
}

/// The remote end of an in-memory connection.
#[derive(Debug)]
pub struct MemoryPeer {
    tx: Option<UnboundedSender<String>>,
    rx: UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// Send one line to the broker. Returns false once the input is closed.
    pub fn send_line(&self, line: &str) -> bool {
        self.tx
            .as_ref()
            .is_some_and(|tx| tx.send(line.to_string()).is_ok())
    }

    /// Next line written by the broker; `None` once the broker closed its side.
    pub async fn recv_line(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    pub fn try_recv_line(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Signal end of input, as a peer closing its write side would.
    pub fn close_input(&mut self) {
        self.tx = None;
    }
}

pub fn pair(peer: &str) -> (Connection, MemoryPeer) {
    let (to_broker, from_peer) = mpsc::unbounded_channel();
    let (to_peer, from_broker) = mpsc::unbounded_channel();
    let conn = Connection::new(
        peer,
        MemorySource { rx: from_peer },
        MemorySink { tx: Some(to_peer) },
    );
    let remote = MemoryPeer {
        tx: Some(to_broker),
        rx: from_broker,
    };
    (conn, remote)
}
