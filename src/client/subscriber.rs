//! Subscriber handle
//!
//! The registry never writes to a socket. It holds a `Subscriber`, which is
//! the sending side of a bounded per-connection outbox; the session's writer
//! task drains the other side into the connection's sink.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::client::ConnectionId;

/// Outcome of one non-blocking delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The line is queued for the writer task.
    Queued,
    /// The outbox is full; this line is dropped for this subscriber only.
    Dropped,
    /// The writer side is gone; the subscriber must be evicted.
    Closed,
}

#[derive(Debug, Clone)]
pub struct Subscriber {
    pub id: ConnectionId,
    outbox: mpsc::Sender<Arc<str>>,
}

impl Subscriber {
    /// Create a subscriber handle and the receiving end of its outbox.
    ///
    /// A zero capacity is raised to one.
    pub fn channel(id: ConnectionId, capacity: usize) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (outbox, rx) = mpsc::channel(capacity.max(1));
        (Self { id, outbox }, rx)
    }

    pub fn deliver(&self, line: &Arc<str>) -> Delivery {
        match self.outbox.try_send(Arc::clone(line)) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Dropped,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.outbox.is_closed()
    }
}
