//! The `client` module defines how the broker sees one connected peer.
//!
//! It provides the transport-neutral `Connection` (an identity plus a line
//! source and a line sink) and the `Subscriber` handle the registry stores
//! for every subscribed connection.

pub mod connection;
pub mod subscriber;

pub use connection::{Connection, ConnectionId, LineSink, LineSource, normalize_line};
pub use subscriber::{Delivery, Subscriber};
