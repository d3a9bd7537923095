//! The `transport` module binds the broker to the network.
//!
//! Each adapter turns its own notion of a peer into a `Connection`:
//! - `tcp`: LF-terminated lines over a TCP stream
//! - `udp`: one datagram per line, one peer address per connection
//! - `websocket`: one text frame per line
//! - `memory`: in-process channels
//!
//! `server` owns the accept loops and the connection limit.

pub mod memory;
pub mod server;
pub mod tcp;
pub mod udp;
pub mod websocket;

pub use server::{Listener, SERVER_BUSY};
