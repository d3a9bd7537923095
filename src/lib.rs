//! # publine
//!
//! `publine` is a minimal topic-based publish/subscribe broker speaking a
//! plain text line protocol. Publishers bind to one topic and send
//! `MESSAGE` lines; the broker fans each one out to every connection that
//! is currently subscribed to that topic.
//!
//! ## Core Modules
//!
//! - `broker`: the topic registry, subscriber sets and the broadcast engine.
//! - `client`: the transport-neutral connection abstraction and subscriber handle.
//! - `config`: loading and merging configuration.
//! - `session`: the per-connection protocol state machine.
//! - `transport`: TCP, UDP, WebSocket and in-memory adapters plus the listener.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod session;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod tests;
