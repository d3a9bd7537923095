//! The `session` module drives one connection through the line protocol.
//!
//! `command` parses protocol lines; `handler` runs the per-connection state
//! machine (`AwaitingRole -> SubscriberLoop | PublisherLoop -> Closed`)
//! against a shared `Registry`.

pub mod command;
pub mod handler;

pub use command::{Role, RoleLine, parse_message, parse_role_line, parse_subscribe};
pub use handler::{Session, SessionConfig, SessionEnd};
