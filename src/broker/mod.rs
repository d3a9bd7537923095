//! The `broker` module holds the shared state of the broker: the topic
//! registry, the per-topic subscriber sets and the fan-out of published
//! messages.

pub mod message;
pub mod registry;
pub mod topic;

pub use message::{Framing, Message};
pub use registry::Registry;
pub use topic::Topic;
