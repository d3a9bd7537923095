//! The `utils` module provides shared definitions used across the `publine`
//! broker: the error types every layer returns and the logging initialiser.

pub mod error;
pub mod logging;

pub use error::{ConnectionError, ProtocolError, ServerError};
