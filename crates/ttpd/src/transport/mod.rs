//! Control socket for the daemon command protocol.
//!
//! The listener is non-blocking: each listen tick performs at most one
//! `accept`, and returns at once when no client is waiting. An accepted
//! connection is switched back to blocking mode and read with a single
//! bounded `recv`.

mod errors;
mod listener;

pub use self::errors::ListenerError;
pub(crate) use self::listener::{Accepted, ControlListener, read_request};

pub(crate) const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Size of the single read performed per request.
pub const REQUEST_BUFFER_BYTES: usize = 1024;
