//! Error types for protocol exchanges.

use std::io;

use thiserror::Error;

/// Errors surfaced while serving one connection.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The client closed the connection without sending a command.
    #[error("client sent no command")]
    EmptyRequest,
    /// Reading the request failed.
    #[error("failed to read request: {0}")]
    Read(#[source] io::Error),
    /// Writing the answer failed.
    #[error("failed to write answer: {0}")]
    Write(#[source] io::Error),
}
