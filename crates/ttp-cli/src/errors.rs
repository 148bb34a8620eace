//! Errors surfaced by the operator CLI.

use std::io;
use std::sync::Arc;

use thiserror::Error;
use ttp_config::ConfigError;
use ttp_metrics::BusError;

use crate::lifecycle::LaunchError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Config(#[from] Arc<ConfigError>),
    #[error(transparent)]
    NodeConfig(#[from] ConfigError),
    #[error("failed to connect to daemon at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to exchange request with daemon at {endpoint}: {source}")]
    Exchange {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("daemon at {endpoint} closed the connection without an answer")]
    NoAnswer { endpoint: String },
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
}
