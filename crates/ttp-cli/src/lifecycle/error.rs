use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while launching a daemon.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to spawn daemon binary '{binary}': {source}")]
    Spawn {
        binary: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}
