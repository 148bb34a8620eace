//! Launching daemons.
//!
//! A daemon is started from its configuration record: the record is loaded
//! and validated first, then `execPath` is spawned detached from the
//! operator's terminal and session. The CLI does not wait for the daemon.

mod error;
mod spawning;

use camino::Utf8Path;
use ttp_config::{DaemonConfig, JsonConfigured};

pub use self::error::LaunchError;
pub(crate) use self::spawning::daemon_arguments;
use self::spawning::spawn_detached;

/// Spawns the daemon described by `config` and returns its pid.
///
/// `node_path` is handed to the daemon through `TTP_NODE_CONFIG`.
pub(crate) fn start(
    config: &DaemonConfig,
    node_path: Option<&Utf8Path>,
    extra: &[String],
) -> Result<u32, LaunchError> {
    let arguments = daemon_arguments(config.json_path(), extra);
    let child = spawn_detached(config.exec_path(), &arguments, node_path)?;
    Ok(child.id())
}
