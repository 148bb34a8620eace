//! Detached daemon process spawning.

use std::process::{Child, Command, Stdio};

use camino::Utf8Path;
use ttp_config::defaults::NODE_CONFIG_ENV_VAR;

use super::error::LaunchError;

/// Command line handed to a daemon: its record, interrupts ignored, then
/// the operator's extra arguments.
pub(crate) fn daemon_arguments(json: &Utf8Path, extra: &[String]) -> Vec<String> {
    ["--json".to_string(), json.to_string(), "--ignore-int".to_string()]
        .into_iter()
        .chain(extra.iter().cloned())
        .collect()
}

/// Spawns `binary` in its own process group with null stdio.
pub(super) fn spawn_detached(
    binary: &Utf8Path,
    arguments: &[String],
    node_path: Option<&Utf8Path>,
) -> Result<Child, LaunchError> {
    let mut command = Command::new(binary.as_std_path());
    command
        .args(arguments)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if let Some(path) = node_path {
        command.env(NODE_CONFIG_ENV_VAR, path.as_str());
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.spawn().map_err(|source| LaunchError::Spawn {
        binary: binary.to_path_buf(),
        source,
    })
}
