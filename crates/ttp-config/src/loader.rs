//! Loading the daemon and node records from JSON files.

use std::fs;
use std::io;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::daemon::{DaemonConfig, DaemonRecord, ValidationMode};
use crate::node::NodeConfig;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration '{path}': {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    /// The file is not valid JSON for the expected record.
    #[error("failed to parse configuration '{path}': {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Mandatory checks failed.
    #[error("configuration '{path}' rejected: {}", errors.join("; "))]
    Rejected { path: Utf8PathBuf, errors: Vec<String> },
}

/// Daemon and node configuration loaded together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub daemon: DaemonConfig,
    pub node: NodeConfig,
}

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads (or re-resolves) the daemon configuration.
    fn load(&self) -> Result<LoadedConfig, Arc<ConfigError>>;
}

/// Loader reading the daemon record and an optional node file from disk.
#[derive(Debug, Clone)]
pub struct JsonConfigLoader {
    daemon_path: Utf8PathBuf,
    node_path: Option<Utf8PathBuf>,
    mode: ValidationMode,
}

impl JsonConfigLoader {
    /// Builds a loader for the daemon record at `daemon_path`.
    #[must_use]
    pub fn new(daemon_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            daemon_path: daemon_path.into(),
            node_path: None,
            mode: ValidationMode::default(),
        }
    }

    /// Reads node settings from `node_path`.
    #[must_use]
    pub fn with_node_path(mut self, node_path: Option<Utf8PathBuf>) -> Self {
        self.node_path = node_path;
        self
    }

    /// Applies the given validation mode.
    #[must_use]
    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Path of the daemon record.
    #[must_use]
    pub fn daemon_path(&self) -> &Utf8Path {
        &self.daemon_path
    }
}

impl ConfigLoader for JsonConfigLoader {
    fn load(&self) -> Result<LoadedConfig, Arc<ConfigError>> {
        let record: DaemonRecord = read_json(&self.daemon_path).map_err(Arc::new)?;
        let daemon = DaemonConfig::from_record(&self.daemon_path, record, self.mode).map_err(
            |errors| {
                Arc::new(ConfigError::Rejected {
                    path: self.daemon_path.clone(),
                    errors,
                })
            },
        )?;
        let node = load_node_config(self.node_path.as_deref()).map_err(Arc::new)?;
        debug!(
            target: crate::CONFIG_TARGET,
            daemon = daemon.name(),
            path = %self.daemon_path,
            warnings = daemon.warnings().len(),
            "daemon configuration resolved"
        );
        Ok(LoadedConfig { daemon, node })
    }
}

/// Reads node settings from `path`, or from the file named by
/// `TTP_NODE_CONFIG` when no path is given. Defaults apply when neither is
/// set.
pub fn load_node_config(path: Option<&Utf8Path>) -> Result<NodeConfig, ConfigError> {
    let from_env = || {
        std::env::var(crate::defaults::NODE_CONFIG_ENV_VAR)
            .ok()
            .filter(|value| !value.is_empty())
            .map(Utf8PathBuf::from)
    };
    match path.map(Utf8Path::to_path_buf).or_else(from_env) {
        Some(path) => read_json(&path),
        None => {
            debug!(target: crate::CONFIG_TARGET, "no node configuration; using defaults");
            Ok(NodeConfig::default())
        }
    }
}

/// Loader that returns a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: LoadedConfig,
}

impl StaticConfigLoader {
    /// Wraps an already validated configuration.
    #[must_use]
    pub fn new(config: LoadedConfig) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<LoadedConfig, Arc<ConfigError>> {
        Ok(self.config.clone())
    }
}

fn read_json<T>(path: &Utf8Path) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned,
{
    let content = fs::read_to_string(path.as_std_path()).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
