//! Configuration records shared by the TTP daemon runtime and its operator
//! tooling.
//!
//! Two records are consumed: the per-daemon JSON record (listening port,
//! worker executable, advertising cadences) and the node-level settings
//! (node name, MQTT broker, telemetry channel endpoints). Interval values
//! below their documented floor are replaced by their default and reported
//! as [`ConfigWarning`]s; mandatory-field failures reject the record unless
//! lenient mode is requested.

mod capability;
mod daemon;
pub mod defaults;
mod interval;
mod loader;
mod logging;
mod node;

pub use capability::{ChannelKind, ChannelSwitches, Enableable, JsonConfigured};
pub use daemon::{DaemonConfig, DaemonRecord, ValidationMode};
pub use defaults::{DEFAULT_LOG_FILTER, default_log_format};
pub use interval::{ConfigWarning, IntervalRule};
pub use loader::{
    ConfigError, ConfigLoader, JsonConfigLoader, LoadedConfig, StaticConfigLoader,
    load_node_config,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use node::{MqttSettings, NodeConfig, PushGatewaySettings, TelemetrySettings, TextFileSettings};

pub(crate) const CONFIG_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::config");
