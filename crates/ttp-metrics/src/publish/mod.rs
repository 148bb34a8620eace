//! Channel publishers.
//!
//! Each publisher turns a [`Metric`] into one side effect on its medium and
//! reports a [`PublishStatus`]. Failures are values: nothing in this module
//! aborts the caller.

mod bus;
mod pushgateway;
mod textfile;

use camino::Utf8PathBuf;
use strum::Display;
use ttp_config::{ChannelKind, ChannelSwitches, NodeConfig};
use url::Url;

use crate::metric::Metric;

pub use bus::{BusPublisher, CommandFailure, CommandRunner, ShellCommandRunner};
pub use pushgateway::{HttpTransport, PushGatewayPublisher, TransportFailure, UreqTransport};
pub use textfile::{TextFilePublisher, series_file_name};

pub(crate) const PUBLISH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::publish");

/// Outcome of publishing one metric on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishStatus {
    Published,
    DisabledByConfiguration,
    ValueUnavailable,
    ValueUnsuited,
    NameUnavailable,
    CommandError,
    #[strum(to_string = "NOURL")]
    NoUrl,
    RequestError,
    #[strum(to_string = "NODROPDIR")]
    NoDropDir,
    WriteError,
}

impl PublishStatus {
    /// Numeric reason code; zero on success.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Published => 0,
            Self::DisabledByConfiguration => 1,
            Self::ValueUnavailable => 2,
            Self::ValueUnsuited => 3,
            Self::NameUnavailable => 4,
            Self::CommandError => 5,
            Self::NoUrl => 6,
            Self::RequestError => 7,
            Self::NoDropDir => 8,
            Self::WriteError => 9,
        }
    }

    #[must_use]
    pub const fn is_published(self) -> bool {
        matches!(self, Self::Published)
    }
}

/// Settings the publishers need for one advertising round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSettings {
    pub node: String,
    pub topic_template: String,
    pub publish_command: String,
    pub pushgateway_url: Option<Url>,
    pub drop_dir: Option<Utf8PathBuf>,
    pub switches: ChannelSwitches,
    pub dry_run: bool,
}

impl ChannelSettings {
    /// Derives channel settings from the node configuration.
    #[must_use]
    pub fn from_node(node: &NodeConfig, switches: ChannelSwitches) -> Self {
        let telemetry = &node.telemetry;
        Self {
            node: node.node_name(),
            topic_template: telemetry.topic_template.clone(),
            publish_command: telemetry.publish_command.clone(),
            pushgateway_url: telemetry.pushgateway.url.clone(),
            drop_dir: telemetry.textfile.drop_dir.clone(),
            switches,
            dry_run: telemetry.dry_run,
        }
    }
}

/// A medium a metric can be published on.
pub trait ChannelPublisher {
    /// Channel this publisher writes to.
    fn kind(&self) -> ChannelKind;

    /// Publishes `metric`, prepending `caller_prefix` to its name.
    fn publish(&self, metric: &Metric, caller_prefix: &str) -> PublishStatus;
}

/// Checks shared by every channel, run before any I/O.
///
/// Returns the numeric value when the channel needs one.
pub(crate) fn precheck(
    settings: &ChannelSettings,
    kind: ChannelKind,
    metric: &Metric,
    numeric: bool,
) -> Result<Option<f64>, PublishStatus> {
    if !settings.switches.enabled(kind) {
        return Err(PublishStatus::DisabledByConfiguration);
    }
    match kind {
        ChannelKind::PushGateway if settings.pushgateway_url.is_none() => {
            return Err(PublishStatus::NoUrl);
        }
        ChannelKind::TextFile if settings.drop_dir.is_none() => {
            return Err(PublishStatus::NoDropDir);
        }
        _ => {}
    }
    if metric.value().is_unavailable() {
        return Err(PublishStatus::ValueUnavailable);
    }
    let value = metric.value().as_number();
    if numeric && value.is_none() {
        return Err(PublishStatus::ValueUnsuited);
    }
    if metric.name().is_empty() {
        return Err(PublishStatus::NameUnavailable);
    }
    Ok(value)
}

pub(crate) fn log_outcome(kind: ChannelKind, name: &str, status: PublishStatus) {
    if status.is_published() {
        tracing::debug!(target: PUBLISH_TARGET, channel = %kind, metric = name, "metric published");
    } else {
        tracing::debug!(
            target: PUBLISH_TARGET,
            channel = %kind,
            metric = name,
            reason = %status,
            code = status.code(),
            "metric not published"
        );
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub(crate) fn settings() -> ChannelSettings {
        ChannelSettings {
            node: "ws12".into(),
            topic_template: ttp_config::defaults::DEFAULT_TOPIC_TEMPLATE.into(),
            publish_command: ttp_config::defaults::DEFAULT_PUBLISH_COMMAND.into(),
            pushgateway_url: Some(
                Url::parse("http://gateway:9091/metrics/job/ttp").expect("static url"),
            ),
            drop_dir: None,
            switches: ChannelSwitches::all(),
            dry_run: false,
        }
    }
}
