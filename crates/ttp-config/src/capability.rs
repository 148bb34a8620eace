//! Narrow capability traits shared by configured components.

use std::fmt;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Something that can be switched off by configuration.
pub trait Enableable {
    /// Returns whether the component is enabled.
    fn is_enabled(&self) -> bool;
}

/// Something whose settings were read from a JSON file.
pub trait JsonConfigured {
    /// Path of the JSON file the settings came from.
    fn json_path(&self) -> &Utf8Path;
}

/// The three telemetry channels a metric can be published on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    EnumString,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ChannelKind {
    /// Publish/subscribe bus.
    Bus,
    /// HTTP push gateway.
    #[strum(to_string = "pushgateway")]
    #[serde(rename = "pushgateway")]
    PushGateway,
    /// Local text-metrics drop directory.
    #[strum(to_string = "textfile")]
    #[serde(rename = "textfile")]
    TextFile,
}

impl ChannelKind {
    /// Every channel, in advertising order.
    pub const ALL: [Self; 3] = [Self::Bus, Self::PushGateway, Self::TextFile];
}

/// Per-channel enable switches.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelSwitches {
    pub bus: bool,
    pub push_gateway: bool,
    pub text_file: bool,
}

impl ChannelSwitches {
    /// Switches with every channel enabled.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            bus: true,
            push_gateway: true,
            text_file: true,
        }
    }

    /// Returns whether the given channel is switched on.
    #[must_use]
    pub const fn enabled(&self, kind: ChannelKind) -> bool {
        match kind {
            ChannelKind::Bus => self.bus,
            ChannelKind::PushGateway => self.push_gateway,
            ChannelKind::TextFile => self.text_file,
        }
    }

    /// Returns a copy with only `kind` left as configured.
    #[must_use]
    pub const fn only(&self, kind: ChannelKind) -> Self {
        Self {
            bus: matches!(kind, ChannelKind::Bus) && self.bus,
            push_gateway: matches!(kind, ChannelKind::PushGateway) && self.push_gateway,
            text_file: matches!(kind, ChannelKind::TextFile) && self.text_file,
        }
    }
}

impl fmt::Debug for ChannelSwitches {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let enabled: Vec<String> = ChannelKind::ALL
            .iter()
            .filter(|kind| self.enabled(**kind))
            .map(ToString::to_string)
            .collect();
        write!(formatter, "ChannelSwitches[{}]", enabled.join(","))
    }
}
