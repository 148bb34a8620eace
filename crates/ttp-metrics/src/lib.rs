//! Metrics and telemetry channels for TTP daemons.
//!
//! A [`Metric`] is validated once, at construction. Publishing it goes
//! through one [`ChannelPublisher`] per medium (the MQTT bus via an external
//! publish command, a Prometheus push gateway, a text-file collector drop
//! directory) and yields one [`PublishStatus`] per channel. Channel failures
//! are reported, never raised.

mod exposition;
pub mod macros;
mod metric;
pub mod mqtt;
pub mod publish;

pub use exposition::{LabelPlacement, render};
pub use metric::{
    Label, Metric, MetricBuilder, MetricError, MetricType, MetricValue, format_number,
};
pub use mqtt::{BusClient, BusConnectOptions, BusConnector, BusError, BusLastWill, MqttConnector};
pub use publish::{
    BusPublisher, ChannelPublisher, ChannelSettings, PublishStatus, PushGatewayPublisher,
    TextFilePublisher,
};
