//! Advertising on the three telemetry channels, and the bus side of
//! graceful shutdown.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, warn};
use ttp_config::ChannelKind;
use ttp_metrics::publish::{
    ChannelPublisher, ChannelSettings, PublishStatus, PushGatewayPublisher, TextFilePublisher,
};
use ttp_metrics::{BusClient, Metric, MetricError, MetricType};

use super::RUNTIME_TARGET;
use super::context::RuntimeContext;
use crate::dispatch::DispatchContext;

pub(crate) const LIVENESS_METRIC: &str = "daemon_status";
const LIVENESS_HELP: &str = "daemon liveness";
const STATUS_FIELD: &str = "status";

/// Publishes queued before the connection is serviced; below the client's
/// request queue capacity.
const PUBLISH_BATCH: usize = 32;
const FLUSH_BUDGET: Duration = Duration::from_millis(20);

/// Queues `messages` on `bus`, servicing the connection after every batch
/// so that long runs of publishes never overflow the request queue.
fn publish_all(
    bus: &mut dyn BusClient,
    messages: impl IntoIterator<Item = (String, String, bool)>,
    phase: &str,
) {
    for (index, (topic, payload, retain)) in messages.into_iter().enumerate() {
        if index > 0 && index % PUBLISH_BATCH == 0 {
            bus.service(FLUSH_BUDGET);
        }
        if let Err(error) = bus.publish(&topic, &payload, retain) {
            warn!(target: RUNTIME_TARGET, error = %error, phase, "bus publish failed");
        }
    }
}

impl RuntimeContext {
    /// Publishes every status field under the daemon's topic root, then the
    /// advertise hook's topics. Only `status` is retained.
    pub(crate) fn advertise_bus(&mut self) {
        let root = self.topic_root();
        let fields = self.status_fields();
        let extra = self.with_advertise_context(|context| self.hooks.advertise_topics(context));
        let Some(bus) = self.bus.as_mut() else {
            debug!(target: RUNTIME_TARGET, "bus not connected; advertise skipped");
            return;
        };
        let own = fields
            .into_iter()
            .map(|(field, value)| (format!("{root}/{field}"), value, field == STATUS_FIELD));
        let hooked = extra.into_iter().map(|(topic, payload)| (topic, payload, false));
        publish_all(bus.as_mut(), own.chain(hooked), "advertise");
    }

    /// Metrics advertised on the push-gateway and text-file channels.
    pub(crate) fn liveness_metrics(&self) -> Result<Vec<Metric>, MetricError> {
        let liveness = Metric::builder()
            .name(LIVENESS_METRIC)
            .help(LIVENESS_HELP)
            .kind(MetricType::Gauge)
            .value(1.0)
            .labels([format!("daemon={}", self.name())])
            .labels(self.labels.iter().cloned())
            .build()?;
        let mut metrics = vec![liveness];
        metrics.extend(self.with_advertise_context(|context| self.hooks.extra_metrics(context)));
        Ok(metrics)
    }

    /// Publishes the liveness metrics on `kind`.
    pub(crate) fn advertise_metrics(&self, kind: ChannelKind) -> Vec<PublishStatus> {
        let metrics = match self.liveness_metrics() {
            Ok(metrics) => metrics,
            Err(error) => {
                warn!(target: RUNTIME_TARGET, error = %error, "liveness metric invalid");
                return Vec::new();
            }
        };
        let settings = ChannelSettings::from_node(
            &self.config.node,
            self.config.daemon.channel_switches().only(kind),
        );
        let gateway = PushGatewayPublisher::with_transport(&settings, &*self.http);
        let files = TextFilePublisher::new(&settings);
        let publisher: &dyn ChannelPublisher = match kind {
            ChannelKind::PushGateway => &gateway,
            ChannelKind::TextFile => &files,
            ChannelKind::Bus => return Vec::new(),
        };
        let statuses: Vec<PublishStatus> = metrics
            .iter()
            .map(|metric| publisher.publish(metric, ""))
            .collect();
        debug!(
            target: RUNTIME_TARGET,
            channel = %kind,
            codes = ?statuses.iter().map(|status| status.code()).collect::<Vec<_>>(),
            "metrics advertised"
        );
        statuses
    }

    /// Steps (a) to (c) of the shutdown sequence: disconnect hook topics,
    /// erasure of the daemon's status topics with `status` last, bus close.
    pub(crate) fn retire_bus(&mut self) {
        if self.bus.is_none() {
            return;
        }
        let root = self.topic_root();
        let farewell = self.with_advertise_context(|context| self.hooks.disconnect_topics(context));
        let fields: BTreeMap<String, String> = self.status_fields();
        let Some(mut bus) = self.bus.take() else {
            return;
        };
        let farewell = farewell
            .into_iter()
            .map(|(topic, payload)| (topic, payload, false));
        let erasures = fields
            .keys()
            .filter(|field| field.as_str() != STATUS_FIELD)
            .map(|field| (format!("{root}/{field}"), String::new(), false))
            .chain(std::iter::once((
                format!("{root}/{STATUS_FIELD}"),
                String::new(),
                true,
            )));
        publish_all(bus.as_mut(), farewell.chain(erasures), "shutdown");
        if let Err(error) = bus.disconnect() {
            warn!(target: RUNTIME_TARGET, error = %error, "bus disconnect failed");
        }
    }
}
