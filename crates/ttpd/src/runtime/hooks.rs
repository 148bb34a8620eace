//! Daemon-specific extension points.

use std::fmt;

use ttp_metrics::Metric;

/// What a hook is told about the daemon being advertised.
#[derive(Debug, Clone, Copy)]
pub struct AdvertiseContext<'a> {
    /// Node the daemon runs on.
    pub node: &'a str,
    /// Canonical daemon name.
    pub daemon: &'a str,
    /// `<node>/daemon/<daemon>`, the root of the daemon's own topics.
    pub topic_root: &'a str,
}

/// Extra `(topic, payload)` pairs for the bus.
pub type TopicHook = Box<dyn Fn(&AdvertiseContext<'_>) -> Vec<(String, String)>>;
/// Extra metrics for the push gateway and text-file channels.
pub type MetricsHook = Box<dyn Fn(&AdvertiseContext<'_>) -> Vec<Metric>>;

#[derive(Default)]
pub(crate) struct DaemonHooks {
    pub(crate) advertise: Option<TopicHook>,
    pub(crate) disconnect: Option<TopicHook>,
    pub(crate) metrics: Option<MetricsHook>,
}

impl DaemonHooks {
    pub(crate) fn advertise_topics(&self, context: &AdvertiseContext<'_>) -> Vec<(String, String)> {
        self.advertise.as_ref().map(|hook| hook(context)).unwrap_or_default()
    }

    pub(crate) fn disconnect_topics(&self, context: &AdvertiseContext<'_>) -> Vec<(String, String)> {
        self.disconnect.as_ref().map(|hook| hook(context)).unwrap_or_default()
    }

    pub(crate) fn extra_metrics(&self, context: &AdvertiseContext<'_>) -> Vec<Metric> {
        self.metrics.as_ref().map(|hook| hook(context)).unwrap_or_default()
    }
}

impl fmt::Debug for DaemonHooks {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DaemonHooks")
            .field("advertise", &self.advertise.is_some())
            .field("disconnect", &self.disconnect.is_some())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
