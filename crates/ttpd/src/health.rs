//! Structured health reporting for daemon lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use ttp_config::{ConfigError, ConfigWarning, DaemonConfig};
use ttp_metrics::BusError;

use crate::runtime::RuntimeError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked once the daemon record has been accepted.
    fn config_accepted(&self, config: &DaemonConfig);

    /// Invoked once per configuration warning, at acceptance and again only
    /// when a reload introduces a warning not seen before.
    fn config_warning(&self, daemon: &str, warning: &ConfigWarning);

    /// Invoked when the daemon record is rejected.
    fn config_rejected(&self, error: &ConfigError);

    /// Invoked when start-up fails after the record was accepted.
    fn startup_failed(&self, error: &RuntimeError);

    /// Invoked once the control socket is bound.
    fn listening(&self, daemon: &str, addr: SocketAddr);

    /// Invoked when the bus connection cannot be opened.
    fn bus_unavailable(&self, daemon: &str, error: &BusError);

    /// Invoked when the scheduler loop starts.
    fn running(&self, daemon: &str);

    /// Invoked when the graceful shutdown sequence begins.
    fn terminating(&self, daemon: &str);

    /// Invoked when the control socket is closed.
    fn listener_closed(&self, daemon: &str);

    /// Invoked when the graceful shutdown sequence completes.
    fn terminated(&self, daemon: &str);

    /// Invoked when a keyboard interrupt ends the daemon.
    fn interrupted(&self, daemon: &str);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn config_accepted(&self, config: &DaemonConfig) {
        (**self).config_accepted(config);
    }

    fn config_warning(&self, daemon: &str, warning: &ConfigWarning) {
        (**self).config_warning(daemon, warning);
    }

    fn config_rejected(&self, error: &ConfigError) {
        (**self).config_rejected(error);
    }

    fn startup_failed(&self, error: &RuntimeError) {
        (**self).startup_failed(error);
    }

    fn listening(&self, daemon: &str, addr: SocketAddr) {
        (**self).listening(daemon, addr);
    }

    fn bus_unavailable(&self, daemon: &str, error: &BusError) {
        (**self).bus_unavailable(daemon, error);
    }

    fn running(&self, daemon: &str) {
        (**self).running(daemon);
    }

    fn terminating(&self, daemon: &str) {
        (**self).terminating(daemon);
    }

    fn listener_closed(&self, daemon: &str) {
        (**self).listener_closed(daemon);
    }

    fn terminated(&self, daemon: &str) {
        (**self).terminated(daemon);
    }

    fn interrupted(&self, daemon: &str) {
        (**self).interrupted(daemon);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn config_accepted(&self, config: &DaemonConfig) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "config_accepted",
            daemon = config.name(),
            port = config.listening_port(),
            channels = ?config.channel_switches(),
            warnings = config.warnings().len(),
            "daemon configuration accepted"
        );
    }

    fn config_warning(&self, daemon: &str, warning: &ConfigWarning) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "config_warning",
            daemon,
            warning = %warning,
            "daemon configuration warning"
        );
    }

    fn config_rejected(&self, error: &ConfigError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "config_rejected",
            error = %error,
            "daemon configuration rejected"
        );
    }

    fn startup_failed(&self, error: &RuntimeError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "startup_failed",
            error = %error,
            "daemon failed to start"
        );
    }

    fn listening(&self, daemon: &str, addr: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listening",
            daemon,
            addr = %addr,
            "daemon listening"
        );
    }

    fn bus_unavailable(&self, daemon: &str, error: &BusError) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "bus_unavailable",
            daemon,
            error = %error,
            "bus connection unavailable; bus advertising suspended"
        );
    }

    fn running(&self, daemon: &str) {
        tracing::info!(target: HEALTH_TARGET, event = "running", daemon, "daemon running");
    }

    fn terminating(&self, daemon: &str) {
        tracing::info!(target: HEALTH_TARGET, event = "terminating", daemon, "daemon terminating");
    }

    fn listener_closed(&self, daemon: &str) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "listener_closed",
            daemon,
            "control socket closed"
        );
    }

    fn terminated(&self, daemon: &str) {
        tracing::info!(target: HEALTH_TARGET, event = "terminated", daemon, "daemon terminated");
    }

    fn interrupted(&self, daemon: &str) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "interrupted",
            daemon,
            "daemon interrupted; graceful shutdown skipped"
        );
    }
}
