//! Daemon runtime: configuration acceptance, the scheduler loop, and the
//! termination sequence.
//!
//! [`DaemonRuntimeBuilder::start`] loads and validates the configuration,
//! binds the control socket and opens the bus connection when the bus
//! channel is enabled. [`DaemonRuntime::run`] registers the listen task and
//! one advertise task per enabled channel, runs the scheduler until a
//! `terminate` command or a keyboard interrupt, and reports which of the two
//! ended it.

mod advertise;
mod context;
mod hooks;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;
use ttp_config::{
    ChannelKind, ConfigError, ConfigLoader, DaemonConfig, Enableable, JsonConfigured,
    LoadedConfig,
};
use ttp_metrics::publish::{HttpTransport, UreqTransport};
use ttp_metrics::{
    BusClient, BusConnectOptions, BusConnector, BusLastWill, Label, Metric, MetricError,
    MqttConnector,
};

use crate::dispatch::{CommandTable, Request};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::process::{InterruptError, InterruptMode, InterruptWatch};
use crate::scheduler::Scheduler;
use crate::transport::{ControlListener, ListenerError};

use self::context::RuntimeContext;
pub use self::hooks::{AdvertiseContext, MetricsHook, TopicHook};
use self::hooks::DaemonHooks;
pub use self::state::{LifecycleState, RunOutcome};

pub(crate) const RUNTIME_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::runtime");

/// Payload of the retained last will on the `status` topic.
pub const LAST_WILL_PAYLOAD: &str = "offline";

/// Errors that prevent a daemon from starting.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(Arc<ConfigError>),
    #[error("invalid runtime label: {0}")]
    Label(#[source] MetricError),
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error(transparent)]
    Interrupt(#[from] InterruptError),
}

/// Collects collaborators and daemon-specific behaviour before start-up.
pub struct DaemonRuntimeBuilder {
    loader: Arc<dyn ConfigLoader>,
    reporter: Arc<dyn HealthReporter>,
    connector: Box<dyn BusConnector>,
    http: Box<dyn HttpTransport>,
    commands: CommandTable,
    hooks: DaemonHooks,
    labels: Vec<String>,
    interrupt_mode: InterruptMode,
    interrupt: Option<InterruptWatch>,
}

impl DaemonRuntimeBuilder {
    fn new(loader: Arc<dyn ConfigLoader>) -> Self {
        Self {
            loader,
            reporter: Arc::new(StructuredHealthReporter::new()),
            connector: Box::new(MqttConnector),
            http: Box::new(UreqTransport::default()),
            commands: CommandTable::new(),
            hooks: DaemonHooks::default(),
            labels: Vec::new(),
            interrupt_mode: InterruptMode::default(),
            interrupt: None,
        }
    }

    #[must_use]
    pub fn reporter(mut self, reporter: Arc<dyn HealthReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    #[must_use]
    pub fn bus_connector(mut self, connector: Box<dyn BusConnector>) -> Self {
        self.connector = connector;
        self
    }

    #[must_use]
    pub fn http_transport(mut self, transport: Box<dyn HttpTransport>) -> Self {
        self.http = transport;
        self
    }

    /// Registers a daemon-specific command, looked up before the built-ins.
    #[must_use]
    pub fn command<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Request) -> String + 'static,
    {
        self.commands.insert(name, handler);
        self
    }

    /// Topics published after the status fields on every bus advertise.
    #[must_use]
    pub fn on_advertise<F>(mut self, hook: F) -> Self
    where
        F: Fn(&AdvertiseContext<'_>) -> Vec<(String, String)> + 'static,
    {
        self.hooks.advertise = Some(Box::new(hook));
        self
    }

    /// Topics published when the bus connection is retired.
    #[must_use]
    pub fn on_disconnect<F>(mut self, hook: F) -> Self
    where
        F: Fn(&AdvertiseContext<'_>) -> Vec<(String, String)> + 'static,
    {
        self.hooks.disconnect = Some(Box::new(hook));
        self
    }

    /// Metrics published alongside the liveness gauge.
    #[must_use]
    pub fn on_metrics<F>(mut self, hook: F) -> Self
    where
        F: Fn(&AdvertiseContext<'_>) -> Vec<Metric> + 'static,
    {
        self.hooks.metrics = Some(Box::new(hook));
        self
    }

    /// Extra `name=value` labels appended to every advertised metric.
    #[must_use]
    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels.extend(labels.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn interrupt_mode(mut self, mode: InterruptMode) -> Self {
        self.interrupt_mode = mode;
        self
    }

    /// Uses `watch` instead of installing a SIGINT handler.
    #[must_use]
    pub fn interrupt_watch(mut self, watch: InterruptWatch) -> Self {
        self.interrupt = Some(watch);
        self
    }

    /// Accepts the configuration and opens the control socket and, when
    /// the bus channel is enabled, the bus connection.
    pub fn start(self) -> Result<DaemonRuntime, RuntimeError> {
        let config = match self.loader.load() {
            Ok(config) => config,
            Err(error) => {
                self.reporter.config_rejected(&error);
                return Err(RuntimeError::Config(error));
            }
        };
        self.reporter.config_accepted(&config.daemon);
        for warning in config.daemon.warnings() {
            self.reporter.config_warning(config.daemon.name(), warning);
        }

        let reporter = Arc::clone(&self.reporter);
        let fail = |error: RuntimeError| {
            reporter.startup_failed(&error);
            error
        };

        for label in &self.labels {
            Label::parse(label).map_err(|error| fail(RuntimeError::Label(error)))?;
        }
        let listener = ControlListener::bind(config.daemon.listening_port())
            .map_err(|error| fail(error.into()))?;
        let interrupt = match self.interrupt {
            Some(watch) => watch,
            None => InterruptWatch::install(self.interrupt_mode)
                .map_err(|error| fail(error.into()))?,
        };

        let node = config.node.node_name();
        let bus = connect_bus(&*self.connector, &config, &node, &*self.reporter);
        let local_addr = listener.local_addr();
        self.reporter.listening(config.daemon.name(), local_addr);

        let context = RuntimeContext {
            loader: self.loader,
            config,
            node,
            listener: Some(listener),
            bus,
            http: self.http,
            terminating: false,
            state: LifecycleState::Listening,
            started_at: now_rfc3339(),
            pid: std::process::id(),
            labels: self.labels,
            commands: self.commands,
            hooks: self.hooks,
            reporter: self.reporter,
            interrupt,
        };
        Ok(DaemonRuntime {
            context,
            local_addr,
        })
    }
}

fn connect_bus(
    connector: &dyn BusConnector,
    config: &LoadedConfig,
    node: &str,
    reporter: &dyn HealthReporter,
) -> Option<Box<dyn BusClient>> {
    let daemon = &config.daemon;
    if !daemon.channel_enabled(ChannelKind::Bus) {
        return None;
    }
    let keep_alive = Duration::from_secs(u64::try_from(daemon.messaging_timeout()).unwrap_or(60));
    let options = BusConnectOptions::from_settings(
        &config.node.mqtt,
        &format!("ttpd-{node}-{}", daemon.name()),
        keep_alive,
    )
    .with_last_will(BusLastWill {
        topic: format!("{node}/daemon/{}/status", daemon.name()),
        payload: LAST_WILL_PAYLOAD.to_string(),
        retain: true,
    });
    match connector.connect(&options) {
        Ok(client) => Some(client),
        Err(error) => {
            reporter.bus_unavailable(daemon.name(), &error);
            None
        }
    }
}

fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

fn millis(value: i64) -> Duration {
    Duration::from_millis(u64::try_from(value).unwrap_or_default())
}

/// A configured daemon, listening and ready to run.
pub struct DaemonRuntime {
    context: RuntimeContext,
    local_addr: SocketAddr,
}

impl DaemonRuntime {
    /// Starts building a runtime whose configuration comes from `loader`.
    #[must_use]
    pub fn builder(loader: Arc<dyn ConfigLoader>) -> DaemonRuntimeBuilder {
        DaemonRuntimeBuilder::new(loader)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.context.name()
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.context.state
    }

    /// Address the control socket is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub fn config(&self) -> &DaemonConfig {
        &self.context.config.daemon
    }

    /// Runs the scheduler until termination or interrupt.
    pub fn run(mut self) -> RunOutcome {
        let daemon = self.context.config.daemon.clone();
        let mut scheduler = Scheduler::new();
        scheduler.register_task(
            "listen",
            millis(daemon.listening_interval()),
            RuntimeContext::listen,
        );
        if daemon.channel_enabled(ChannelKind::Bus) {
            scheduler.register_task(
                "advertise-bus",
                millis(daemon.messaging_interval()),
                RuntimeContext::advertise_bus,
            );
        }
        for (name, kind) in [
            ("advertise-http", ChannelKind::PushGateway),
            ("advertise-text", ChannelKind::TextFile),
        ] {
            if daemon.channel_enabled(kind) {
                scheduler.register_task(name, millis(daemon.channel_interval(kind)), move |context: &mut RuntimeContext| {
                    context.advertise_metrics(kind);
                });
            }
        }
        scheduler.register_stop_predicate(RuntimeContext::should_stop);

        self.context.state = LifecycleState::Running;
        self.context.reporter.running(daemon.name());
        scheduler.run(&mut self.context);

        if self.context.terminating {
            self.terminate()
        } else {
            self.interrupt()
        }
    }

    /// Graceful shutdown: bus retirement, final advertise, socket close.
    fn terminate(&mut self) -> RunOutcome {
        let context = &mut self.context;
        context.state = LifecycleState::Terminating;
        context.reporter.terminating(context.name());

        context.retire_bus();
        for kind in [ChannelKind::PushGateway, ChannelKind::TextFile] {
            if context.config.daemon.channel_enabled(kind) {
                context.advertise_metrics(kind);
            }
        }
        self.close_listener();

        let context = &mut self.context;
        context.state = LifecycleState::Terminated;
        info!(target: RUNTIME_TARGET, daemon = context.name(), pid = context.pid, "daemon terminated");
        context.reporter.terminated(context.name());
        RunOutcome::Terminated
    }

    /// Abrupt exit on keyboard interrupt: only the socket is closed.
    fn interrupt(&mut self) -> RunOutcome {
        self.close_listener();
        self.context.reporter.interrupted(self.context.name());
        RunOutcome::Interrupted
    }

    fn close_listener(&mut self) {
        if self.context.listener.take().is_some() {
            self.context.reporter.listener_closed(self.context.name());
        }
    }
}

impl Enableable for DaemonRuntime {
    fn is_enabled(&self) -> bool {
        self.context.config.daemon.is_enabled()
    }
}

impl JsonConfigured for DaemonRuntime {
    fn json_path(&self) -> &camino::Utf8Path {
        self.context.config.daemon.json_path()
    }
}
