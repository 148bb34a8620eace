//! State threaded through the scheduler tasks.

use std::collections::BTreeMap;
use std::net::Shutdown;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use ttp_config::{ConfigLoader, LoadedConfig};
use ttp_metrics::BusClient;
use ttp_metrics::publish::HttpTransport;

use super::hooks::{AdvertiseContext, DaemonHooks};
use super::state::LifecycleState;
use super::RUNTIME_TARGET;
use crate::dispatch::{self, CommandTable, DispatchContext, DispatchError, Request, ResponseWriter};
use crate::health::HealthReporter;
use crate::process::InterruptWatch;
use crate::transport::{Accepted, ControlListener, read_request};

/// Time spent driving the bus connection on each listen tick.
const BUS_SERVICE_BUDGET: Duration = Duration::from_millis(20);

pub(crate) struct RuntimeContext {
    pub(crate) loader: Arc<dyn ConfigLoader>,
    pub(crate) config: LoadedConfig,
    pub(crate) node: String,
    pub(crate) listener: Option<ControlListener>,
    pub(crate) bus: Option<Box<dyn BusClient>>,
    pub(crate) http: Box<dyn HttpTransport>,
    pub(crate) terminating: bool,
    pub(crate) state: LifecycleState,
    pub(crate) started_at: String,
    pub(crate) pid: u32,
    pub(crate) labels: Vec<String>,
    pub(crate) commands: CommandTable,
    pub(crate) hooks: DaemonHooks,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) interrupt: InterruptWatch,
}

impl RuntimeContext {
    pub(crate) fn name(&self) -> &str {
        self.config.daemon.name()
    }

    pub(crate) fn topic_root(&self) -> String {
        format!("{}/daemon/{}", self.node, self.name())
    }

    /// Runs `f` with the hook context for this daemon.
    pub(crate) fn with_advertise_context<T>(&self, f: impl FnOnce(&AdvertiseContext<'_>) -> T) -> T {
        let topic_root = self.topic_root();
        f(&AdvertiseContext {
            node: &self.node,
            daemon: self.name(),
            topic_root: &topic_root,
        })
    }

    pub(crate) fn should_stop(&self) -> bool {
        self.terminating || self.interrupt.is_raised()
    }

    /// Human-readable value of the `status` field.
    pub(crate) fn status_value(&self) -> String {
        match self.state {
            LifecycleState::Running => format!("running since {}", self.started_at),
            state => state.to_string(),
        }
    }

    /// The listen task: re-resolve configuration, keep the bus serviced,
    /// then serve at most one pending connection.
    pub(crate) fn listen(&mut self) {
        match self.loader.load() {
            Ok(config) => {
                for warning in config.daemon.warnings() {
                    if !self.config.daemon.warnings().contains(warning) {
                        self.reporter.config_warning(config.daemon.name(), warning);
                    }
                }
                self.config = config;
            }
            Err(error) => warn!(
                target: RUNTIME_TARGET,
                error = %error,
                "configuration re-resolution failed; keeping previous configuration"
            ),
        }
        if let Some(bus) = self.bus.as_mut() {
            bus.service(BUS_SERVICE_BUDGET);
        }
        let accepted = match self.listener.as_ref().map(ControlListener::accept_one) {
            Some(Ok(Some(accepted))) => accepted,
            Some(Ok(None)) | None => return,
            Some(Err(error)) => {
                warn!(target: RUNTIME_TARGET, error = %error, "accept failed");
                return;
            }
        };
        if let Err(error) = self.serve(accepted) {
            warn!(target: RUNTIME_TARGET, error = %error, "request not served");
        }
    }

    fn serve(&mut self, accepted: Accepted) -> Result<(), DispatchError> {
        let Accepted { mut stream, peer } = accepted;
        let raw = read_request(&mut stream).map_err(DispatchError::Read)?;
        if raw.is_empty() {
            return Err(DispatchError::EmptyRequest);
        }
        let request = Request::parse(&raw, Some(peer));
        debug!(
            target: RUNTIME_TARGET,
            peer = %peer,
            command = request.command(),
            args = ?request.args(),
            "request received"
        );
        let commands = std::mem::take(&mut self.commands);
        let text = dispatch::dispatch(&request, &commands, self);
        self.commands = commands;

        ResponseWriter::new(&mut stream, self.pid).answer(&text)?;
        stream.shutdown(Shutdown::Write).map_err(DispatchError::Write)
    }
}

impl DispatchContext for RuntimeContext {
    fn status_fields(&self) -> BTreeMap<String, String> {
        let mut fields: BTreeMap<String, String> = self
            .config
            .daemon
            .status_fields()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        fields.insert("pid".into(), self.pid.to_string());
        fields.insert("status".into(), self.status_value());
        fields
    }

    fn request_termination(&mut self) {
        debug!(target: RUNTIME_TARGET, daemon = self.name(), "termination requested");
        self.terminating = true;
    }
}
