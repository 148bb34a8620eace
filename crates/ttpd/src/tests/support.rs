//! Doubles and fixtures shared by the runtime suites.

use std::io::{Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Value, json};
use tempfile::TempDir;
use ttp_config::{JsonConfigLoader, ValidationMode};
use ttp_metrics::publish::{HttpTransport, TransportFailure};
use ttp_metrics::{BusClient, BusConnectOptions, BusConnector, BusError};
use url::Url;

use crate::health::HealthReporter;
use crate::process::InterruptWatch;
use crate::runtime::{DaemonRuntime, DaemonRuntimeBuilder, RunOutcome, RuntimeError};

pub const NODE: &str = "ws12";
pub const DAEMON: &str = "backup";

/// Lifecycle events observed through [`HealthReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    ConfigAccepted,
    ConfigWarning(String),
    ConfigRejected(String),
    StartupFailed(String),
    Listening,
    BusUnavailable,
    Running,
    Terminating,
    ListenerClosed,
    Terminated,
    Interrupted,
}

#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    pub fn count(&self, event: &HealthEvent) -> usize {
        self.events().iter().filter(|seen| *seen == event).count()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn config_accepted(&self, _config: &ttp_config::DaemonConfig) {
        self.record(HealthEvent::ConfigAccepted);
    }

    fn config_warning(&self, _daemon: &str, warning: &ttp_config::ConfigWarning) {
        self.record(HealthEvent::ConfigWarning(warning.to_string()));
    }

    fn config_rejected(&self, error: &ttp_config::ConfigError) {
        self.record(HealthEvent::ConfigRejected(error.to_string()));
    }

    fn startup_failed(&self, error: &RuntimeError) {
        self.record(HealthEvent::StartupFailed(error.to_string()));
    }

    fn listening(&self, _daemon: &str, _addr: SocketAddr) {
        self.record(HealthEvent::Listening);
    }

    fn bus_unavailable(&self, _daemon: &str, _error: &BusError) {
        self.record(HealthEvent::BusUnavailable);
    }

    fn running(&self, _daemon: &str) {
        self.record(HealthEvent::Running);
    }

    fn terminating(&self, _daemon: &str) {
        self.record(HealthEvent::Terminating);
    }

    fn listener_closed(&self, _daemon: &str) {
        self.record(HealthEvent::ListenerClosed);
    }

    fn terminated(&self, _daemon: &str) {
        self.record(HealthEvent::Terminated);
    }

    fn interrupted(&self, _daemon: &str) {
        self.record(HealthEvent::Interrupted);
    }
}

/// Broker traffic seen by [`RecordingBusConnector`].
#[derive(Debug, Default)]
pub struct BusRecorder {
    connects: AtomicUsize,
    options: Mutex<Vec<BusConnectOptions>>,
    log: Mutex<Vec<String>>,
}

impl BusRecorder {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn options(&self) -> Vec<BusConnectOptions> {
        self.options.lock().expect("bus options mutex poisoned").clone()
    }

    /// `topic=payload:retain` per publish, `disconnect` per close.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().expect("bus log mutex poisoned").clone()
    }

    fn push(&self, entry: String) {
        self.log.lock().expect("bus log mutex poisoned").push(entry);
    }
}

pub struct RecordingBusConnector {
    recorder: Arc<BusRecorder>,
    refuse: bool,
    capacity: Option<usize>,
}

impl RecordingBusConnector {
    pub fn new(recorder: &Arc<BusRecorder>) -> Self {
        Self {
            recorder: Arc::clone(recorder),
            refuse: false,
            capacity: None,
        }
    }

    pub fn refusing(recorder: &Arc<BusRecorder>) -> Self {
        Self {
            refuse: true,
            ..Self::new(recorder)
        }
    }

    /// A connector whose clients reject publishes once `capacity` messages
    /// are queued and not yet serviced.
    pub fn bounded(recorder: &Arc<BusRecorder>, capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new(recorder)
        }
    }
}

impl BusConnector for RecordingBusConnector {
    fn connect(&self, options: &BusConnectOptions) -> Result<Box<dyn BusClient>, BusError> {
        self.recorder.connects.fetch_add(1, Ordering::SeqCst);
        self.recorder
            .options
            .lock()
            .expect("bus options mutex poisoned")
            .push(options.clone());
        if self.refuse {
            return Err(BusError::Connect {
                host: options.host.clone(),
                port: options.port,
                message: "connection refused".into(),
            });
        }
        Ok(Box::new(RecordingBusClient {
            recorder: Arc::clone(&self.recorder),
            capacity: self.capacity,
            queued: 0,
        }))
    }
}

struct RecordingBusClient {
    recorder: Arc<BusRecorder>,
    capacity: Option<usize>,
    queued: usize,
}

impl BusClient for RecordingBusClient {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), BusError> {
        if self.capacity.is_some_and(|capacity| self.queued >= capacity) {
            return Err(BusError::Publish {
                topic: topic.to_string(),
                message: "request queue full".into(),
            });
        }
        self.queued += 1;
        self.recorder.push(format!("{topic}={payload}:{retain}"));
        Ok(())
    }

    fn service(&mut self, _budget: Duration) {
        self.queued = 0;
    }

    fn disconnect(&mut self) -> Result<(), BusError> {
        self.recorder.push("disconnect".into());
        Ok(())
    }
}

/// Push-gateway double that accepts every request.
#[derive(Debug, Clone, Default)]
pub struct RecordingHttp {
    posts: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingHttp {
    pub fn posts(&self) -> Vec<(String, String)> {
        self.posts.lock().expect("http mutex poisoned").clone()
    }
}

impl HttpTransport for RecordingHttp {
    fn post(&self, url: &Url, body: &str) -> Result<u16, TransportFailure> {
        self.posts
            .lock()
            .expect("http mutex poisoned")
            .push((url.to_string(), body.to_string()));
        Ok(200)
    }
}

/// Daemon and node records written to a temporary directory.
pub struct DaemonFiles {
    dir: TempDir,
    record: Value,
    node: Value,
}

impl DaemonFiles {
    /// Bus, push gateway and text file disabled; ephemeral port.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let exec = dir.path().join("worker");
        std::fs::write(&exec, "#!/bin/sh\n").expect("write worker");
        Self {
            record: json!({
                "enabled": true,
                "execPath": exec.to_str().expect("utf-8 temp path"),
                "listeningPort": 0,
                "listeningInterval": 500,
                "messagingInterval": 0,
                "messagingTimeout": 30,
                "httpingInterval": 0,
                "textingInterval": 0,
            }),
            node: json!({ "node": NODE }),
            dir,
        }
    }

    pub fn set(mut self, key: &str, value: Value) -> Self {
        self.record[key] = value;
        self
    }

    pub fn remove(mut self, key: &str) -> Self {
        if let Some(record) = self.record.as_object_mut() {
            record.remove(key);
        }
        self
    }

    pub fn telemetry(mut self, telemetry: Value) -> Self {
        self.node["telemetry"] = telemetry;
        self
    }

    pub fn root(&self) -> &Utf8Path {
        Utf8Path::from_path(self.dir.path()).expect("utf-8 temp path")
    }

    /// Writes both records and returns a loader for them.
    pub fn loader(&self) -> JsonConfigLoader {
        let daemon_path = self.root().join(format!("{DAEMON}.json"));
        let node_path = self.root().join("node.json");
        write_atomically(&daemon_path, &self.record);
        write_atomically(&node_path, &self.node);
        JsonConfigLoader::new(daemon_path)
            .with_node_path(Some(node_path))
            .with_mode(ValidationMode::default())
    }

    /// Changes one field of the daemon record on disk, under a running
    /// daemon's feet.
    pub fn rewrite(&mut self, key: &str, value: Value) {
        self.record[key] = value;
        write_atomically(&self.root().join(format!("{DAEMON}.json")), &self.record);
    }
}

fn write_atomically(path: &Utf8Path, record: &Value) {
    let staging: Utf8PathBuf = format!("{path}.staging").into();
    std::fs::write(&staging, record.to_string()).expect("write record");
    std::fs::rename(&staging, path).expect("install record");
}

/// A runtime driven on its own thread.
pub struct RunningDaemon {
    pub addr: SocketAddr,
    pub interrupt: Arc<AtomicBool>,
    handle: JoinHandle<RunOutcome>,
}

impl RunningDaemon {
    /// Starts the runtime described by `files`, letting `configure` add
    /// collaborators and hooks on the daemon thread.
    pub fn spawn<F>(files: &DaemonFiles, reporter: Arc<RecordingHealthReporter>, configure: F) -> Self
    where
        F: FnOnce(DaemonRuntimeBuilder) -> DaemonRuntimeBuilder + Send + 'static,
    {
        let loader = files.loader();
        let interrupt = Arc::new(AtomicBool::new(false));
        let watch = InterruptWatch::from_flag(Arc::clone(&interrupt));
        let (ready, started) = mpsc::channel();
        let handle = thread::spawn(move || {
            let builder = DaemonRuntime::builder(Arc::new(loader))
                .reporter(reporter)
                .interrupt_watch(watch);
            match configure(builder).start() {
                Ok(runtime) => {
                    ready.send(Ok(runtime.local_addr())).expect("report address");
                    runtime.run()
                }
                Err(error) => {
                    ready.send(Err(error.to_string())).expect("report failure");
                    RunOutcome::Interrupted
                }
            }
        });
        let local = started
            .recv_timeout(Duration::from_secs(10))
            .expect("daemon thread reported")
            .expect("daemon started");
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, local.port())),
            interrupt,
            handle,
        }
    }

    /// Sends one request line and returns the whole answer.
    pub fn send(&self, line: &str) -> String {
        let mut stream = TcpStream::connect(self.addr).expect("connect to daemon");
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .expect("read timeout");
        stream.write_all(line.as_bytes()).expect("send request");
        let mut answer = String::new();
        stream.read_to_string(&mut answer).expect("read answer");
        answer
    }

    pub fn join(self) -> RunOutcome {
        self.handle.join().expect("daemon thread panicked")
    }
}

/// Prefix of every answer line.
pub fn pid() -> String {
    std::process::id().to_string()
}
