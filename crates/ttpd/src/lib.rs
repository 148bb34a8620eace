//! Runtime for TTP daemons.
//!
//! A daemon is a single-threaded process driven by a cooperative
//! [`Scheduler`]. One task serves the TCP command protocol (one request per
//! listen tick); the others advertise the daemon's status on the MQTT bus,
//! a Prometheus push gateway and a text-file collector drop directory, each
//! at its own configured cadence.
//!
//! A `terminate` command runs the graceful shutdown sequence: the daemon's
//! status topics are erased (with `status` last), the bus connection is
//! closed, a last metrics advertise is performed and the control socket is
//! closed. A keyboard interrupt skips all of that so the broker delivers the
//! `offline` last will registered at connect time.

mod dispatch;
mod health;
mod process;
mod runtime;
mod scheduler;
mod telemetry;
mod transport;

pub use dispatch::{
    Builtin, CommandHandler, CommandTable, DispatchContext, DispatchError, Request,
    ResponseWriter, dispatch,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{InterruptError, InterruptMode, InterruptWatch};
pub use runtime::{
    AdvertiseContext, DaemonRuntime, DaemonRuntimeBuilder, LAST_WILL_PAYLOAD, LifecycleState,
    MetricsHook, RunOutcome, RuntimeError, TopicHook,
};
pub use scheduler::{Scheduler, TICK};
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};
pub use transport::{ListenerError, REQUEST_BUFFER_BYTES};

#[cfg(test)]
mod tests;
