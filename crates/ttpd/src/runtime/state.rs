use strum::Display;

/// Lifecycle of a daemon runtime.
///
/// `Unconfigured → Listening → Running → Terminating → Terminated`; a
/// rejected configuration never leaves `Unconfigured` because no runtime is
/// produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LifecycleState {
    Unconfigured,
    Listening,
    Running,
    Terminating,
    Terminated,
}

/// How [`DaemonRuntime::run`](super::DaemonRuntime::run) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RunOutcome {
    /// A `terminate` command ran the graceful shutdown sequence.
    Terminated,
    /// A keyboard interrupt closed the control socket and nothing else.
    Interrupted,
}
