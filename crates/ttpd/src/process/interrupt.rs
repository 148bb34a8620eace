//! Keyboard interrupt handling.
//!
//! An interrupt either does nothing (daemons launched by the operator CLI
//! ignore it) or ends the scheduler loop abruptly: the runtime closes the
//! control socket and returns without the graceful termination sequence.
//! The flag is only observed between scheduler ticks, so a second interrupt
//! arriving while the first is still pending exits the process at once.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::SigId;
use signal_hook::consts::signal::SIGINT;
use signal_hook::flag;
use thiserror::Error;
use tracing::debug;

use super::PROCESS_TARGET;

/// Exit status used when a second interrupt forces the process down.
const FORCED_EXIT_STATUS: i32 = 130;

/// How the daemon reacts to SIGINT.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InterruptMode {
    /// SIGINT ends the daemon without graceful termination.
    #[default]
    Abort,
    /// SIGINT is swallowed.
    Ignore,
}

/// Errors reported while installing the interrupt handler.
#[derive(Debug, Error)]
pub enum InterruptError {
    #[error("failed to install interrupt handler: {source}")]
    Install {
        #[source]
        source: io::Error,
    },
}

/// Flag raised when SIGINT arrives in [`InterruptMode::Abort`].
#[derive(Debug)]
pub struct InterruptWatch {
    raised: Arc<AtomicBool>,
    registrations: Vec<SigId>,
}

impl InterruptWatch {
    /// Installs the SIGINT handlers for `mode`.
    pub fn install(mode: InterruptMode) -> Result<Self, InterruptError> {
        let raised = Arc::new(AtomicBool::new(false));
        let mut watch = Self::from_flag(Arc::clone(&raised));
        match mode {
            InterruptMode::Abort => {
                // Registered first so it sees the flag as left by the previous
                // interrupt, not by this one.
                watch.register(|| {
                    flag::register_conditional_shutdown(
                        SIGINT,
                        FORCED_EXIT_STATUS,
                        Arc::clone(&raised),
                    )
                })?;
                watch.register(|| flag::register(SIGINT, raised))?;
            }
            InterruptMode::Ignore => {
                watch.register(|| flag::register(SIGINT, Arc::new(AtomicBool::new(false))))?;
            }
        }
        debug!(target: PROCESS_TARGET, ?mode, "interrupt handler installed");
        Ok(watch)
    }

    fn register(
        &mut self,
        registration: impl FnOnce() -> io::Result<SigId>,
    ) -> Result<(), InterruptError> {
        let id = registration().map_err(|source| InterruptError::Install { source })?;
        self.registrations.push(id);
        Ok(())
    }

    /// A watch driven by `flag` instead of a signal handler.
    #[must_use]
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self {
            raised: flag,
            registrations: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

impl Drop for InterruptWatch {
    fn drop(&mut self) {
        for registration in self.registrations.drain(..) {
            signal_hook::low_level::unregister(registration);
        }
    }
}
