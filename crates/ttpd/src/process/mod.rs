//! Process-level concerns: keyboard interrupt handling.

mod interrupt;

pub use interrupt::{InterruptError, InterruptMode, InterruptWatch};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
