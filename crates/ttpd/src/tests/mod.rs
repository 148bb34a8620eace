//! Test suites for the daemon runtime.

mod protocol_behaviour;
mod support;
