//! Line-oriented command protocol.
//!
//! A client writes one line, `<command> [arg ...]`. The daemon answers with
//! one `"<pid> <text>"` line per line of output, a final `"<pid> OK"` line,
//! and then half-closes its write side.
//!
//! Commands are looked up in the daemon's own table first and in the
//! built-in table (`help`, `status`, `terminate`) second.

mod errors;
mod request;
mod response;
mod router;

pub use self::errors::DispatchError;
pub use self::request::Request;
pub use self::response::ResponseWriter;
pub use self::router::{Builtin, CommandHandler, CommandTable, DispatchContext, dispatch};

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
