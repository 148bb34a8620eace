//! Client side of the daemon command protocol.
//!
//! One request line per connection. The daemon answers with `"<pid> <text>"`
//! lines, a final `"<pid> OK"` line, and closes its write side.

use std::io::{Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::Duration;

use crate::errors::AppError;

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
pub(crate) const ANSWER_TIMEOUT: Duration = Duration::from_secs(15);
const ANSWER_TRAILER: &str = "OK";

/// A daemon answer with the pid prefixes removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Answer {
    pub(crate) pid: Option<u32>,
    pub(crate) lines: Vec<String>,
}

/// Sends `command` and `args` to the daemon listening on `port` locally.
pub(crate) fn request(port: u16, command: &str, args: &[String]) -> Result<Answer, AppError> {
    let address = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let endpoint = address.to_string();
    let mut stream = TcpStream::connect_timeout(&address, CONNECTION_TIMEOUT).map_err(|source| {
        AppError::Connect {
            endpoint: endpoint.clone(),
            source,
        }
    })?;
    let exchange = |source: std::io::Error| AppError::Exchange {
        endpoint: endpoint.clone(),
        source,
    };

    let mut line = std::iter::once(command)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");
    line.push('\n');
    stream.set_read_timeout(Some(ANSWER_TIMEOUT)).map_err(exchange)?;
    stream.write_all(line.as_bytes()).map_err(exchange)?;
    stream.flush().map_err(exchange)?;

    let mut raw = String::new();
    stream.read_to_string(&mut raw).map_err(exchange)?;
    parse_answer(&raw).ok_or(AppError::NoAnswer { endpoint })
}

/// Strips the pid prefix of every line and drops the `OK` trailer. Returns
/// `None` when the trailer is missing.
pub(crate) fn parse_answer(raw: &str) -> Option<Answer> {
    let mut pid = None;
    let mut lines = Vec::new();
    let mut complete = false;
    for line in raw.lines() {
        let (prefix, text) = line.split_once(' ').unwrap_or((line, ""));
        pid = pid.or_else(|| prefix.parse().ok());
        if text == ANSWER_TRAILER {
            complete = true;
            break;
        }
        lines.push(text.to_string());
    }
    complete.then_some(Answer { pid, lines })
}
