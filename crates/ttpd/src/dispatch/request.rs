//! Request parsing.

use std::net::{IpAddr, SocketAddr};

/// One command received on an accepted connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    peer: Option<SocketAddr>,
    command: String,
    args: Vec<String>,
}

impl Request {
    /// Splits the received bytes on whitespace: the first token is the
    /// command, the rest are its arguments.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; an empty request
    /// yields an empty command name.
    #[must_use]
    pub fn parse(raw: &[u8], peer: Option<SocketAddr>) -> Self {
        let text = String::from_utf8_lossy(raw);
        let mut tokens = text.split_whitespace().map(str::to_string);
        let command = tokens.next().unwrap_or_default();
        Self {
            peer,
            command,
            args: tokens.collect(),
        }
    }

    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn peer_addr(&self) -> Option<IpAddr> {
        self.peer.map(|peer| peer.ip())
    }

    #[must_use]
    pub fn peer_port(&self) -> Option<u16> {
        self.peer.map(|peer| peer.port())
    }

    /// Peer host as text; the numeric address, no reverse lookup.
    #[must_use]
    pub fn peer_host(&self) -> Option<String> {
        self.peer_addr().map(|addr| addr.to_string())
    }
}
