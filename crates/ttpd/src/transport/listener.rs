//! Non-blocking TCP listener for the control protocol.

use std::io::{self, Read};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener, TcpStream};
use std::time::Duration;

use tracing::{debug, info};

use super::{LISTENER_TARGET, ListenerError, REQUEST_BUFFER_BYTES};

const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// A connection taken off the listen queue.
#[derive(Debug)]
pub(crate) struct Accepted {
    pub(crate) stream: TcpStream,
    pub(crate) peer: SocketAddr,
}

/// Control socket bound to the daemon's listening port.
#[derive(Debug)]
pub(crate) struct ControlListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl ControlListener {
    /// Binds every interface on `port` in non-blocking mode.
    pub(crate) fn bind(port: u16) -> Result<Self, ListenerError> {
        Self::bind_addr(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port)))
    }

    pub(crate) fn bind_addr(addr: SocketAddr) -> Result<Self, ListenerError> {
        let listener =
            TcpListener::bind(addr).map_err(|source| ListenerError::Bind { addr, source })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })?;
        info!(target: LISTENER_TARGET, addr = %local_addr, "control socket listening");
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Takes at most one pending connection; `Ok(None)` when none waits.
    pub(crate) fn accept_one(&self) -> io::Result<Option<Accepted>> {
        match self.listener.accept() {
            Ok((stream, peer)) => {
                stream.set_nonblocking(false)?;
                stream.set_read_timeout(Some(READ_TIMEOUT))?;
                debug!(target: LISTENER_TARGET, peer = %peer, "connection accepted");
                Ok(Some(Accepted { stream, peer }))
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }
}

/// Reads one request with a single `recv` into a fixed buffer.
pub(crate) fn read_request(stream: &mut impl Read) -> io::Result<Vec<u8>> {
    let mut buffer = [0_u8; REQUEST_BUFFER_BYTES];
    let read = loop {
        match stream.read(&mut buffer) {
            Ok(read) => break read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    };
    Ok(buffer[..read].to_vec())
}
