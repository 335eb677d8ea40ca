use std::fmt::Debug;
use std::net::SocketAddr;
use std::ops::Deref;

use socket2::{Domain, Protocol, Socket, Type};

use crate::servers::udp::UDP_TRACKER_LOG_TARGET;

/// Wrapper for a Tokio [`UdpSocket`][`tokio::net::UdpSocket`] bound to a
/// particular address.
///
/// When `reuse_port` is set the socket is created with `SO_REUSEPORT`, so
/// several workers can bind the same address and the kernel spreads the
/// datagrams over them.
pub struct BoundSocket {
    socket: tokio::net::UdpSocket,
}

impl BoundSocket {
    /// # Errors
    ///
    /// Will return an error if the socket can't be created or bound to the
    /// provided address.
    pub fn new(addr: SocketAddr, reuse_port: bool) -> Result<Self, std::io::Error> {
        tracing::debug!(target: UDP_TRACKER_LOG_TARGET, %addr, reuse_port, "binding socket");

        let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

        #[cfg(unix)]
        if reuse_port {
            socket.set_reuse_port(true)?;
        }

        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;

        let socket = tokio::net::UdpSocket::from_std(socket.into())?;

        Ok(Self { socket })
    }

    /// # Panics
    ///
    /// Will panic if the socket can't report the address it was bound to.
    #[must_use]
    pub fn address(&self) -> SocketAddr {
        self.socket.local_addr().expect("it should get the bound address")
    }
}

impl Deref for BoundSocket {
    type Target = tokio::net::UdpSocket;

    fn deref(&self) -> &Self::Target {
        &self.socket
    }
}

impl Debug for BoundSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let local_addr = match self.socket.local_addr() {
            Ok(addr) => format!("receiving from: {addr}"),
            Err(err) => format!("socket broken: {err}"),
        };

        f.debug_struct("BoundSocket").field("addr", &local_addr).finish_non_exhaustive()
    }
}
