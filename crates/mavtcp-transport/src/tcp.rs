use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::resolve::Endpoint;

/// Upper bound for the self-connect used to unblock a pending `accept`.
const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Listening TCP socket.
///
/// Opened with `SO_REUSEADDR` so a restarted server can rebind immediately.
/// Accepting blocks the calling thread; [`TcpAcceptor::shutdown`] unblocks it
/// from another thread.
pub struct TcpAcceptor {
    listener: TcpListener,
    local: Endpoint,
}

impl TcpAcceptor {
    /// Bind and listen on `endpoint` with the given backlog.
    pub fn bind(endpoint: Endpoint, backlog: usize) -> Result<Self> {
        let addr = endpoint.addr();
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(|source| TransportError::Bind { addr, source })?;
        socket
            .set_reuse_address(true)
            .map_err(|source| TransportError::Bind { addr, source })?;
        socket
            .bind(&addr.into())
            .map_err(|source| TransportError::Bind { addr, source })?;

        let backlog = i32::try_from(backlog.max(1)).unwrap_or(i32::MAX);
        socket
            .listen(backlog)
            .map_err(|source| TransportError::Listen { addr, source })?;

        let listener: TcpListener = socket.into();
        let local = listener
            .local_addr()
            .map(Endpoint::new)
            .map_err(|source| TransportError::Listen { addr, source })?;

        info!(endpoint = %local, backlog, "listening on tcp socket");

        Ok(Self { listener, local })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<(TcpStream, Endpoint)> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%peer, "accepted connection");
        Ok((stream, Endpoint::new(peer)))
    }

    /// The endpoint this socket is actually bound to (port 0 resolved).
    pub fn local_endpoint(&self) -> Endpoint {
        self.local
    }

    /// Unblock a thread parked in [`TcpAcceptor::accept`].
    ///
    /// Shuts the listening socket down, which is enough on Linux, then makes
    /// a throwaway loopback connection for platforms where it is not. The
    /// caller must have recorded its closed state first so the woken
    /// acceptor discards whatever it gets.
    pub fn shutdown(&self) {
        if let Err(err) = SockRef::from(&self.listener).shutdown(Shutdown::Both) {
            debug!(error = %err, "listener shutdown not supported, relying on wake connect");
        }

        let target = wake_target(self.local.addr());
        match TcpStream::connect_timeout(&target, WAKE_TIMEOUT) {
            Ok(stream) => {
                let _ = stream.shutdown(Shutdown::Both);
            }
            Err(err) => debug!(%target, error = %err, "wake connect failed"),
        }
    }
}

/// Connect to `endpoint` (blocking).
pub fn connect(endpoint: Endpoint) -> Result<TcpStream> {
    let addr = endpoint.addr();
    let stream = TcpStream::connect(addr).map_err(|source| TransportError::Connect { addr, source })?;
    debug!(%addr, "connected to tcp endpoint");
    Ok(stream)
}

/// Shut both directions of a stream down, ignoring "not connected".
///
/// Any thread blocked in `read` or `write` on a clone of the stream returns.
pub fn shutdown_stream(stream: &TcpStream) {
    match stream.shutdown(Shutdown::Both) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotConnected => {}
        Err(err) => debug!(error = %err, "stream shutdown failed"),
    }
}

fn wake_target(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}
