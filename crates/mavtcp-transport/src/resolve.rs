use std::fmt;
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use tracing::debug;

use crate::error::{Result, TransportError};

/// A resolved TCP endpoint (address + port).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint(SocketAddr);

impl Endpoint {
    pub fn new(addr: SocketAddr) -> Self {
        Self(addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.0
    }

    pub fn ip(&self) -> IpAddr {
        self.0.ip()
    }

    pub fn port(&self) -> u16 {
        self.0.port()
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl From<Endpoint> for SocketAddr {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Resolve `host` and `port` into a single endpoint.
///
/// When the resolver returns several candidates the first one wins; the rest
/// are only logged.
pub fn resolve(host: &str, port: u16) -> Result<Endpoint> {
    let mut candidates = (host, port)
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            host: host.to_string(),
            source,
        })?;

    let Some(first) = candidates.next() else {
        return Err(TransportError::Resolve {
            host: host.to_string(),
            source: std::io::Error::new(ErrorKind::NotFound, "no addresses found"),
        });
    };

    debug!(host, endpoint = %first, "host resolved");
    for other in candidates {
        debug!(host, candidate = %other, "ignoring additional resolved address");
    }

    Ok(Endpoint(first))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_ipv4_literal() {
        let ep = resolve("127.0.0.1", 5760).unwrap();
        assert_eq!(ep.addr(), "127.0.0.1:5760".parse::<SocketAddr>().unwrap());
        assert_eq!(ep.port(), 5760);
        assert_eq!(ep.to_string(), "127.0.0.1:5760");
    }

    #[test]
    fn resolves_ipv6_literal() {
        let ep = resolve("::1", 14550).unwrap();
        assert!(ep.ip().is_ipv6());
        assert_eq!(ep.port(), 14550);
    }

    #[test]
    fn resolves_localhost() {
        let ep = resolve("localhost", 1).unwrap();
        assert!(ep.ip().is_loopback());
        assert_eq!(ep.port(), 1);
    }

    #[test]
    fn unresolvable_host_reports_host_name() {
        let err = resolve("no-such-host.invalid", 5760).unwrap_err();
        match err {
            TransportError::Resolve { host, .. } => assert_eq!(host, "no-such-host.invalid"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
