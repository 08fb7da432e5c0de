use std::net::SocketAddr;

/// Errors that can occur in TCP transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Host/port resolution failed or produced no address.
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        source: std::io::Error,
    },

    /// Failed to bind to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to put a bound socket into listening state.
    #[error("failed to listen on {addr}: {source}")]
    Listen {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Name of the failed operation, for diagnostics.
    pub fn operation(&self) -> &'static str {
        match self {
            TransportError::Resolve { .. } => "resolve",
            TransportError::Bind { .. } => "bind",
            TransportError::Listen { .. } => "listen",
            TransportError::Connect { .. } => "connect",
            TransportError::Accept(_) => "accept",
            TransportError::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
