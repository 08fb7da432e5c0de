/// Errors that can occur while constructing or using a link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error (resolve, bind, listen, connect).
    #[error("transport error: {0}")]
    Transport(#[from] mavtcp_transport::TransportError),

    /// Frame-level error (message cannot be encoded).
    #[error("frame error: {0}")]
    Frame(#[from] mavtcp_frame::FrameError),

    /// Every channel slot of the pool is leased.
    #[error("no channel slot available (capacity {capacity})")]
    NoChannelAvailable { capacity: usize },

    /// The connection URL could not be parsed.
    #[error("invalid connection url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The connection URL names a transport this crate does not provide.
    #[error("unsupported url scheme '{0}'")]
    UnsupportedScheme(String),

    /// Socket option or I/O thread setup failed.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;
