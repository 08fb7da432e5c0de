//! MAVLink over TCP.
//!
//! Links carry MAVLink v1/v2 frames over plain TCP sockets. A client
//! connection dials out; a server accepts any number of clients up to a
//! capacity, fans their frames in as its own events and broadcasts sends
//! to all of them. Every link occupies one slot of a process-wide channel
//! pool.
//!
//! # Crate Structure
//!
//! - [`transport`]: address resolution and blocking TCP sockets
//! - [`frame`]: frame codec, incremental parser, channel slots
//! - [`link`]: `TcpConnection`, `TcpServer`, `MavConnection`, URL opening

/// Re-export transport types.
pub mod transport {
    pub use mavtcp_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use mavtcp_frame::*;
}

/// Re-export link types.
pub mod link {
    pub use mavtcp_link::*;
}
