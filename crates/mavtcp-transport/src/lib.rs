//! TCP transport primitives for MAVLink links.
//!
//! This is the lowest layer of mavtcp:
//! - host/port resolution into a single [`Endpoint`]
//! - blocking connect
//! - listening sockets with address reuse and cross-thread wake-up
//!
//! Everything else builds on the `std::net::TcpStream` values produced here.

pub mod error;
pub mod resolve;
pub mod tcp;

pub use error::{Result, TransportError};
pub use resolve::{resolve, Endpoint};
pub use tcp::{connect, shutdown_stream, TcpAcceptor};
