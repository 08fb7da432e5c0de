//! MAVLink links over TCP.
//!
//! - [`TcpConnection`]: one socket, one channel, non-blocking sends through
//!   an ordered outbound queue, frame events from a background reader.
//! - [`TcpServer`]: accepts clients up to a capacity, relays every client
//!   frame as its own event and broadcasts sends to all clients.
//! - [`MavConnection`] and [`open`]: either side behind one trait, chosen
//!   by a `tcp://` or `tcp-l://` URL.

pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod interface;
pub mod queue;
pub mod server;
pub mod url;

pub use config::{LinkConfig, ServerConfig, DEFAULT_IDENTITY, DEFAULT_PORT};
pub use connection::TcpConnection;
pub use error::{LinkError, Result};
pub use events::{LinkEvent, LinkEvents, SubscriptionId};
pub use interface::MavConnection;
pub use queue::OutboundQueue;
pub use server::{ClientInfo, TcpServer};
pub use url::{open, ConnectionUrl, Role};
