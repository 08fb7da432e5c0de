use mavtcp_frame::{Frame, Identity};

use crate::connection::TcpConnection;
use crate::error::Result;
use crate::events::LinkEvents;
use crate::server::TcpServer;

/// Operations shared by client connections and servers.
///
/// Lets callers hold either side of a link behind `Box<dyn MavConnection>`,
/// as returned by [`crate::open`].
pub trait MavConnection: Send + Sync {
    /// Queue raw bytes.
    fn send_bytes(&self, data: &[u8]);

    /// Serialize and queue `msg` as sent by `sender`.
    fn send_message(&self, msg: &Frame, sender: Identity) -> Result<()>;

    /// Serialize and queue `msg` with the link's own identity.
    fn send_frame(&self, msg: &Frame) -> Result<()> {
        self.send_message(msg, self.identity())
    }

    /// Queue `msg` with the link's own identity if the link is still open.
    /// Returns `Ok(false)` when it was closed, so handlers racing a shutdown
    /// don't panic.
    fn try_send_frame(&self, msg: &Frame) -> Result<bool>;

    fn close(&self);

    fn is_open(&self) -> bool;

    /// Channel slot this link occupies.
    fn channel(&self) -> u8;

    fn identity(&self) -> Identity;

    fn events(&self) -> &LinkEvents;
}

impl MavConnection for TcpConnection {
    fn send_bytes(&self, data: &[u8]) {
        TcpConnection::send_bytes(self, data);
    }

    fn send_message(&self, msg: &Frame, sender: Identity) -> Result<()> {
        TcpConnection::send_message(self, msg, sender)
    }

    fn try_send_frame(&self, msg: &Frame) -> Result<bool> {
        self.try_send_message(msg, TcpConnection::identity(self))
    }

    fn close(&self) {
        TcpConnection::close(self);
    }

    fn is_open(&self) -> bool {
        TcpConnection::is_open(self)
    }

    fn channel(&self) -> u8 {
        TcpConnection::channel(self)
    }

    fn identity(&self) -> Identity {
        TcpConnection::identity(self)
    }

    fn events(&self) -> &LinkEvents {
        TcpConnection::events(self)
    }
}

impl MavConnection for TcpServer {
    fn send_bytes(&self, data: &[u8]) {
        TcpServer::send_bytes(self, data);
    }

    fn send_message(&self, msg: &Frame, sender: Identity) -> Result<()> {
        TcpServer::send_message(self, msg, sender)
    }

    fn try_send_frame(&self, msg: &Frame) -> Result<bool> {
        if !TcpServer::is_open(self) {
            return Ok(false);
        }
        TcpServer::send_frame(self, msg)?;
        Ok(true)
    }

    fn close(&self) {
        TcpServer::close(self);
    }

    fn is_open(&self) -> bool {
        TcpServer::is_open(self)
    }

    fn channel(&self) -> u8 {
        TcpServer::channel(self)
    }

    fn identity(&self) -> Identity {
        TcpServer::identity(self)
    }

    fn events(&self) -> &LinkEvents {
        TcpServer::events(self)
    }
}
