use std::collections::BTreeMap;
use std::net::TcpStream;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use mavtcp_frame::{ChannelSlot, Frame, Identity};
use mavtcp_transport::{resolve, shutdown_stream, Endpoint, TcpAcceptor, TransportError};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::connection::TcpConnection;
use crate::error::{LinkError, Result};
use crate::events::LinkEvents;

/// A registered client as seen from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientInfo {
    pub channel: u8,
    pub peer: Endpoint,
}

/// A listening endpoint that fans frames in from, and out to, its clients.
///
/// Every accepted socket becomes a [`TcpConnection`] on its own channel,
/// owned by the server's registry. Frames from any client are re-emitted as
/// the server's own frame events; sends go to every registered client.
/// Clients that disconnect are removed from the registry on their own.
///
/// When the registry already holds [`ServerConfig::capacity`] clients, new
/// sockets are shut down right after accept and never registered.
pub struct TcpServer {
    shared: Arc<ServerShared>,
}

struct ServerShared {
    slot: ChannelSlot,
    config: ServerConfig,
    capacity: usize,
    acceptor: TcpAcceptor,
    state: Mutex<ServerState>,
    events: LinkEvents,
    accept_thread: Mutex<Option<JoinHandle<()>>>,
}

struct ServerState {
    open: bool,
    clients: BTreeMap<u8, Arc<TcpConnection>>,
}

impl TcpServer {
    /// Bind `host:port` and start accepting clients.
    pub fn bind(host: &str, port: u16, config: ServerConfig) -> Result<Self> {
        let endpoint = resolve(host, port)?;
        let channels = &config.link.channels;
        let slot = channels.allocate().ok_or(LinkError::NoChannelAvailable {
            capacity: channels.capacity(),
        })?;
        let capacity = config.capacity();
        info!(channel = slot.id(), bind = %endpoint, capacity, "tcp-l: bind address");

        let acceptor = TcpAcceptor::bind(endpoint, capacity)?;
        let shared = Arc::new(ServerShared {
            slot,
            config,
            capacity,
            acceptor,
            state: Mutex::new(ServerState {
                open: true,
                clients: BTreeMap::new(),
            }),
            events: LinkEvents::new(),
            accept_thread: Mutex::new(None),
        });

        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(format!("mavtcp-accept-{}", shared.channel()))
            .spawn(move || accept_loop(worker));
        match handle {
            Ok(handle) => {
                *shared.accept_thread.lock() = Some(handle);
                Ok(Self { shared })
            }
            Err(err) => {
                shared.close();
                Err(err.into())
            }
        }
    }

    /// Queue raw bytes to every registered client.
    pub fn send_bytes(&self, data: &[u8]) {
        let data = Bytes::copy_from_slice(data);
        let state = self.shared.state.lock();
        for conn in state.clients.values() {
            conn.try_send_bytes(data.clone());
        }
    }

    /// Send `msg` as `sender` to every registered client.
    ///
    /// Each client finalizes with its own sequence counter.
    pub fn send_message(&self, msg: &Frame, sender: Identity) -> Result<()> {
        let state = self.shared.state.lock();
        for conn in state.clients.values() {
            conn.try_send_message(msg, sender)?;
        }
        Ok(())
    }

    /// [`TcpServer::send_message`] with the server's own identity.
    pub fn send_frame(&self, msg: &Frame) -> Result<()> {
        self.send_message(msg, self.identity())
    }

    /// Stop accepting and close every client. Idempotent.
    pub fn close(&self) {
        self.shared.close();
    }

    pub fn is_open(&self) -> bool {
        self.shared.is_open()
    }

    pub fn channel(&self) -> u8 {
        self.shared.channel()
    }

    pub fn identity(&self) -> Identity {
        self.shared.config.link.identity
    }

    pub fn events(&self) -> &LinkEvents {
        &self.shared.events
    }

    /// The bound address; useful after binding port 0.
    pub fn local_endpoint(&self) -> Endpoint {
        self.shared.acceptor.local_endpoint()
    }

    /// Maximum number of simultaneously registered clients.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn client_count(&self) -> usize {
        self.shared.state.lock().clients.len()
    }

    /// Registered clients ordered by channel.
    pub fn clients(&self) -> Vec<ClientInfo> {
        self.shared
            .state
            .lock()
            .clients
            .values()
            .map(|conn| ClientInfo {
                channel: conn.channel(),
                peer: conn.peer(),
            })
            .collect()
    }
}

impl Drop for TcpServer {
    fn drop(&mut self) {
        self.shared.close();
    }
}

impl std::fmt::Debug for TcpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpServer")
            .field("channel", &self.channel())
            .field("local", &self.local_endpoint())
            .field("clients", &self.client_count())
            .field("open", &self.is_open())
            .finish()
    }
}

impl ServerShared {
    fn channel(&self) -> u8 {
        self.slot.id()
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Register an accepted socket, or shut it down if there is no room.
    fn admit(self: &Arc<Self>, stream: TcpStream, peer: Endpoint) {
        let channel = self.channel();
        let conn = {
            let mut state = self.state.lock();
            if !state.open {
                shutdown_stream(&stream);
                return;
            }
            if state.clients.len() >= self.capacity {
                warn!(channel, %peer, capacity = self.capacity, "tcp-l: client limit reached, dropping connection");
                shutdown_stream(&stream);
                return;
            }
            let Some(slot) = self.config.link.channels.allocate() else {
                warn!(channel, %peer, "tcp-l: no channel slot available, dropping connection");
                shutdown_stream(&stream);
                return;
            };

            let conn = match TcpConnection::from_stream(stream, peer, slot, self.config.link.clone()) {
                Ok(conn) => Arc::new(conn),
                Err(err) => {
                    warn!(channel, %peer, error = %err, "tcp-l: client setup failed");
                    return;
                }
            };
            let client = conn.channel();

            let relay: Weak<Self> = Arc::downgrade(self);
            conn.events().on_frame(move |frame, source| {
                if let Some(server) = relay.upgrade() {
                    server.relay_frame(frame, source);
                }
            });
            let owner: Weak<Self> = Arc::downgrade(self);
            conn.events().on_closed(move || {
                if let Some(server) = owner.upgrade() {
                    server.client_closed(client);
                }
            });

            state.clients.insert(client, Arc::clone(&conn));
            conn
        };

        info!(channel, client = conn.channel(), %peer, "tcp-l: got client");
        if let Err(err) = conn.start() {
            error!(channel, client = conn.channel(), error = %err, "tcp-l: failed to start client I/O");
            conn.close();
        }
    }

    fn relay_frame(&self, frame: &Frame, source: Identity) {
        if self.is_open() {
            self.events.emit_frame(frame, source);
        }
    }

    fn client_closed(&self, client: u8) {
        let removed = self.state.lock().clients.remove(&client);
        if let Some(conn) = removed {
            info!(channel = self.channel(), client, peer = %conn.peer(), "tcp-l: client disconnected");
        }
    }

    fn close(&self) {
        let clients = {
            let mut state = self.state.lock();
            if state.open {
                state.open = false;
                Some(std::mem::take(&mut state.clients))
            } else {
                None
            }
        };

        if let Some(clients) = &clients {
            info!(
                channel = self.channel(),
                clients = clients.len(),
                "tcp-l: terminating server, all client connections will be closed"
            );
            for conn in clients.values() {
                debug!(channel = self.channel(), client = conn.channel(), "tcp-l: closing client");
                conn.events().clear_closed();
                conn.close();
            }
            self.acceptor.shutdown();
        }

        self.join_accept_thread();

        if clients.is_some() {
            self.events.emit_closed();
        }
    }

    fn join_accept_thread(&self) {
        let handle = {
            let mut slot = self.accept_thread.lock();
            match slot.as_ref() {
                Some(handle) if handle.thread().id() == thread::current().id() => return,
                _ => slot.take(),
            }
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!(channel = self.channel(), "tcp-l: accept thread panicked");
            }
        }
    }
}

fn accept_loop(shared: Arc<ServerShared>) {
    let channel = shared.channel();
    debug!(channel, endpoint = %shared.acceptor.local_endpoint(), "tcp-l: accepting");

    loop {
        match shared.acceptor.accept() {
            Ok((stream, peer)) => shared.admit(stream, peer),
            Err(TransportError::Accept(err)) if err.kind() == std::io::ErrorKind::Interrupted => {}
            Err(err) => {
                if shared.is_open() {
                    error!(channel, error = %err, "tcp-l: accept failed");
                }
                break;
            }
        }
        if !shared.is_open() {
            break;
        }
    }

    shared.close();
}
