use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use mavtcp_frame::{ChannelSlot, Frame, FrameParser, FrameSerializer, Identity};
use mavtcp_transport::{resolve, shutdown_stream, Endpoint};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, trace};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::events::LinkEvents;
use crate::queue::OutboundQueue;

/// A bidirectional MAVLink stream over one TCP socket.
///
/// Each connection runs two threads: a reader that feeds the frame parser
/// and emits frame events, and a writer that drains the outbound queue one
/// buffer at a time. Sends never block on the socket.
///
/// Closing is idempotent. The first [`TcpConnection::close`] discards every
/// pending outbound buffer, joins both I/O threads and then emits the closed
/// event exactly once. No frame event is emitted after close begins.
pub struct TcpConnection {
    shared: Arc<Shared>,
}

struct Shared {
    slot: ChannelSlot,
    identity: Identity,
    peer: Endpoint,
    stream: TcpStream,
    config: LinkConfig,
    state: Mutex<TxState>,
    /// Signalled when a buffer is queued or the connection closes.
    tx_ready: Condvar,
    /// Signalled when the queue runs empty or the connection closes.
    drained: Condvar,
    serializer: Mutex<FrameSerializer>,
    events: LinkEvents,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

struct TxState {
    open: bool,
    tx_in_progress: bool,
    queue: OutboundQueue,
}

impl TcpConnection {
    /// Resolve `host:port`, connect, and start I/O immediately.
    pub fn connect(host: &str, port: u16, config: LinkConfig) -> Result<Self> {
        let server = resolve(host, port)?;
        let slot = config
            .channels
            .allocate()
            .ok_or(LinkError::NoChannelAvailable {
                capacity: config.channels.capacity(),
            })?;
        info!(channel = slot.id(), %server, "tcp: server address");

        let stream = mavtcp_transport::connect(server)?;
        let conn = Self::from_stream(stream, server, slot, config)?;
        conn.start()?;
        Ok(conn)
    }

    /// Wrap an established stream without starting I/O.
    ///
    /// Lets the owner subscribe to events before the first frame can arrive.
    pub(crate) fn from_stream(
        stream: TcpStream,
        peer: Endpoint,
        slot: ChannelSlot,
        config: LinkConfig,
    ) -> Result<Self> {
        if config.nodelay {
            stream.set_nodelay(true)?;
        }
        let serializer = FrameSerializer::with_config(config.frame);

        Ok(Self {
            shared: Arc::new(Shared {
                slot,
                identity: config.identity,
                peer,
                stream,
                config,
                state: Mutex::new(TxState {
                    open: true,
                    tx_in_progress: false,
                    queue: OutboundQueue::new(),
                }),
                tx_ready: Condvar::new(),
                drained: Condvar::new(),
                serializer: Mutex::new(serializer),
                events: LinkEvents::new(),
                workers: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Spawn the reader and writer threads.
    pub(crate) fn start(&self) -> Result<()> {
        let channel = self.channel();
        // Held across both spawns so a worker that closes immediately can
        // recognise itself in the list.
        let mut workers = self.shared.workers.lock();
        if !self.is_open() || !workers.is_empty() {
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        workers.push(
            thread::Builder::new()
                .name(format!("mavtcp-rx-{channel}"))
                .spawn(move || recv_loop(shared))?,
        );

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("mavtcp-tx-{channel}"))
            .spawn(move || drain_loop(shared));
        match spawned {
            Ok(handle) => {
                workers.push(handle);
                Ok(())
            }
            Err(err) => {
                drop(workers);
                self.close();
                Err(err.into())
            }
        }
    }

    /// Queue raw bytes for transmission.
    ///
    /// # Panics
    ///
    /// Panics if the connection is closed.
    pub fn send_bytes(&self, data: &[u8]) {
        self.assert_open();
        self.shared.enqueue(Bytes::copy_from_slice(data));
    }

    /// Serialize `msg` as sent by `sender` and queue it.
    ///
    /// The frame is re-finalized with this channel's next sequence number
    /// unless its header already names `sender`.
    ///
    /// # Panics
    ///
    /// Panics if the connection is closed.
    pub fn send_message(&self, msg: &Frame, sender: Identity) -> Result<()> {
        self.assert_open();
        self.shared.enqueue_message(msg, sender)?;
        Ok(())
    }

    /// [`TcpConnection::send_message`] with this link's own identity.
    pub fn send_frame(&self, msg: &Frame) -> Result<()> {
        self.send_message(msg, self.identity())
    }

    pub(crate) fn try_send_bytes(&self, data: Bytes) -> bool {
        self.shared.enqueue(data)
    }

    /// Like [`TcpConnection::send_message`], but a closed connection yields
    /// `Ok(false)` instead of panicking.
    pub fn try_send_message(&self, msg: &Frame, sender: Identity) -> Result<bool> {
        if !self.is_open() {
            return Ok(false);
        }
        self.shared.enqueue_message(msg, sender)
    }

    /// Close the connection. Safe to call repeatedly and from event handlers.
    pub fn close(&self) {
        self.shared.close();
    }

    /// Block until every queued buffer is written, the connection closes, or
    /// `timeout` elapses. Returns `true` only if the queue drained while open.
    pub fn wait_drained(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.open && (state.tx_in_progress || !state.queue.is_empty()) {
            if self
                .shared
                .drained
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                break;
            }
        }
        state.open && !state.tx_in_progress && state.queue.is_empty()
    }

    pub fn is_open(&self) -> bool {
        self.shared.is_open()
    }

    pub fn channel(&self) -> u8 {
        self.shared.channel()
    }

    pub fn identity(&self) -> Identity {
        self.shared.identity
    }

    /// Remote endpoint of the socket.
    pub fn peer(&self) -> Endpoint {
        self.shared.peer
    }

    pub fn events(&self) -> &LinkEvents {
        &self.shared.events
    }

    /// Buffers queued but not yet fully written.
    pub fn pending_buffers(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    fn assert_open(&self) {
        assert!(
            self.is_open(),
            "send on closed connection (channel {})",
            self.channel()
        );
    }
}

impl Drop for TcpConnection {
    fn drop(&mut self) {
        self.shared.close();
    }
}

impl std::fmt::Debug for TcpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpConnection")
            .field("channel", &self.channel())
            .field("peer", &self.peer())
            .field("open", &self.is_open())
            .finish()
    }
}

impl Shared {
    fn channel(&self) -> u8 {
        self.slot.id()
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Serialize and queue under the serializer lock, so sequence numbers
    /// reach the wire in order even with concurrent senders.
    fn enqueue_message(&self, msg: &Frame, sender: Identity) -> Result<bool> {
        let mut serializer = self.serializer.lock();
        let data = serializer.serialize(msg, sender)?;
        debug!(
            channel = self.channel(),
            msgid = msg.msgid,
            len = data.len(),
            sysid = sender.system_id,
            compid = sender.component_id,
            "send"
        );
        Ok(self.enqueue(data))
    }

    fn enqueue(&self, data: Bytes) -> bool {
        let mut state = self.state.lock();
        if !state.open {
            return false;
        }
        state.queue.push(data);
        if !state.tx_in_progress {
            self.tx_ready.notify_one();
        }
        true
    }

    fn dispatch(&self, frame: Frame) {
        if !self.is_open() {
            return;
        }
        let source = frame.identity();
        debug!(
            channel = self.channel(),
            msgid = frame.msgid,
            len = frame.payload.len(),
            sysid = source.system_id,
            compid = source.component_id,
            seq = frame.seq,
            "recv"
        );
        self.events.emit_frame(&frame, source);
    }

    fn close(&self) {
        let discarded = {
            let mut state = self.state.lock();
            if state.open {
                state.open = false;
                Some(state.queue.clear())
            } else {
                None
            }
        };

        if let Some(discarded) = discarded {
            info!(
                channel = self.channel(),
                peer = %self.peer,
                discarded,
                "connection closed"
            );
            self.tx_ready.notify_all();
            self.drained.notify_all();
            shutdown_stream(&self.stream);
        }

        self.join_workers();

        if discarded.is_some() {
            self.events.emit_closed();
        }
    }

    /// Join the I/O threads other than the calling one. A worker closing its
    /// own connection waits for its sibling but detaches itself.
    fn join_workers(&self) {
        let current = thread::current().id();
        let handles = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!(channel = self.channel(), "connection worker panicked");
            }
        }
    }
}

fn recv_loop(shared: Arc<Shared>) {
    let channel = shared.channel();
    let mut parser = FrameParser::with_config(shared.config.frame);
    let mut buf = vec![0u8; shared.config.read_buffer_size.max(1)];

    loop {
        let n = match (&shared.stream).read(&mut buf) {
            Ok(0) => {
                if shared.is_open() {
                    info!(channel, peer = %shared.peer, "connection closed by peer");
                }
                break;
            }
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                if shared.is_open() {
                    error!(channel, error = %err, "receive failed");
                }
                break;
            }
        };
        trace!(channel, bytes = n, "received");

        for &byte in &buf[..n] {
            if let Some(frame) = parser.parse_byte(byte) {
                shared.dispatch(frame);
                while let Some(frame) = parser.next_frame() {
                    shared.dispatch(frame);
                }
            }
        }
    }

    let stats = parser.stats();
    debug!(
        channel,
        frames = stats.frames,
        checksum_errors = stats.checksum_errors,
        dropped_bytes = stats.dropped_bytes,
        "reader finished"
    );
    shared.close();
}

fn drain_loop(shared: Arc<Shared>) {
    let channel = shared.channel();

    loop {
        let window = {
            let mut state = shared.state.lock();
            let window = loop {
                if !state.open {
                    return;
                }
                if let Some(window) = state.queue.head_window() {
                    break window;
                }
                shared.drained.notify_all();
                shared.tx_ready.wait(&mut state);
            };
            state.tx_in_progress = true;
            window
        };

        let written = (&shared.stream).write(&window);

        let mut state = shared.state.lock();
        state.tx_in_progress = false;
        if !state.open {
            return;
        }
        match written {
            Ok(0) => {
                drop(state);
                error!(channel, "send failed: socket accepted no bytes");
                break;
            }
            Ok(n) => {
                trace!(channel, bytes = n, pending = window.len() - n, "sent");
                state.queue.advance(n);
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => {
                drop(state);
                error!(channel, error = %err, "send failed");
                break;
            }
        }
    }

    shared.close();
}
