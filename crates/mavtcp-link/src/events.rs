//! Subscriber lists for link notifications.
//!
//! Handlers run on the link's I/O threads. Every emit snapshots the current
//! subscriber list and calls the handlers with no lock held, so a handler
//! may send, subscribe, unsubscribe or close the link it was invoked from.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};

use mavtcp_frame::{Frame, Identity};
use parking_lot::Mutex;

/// Handler for received frames: `(frame, sender identity)`.
pub type FrameHandler = dyn Fn(&Frame, Identity) + Send + Sync;

/// Handler for the one-shot closed notification.
pub type ClosedHandler = dyn Fn() + Send + Sync;

/// Token returned by a subscription, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Tagged event delivered through [`LinkEvents::subscribe`].
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Frame { frame: Frame, source: Identity },
    Closed,
}

struct Subscribers<H: ?Sized> {
    handlers: Mutex<Vec<(SubscriptionId, Arc<H>)>>,
}

impl<H: ?Sized> Subscribers<H> {
    fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }

    fn add(&self, id: SubscriptionId, handler: Arc<H>) {
        self.handlers.lock().push((id, handler));
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    fn snapshot(&self) -> Vec<Arc<H>> {
        self.handlers
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }

    fn clear(&self) {
        self.handlers.lock().clear();
    }

    fn len(&self) -> usize {
        self.handlers.lock().len()
    }
}

/// Frame-received and closed notifications of one link.
pub struct LinkEvents {
    next_id: AtomicU64,
    frames: Subscribers<FrameHandler>,
    closed: Subscribers<ClosedHandler>,
}

impl LinkEvents {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            frames: Subscribers::new(),
            closed: Subscribers::new(),
        }
    }

    /// Call `handler` for every frame received while the link is open.
    pub fn on_frame<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Frame, Identity) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.frames.add(id, Arc::new(handler));
        id
    }

    /// Call `handler` once when the link closes.
    pub fn on_closed<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.closed.add(id, Arc::new(handler));
        id
    }

    /// Deliver every event through a channel instead of a callback.
    ///
    /// Events sent after the receiver is dropped are discarded.
    pub fn subscribe(&self) -> mpsc::Receiver<LinkEvent> {
        let (tx, rx) = mpsc::channel();
        let frames = tx.clone();
        self.on_frame(move |frame, source| {
            let _ = frames.send(LinkEvent::Frame {
                frame: frame.clone(),
                source,
            });
        });
        self.on_closed(move || {
            let _ = tx.send(LinkEvent::Closed);
        });
        rx
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.frames.remove(id) || self.closed.remove(id)
    }

    /// Remove every closed handler.
    pub fn clear_closed(&self) {
        self.closed.clear();
    }

    /// Number of live subscriptions of either kind.
    pub fn subscriber_count(&self) -> usize {
        self.frames.len() + self.closed.len()
    }

    pub(crate) fn emit_frame(&self, frame: &Frame, source: Identity) {
        for handler in self.frames.snapshot() {
            handler(frame, source);
        }
    }

    pub(crate) fn emit_closed(&self) {
        for handler in self.closed.snapshot() {
            handler();
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for LinkEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LinkEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkEvents")
            .field("frame_handlers", &self.frames.len())
            .field("closed_handlers", &self.closed.len())
            .finish()
    }
}
