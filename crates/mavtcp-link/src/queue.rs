use std::collections::VecDeque;

use bytes::Bytes;

/// One outbound buffer with a cursor over the bytes already written.
#[derive(Debug, Clone)]
pub struct TxBuffer {
    data: Bytes,
    pos: usize,
}

impl TxBuffer {
    pub fn new(data: Bytes) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet written, as a cheap slice of the original buffer.
    pub fn window(&self) -> Bytes {
        self.data.slice(self.pos..)
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_sent(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn advance(&mut self, n: usize) {
        debug_assert!(n <= self.remaining(), "advanced past end of buffer");
        self.pos = (self.pos + n).min(self.data.len());
    }
}

/// FIFO of outbound buffers.
///
/// Only the head buffer is ever in flight. A partial write moves the head's
/// cursor; the head is retired once fully written, so bytes from separate
/// buffers never interleave.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    buffers: VecDeque<TxBuffer>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a buffer. Empty buffers are ignored.
    pub fn push(&mut self, data: Bytes) {
        if !data.is_empty() {
            self.buffers.push_back(TxBuffer::new(data));
        }
    }

    /// Unsent bytes of the head buffer, if any.
    pub fn head_window(&self) -> Option<Bytes> {
        self.buffers.front().map(TxBuffer::window)
    }

    /// Record that `n` bytes of the head were written.
    ///
    /// Returns `true` when the head was fully written and retired.
    pub fn advance(&mut self, n: usize) -> bool {
        let Some(head) = self.buffers.front_mut() else {
            return false;
        };
        head.advance(n);
        if head.is_sent() {
            self.buffers.pop_front();
            true
        } else {
            false
        }
    }

    /// Drop every pending buffer, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let discarded = self.buffers.len();
        self.buffers.clear();
        discarded
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Total unsent bytes across all buffers.
    pub fn pending_bytes(&self) -> usize {
        self.buffers.iter().map(TxBuffer::remaining).sum()
    }
}
