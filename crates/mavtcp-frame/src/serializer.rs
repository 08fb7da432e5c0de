use std::borrow::Cow;

use bytes::{Bytes, BytesMut};

use crate::codec::{encode_frame, Frame, FrameConfig, Identity};
use crate::error::Result;

/// Turns frames into wire buffers for one channel.
///
/// Owns the channel's transmit sequence counter. Frames whose declared
/// sender already matches the requested identity are copied as-is; all
/// others are re-finalized with the requested identity and the next
/// sequence number.
#[derive(Debug)]
pub struct FrameSerializer {
    config: FrameConfig,
    tx_seq: u8,
}

impl FrameSerializer {
    /// Create a new serializer with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a new serializer with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self { config, tx_seq: 0 }
    }

    /// Finalize a copy of `frame` for `sender` using the next sequence number.
    pub fn finalize(&mut self, frame: &Frame, sender: Identity) -> Frame {
        let mut out = frame.clone();
        let seq = self.next_seq();
        out.finalize(sender, seq, self.config.crc_extra);
        out
    }

    /// Encode `frame` as it should appear on the wire when sent by `sender`.
    pub fn serialize(&mut self, frame: &Frame, sender: Identity) -> Result<Bytes> {
        let frame = if frame.identity() == sender {
            Cow::Borrowed(frame)
        } else {
            Cow::Owned(self.finalize(frame, sender))
        };

        let mut buf = BytesMut::with_capacity(frame.wire_size());
        encode_frame(&frame, &mut buf)?;
        Ok(buf.freeze())
    }

    /// Sequence number the next finalized frame will carry.
    pub fn peek_seq(&self) -> u8 {
        self.tx_seq
    }

    /// Current serializer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn next_seq(&mut self) -> u8 {
        let seq = self.tx_seq;
        self.tx_seq = self.tx_seq.wrapping_add(1);
        seq
    }
}

impl Default for FrameSerializer {
    fn default() -> Self {
        Self::new()
    }
}
