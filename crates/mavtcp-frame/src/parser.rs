use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::codec::{decode_frame, Frame, FrameConfig, MAX_FRAME_SIZE, STX_V1, STX_V2};
use crate::error::FrameError;

/// Counters kept by a [`FrameParser`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserStats {
    /// Frames that passed the checksum.
    pub frames: u64,
    /// Candidate frames rejected by checksum.
    pub checksum_errors: u64,
    /// Bytes discarded while searching for a start marker.
    pub dropped_bytes: u64,
}

/// Incremental MAVLink parser fed one byte (or chunk) at a time.
///
/// Keeps the bytes of the frame under construction. When a candidate frame
/// fails validation only its start marker is discarded and the rest is
/// rescanned, so a truncated frame never swallows the frame behind it.
#[derive(Debug)]
pub struct FrameParser {
    buf: BytesMut,
    config: FrameConfig,
    stats: ParserStats,
}

impl FrameParser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a new parser with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(MAX_FRAME_SIZE),
            config,
            stats: ParserStats::default(),
        }
    }

    /// Feed one byte; returns a frame if this byte completed one.
    ///
    /// After a checksum failure more than one frame can become available at
    /// once; drain the rest with [`FrameParser::next_frame`].
    pub fn parse_byte(&mut self, byte: u8) -> Option<Frame> {
        self.buf.extend_from_slice(&[byte]);
        self.next_frame()
    }

    /// Append a chunk without decoding it.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Decode the next complete frame from buffered bytes, if any.
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            self.skip_to_start();

            match decode_frame(&mut self.buf, &self.config) {
                Ok(Some(frame)) => {
                    self.stats.frames += 1;
                    return Some(frame);
                }
                Ok(None) => return None,
                Err(err) => {
                    if matches!(err, FrameError::ChecksumMismatch { .. }) {
                        self.stats.checksum_errors += 1;
                    }
                    trace!(error = %err, "discarding frame candidate");
                    self.buf.advance(1);
                    self.stats.dropped_bytes += 1;
                }
            }
        }
    }

    /// Drop buffered bytes and keep counters.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Number of bytes waiting for the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn stats(&self) -> ParserStats {
        self.stats
    }

    /// Current parser configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn skip_to_start(&mut self) {
        let start = self
            .buf
            .iter()
            .position(|&b| b == STX_V1 || b == STX_V2)
            .unwrap_or(self.buf.len());
        if start > 0 {
            self.buf.advance(start);
            self.stats.dropped_bytes += start as u64;
        }
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}
