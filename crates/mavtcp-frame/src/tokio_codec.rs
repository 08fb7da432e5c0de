use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::FrameError;
use crate::parser::{FrameParser, ParserStats};

/// `tokio_util` codec over the incremental parser.
///
/// Decoding has the same resynchronisation behaviour as [`FrameParser`]:
/// invalid frames are skipped, never reported as stream errors.
#[derive(Debug, Default)]
pub struct MavCodec {
    parser: FrameParser,
}

impl MavCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            parser: FrameParser::with_config(config),
        }
    }

    pub fn stats(&self) -> ParserStats {
        self.parser.stats()
    }
}

impl Decoder for MavCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        if !src.is_empty() {
            let chunk = src.split();
            self.parser.extend_from_slice(&chunk);
        }
        Ok(self.parser.next_frame())
    }
}

impl Encoder<Frame> for MavCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(&item, dst)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;
    use crate::codec::{Identity, Version};
    use crate::crc;

    fn frame(seq: u8) -> Frame {
        let mut frame = Frame::new(Version::V2, 0, vec![0, 0, 0, 0, 2, 3, 81, 4, 3]);
        frame.finalize(Identity::new(1, 1), seq, crc::crc_extra);
        frame
    }

    #[tokio::test]
    async fn framed_read_yields_frames_in_order() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&[0x00, 0x01]);
        wire.extend_from_slice(&frame(1).to_bytes().unwrap());
        wire.extend_from_slice(&frame(2).to_bytes().unwrap());

        let mut reader = FramedRead::new(wire.as_slice(), MavCodec::new());
        assert_eq!(reader.next().await.unwrap().unwrap().seq, 1);
        assert_eq!(reader.next().await.unwrap().unwrap().seq, 2);
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn framed_write_then_read_over_duplex() {
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = FramedWrite::new(client, MavCodec::new());
        let mut reader = FramedRead::new(server, MavCodec::new());

        writer.send(frame(5)).await.unwrap();
        writer.send(frame(6)).await.unwrap();

        assert_eq!(reader.next().await.unwrap().unwrap(), frame(5));
        assert_eq!(reader.next().await.unwrap().unwrap(), frame(6));
    }
}
