//! MAVLink frame codec.
//!
//! Every message on the wire is framed with:
//! - a start marker (`0xFE` for v1, `0xFD` for v2)
//! - a length byte and header (sequence, sender identity, message id)
//! - the payload
//! - a CRC-16/MCRF4XX checksum seeded with the message's `CRC_EXTRA`
//!
//! [`FrameParser`] recognises frames incrementally and recovers from garbage
//! and truncated frames; [`FrameSerializer`] re-finalizes frames for a
//! sender identity. Channel slots live in [`channel`].

pub mod channel;
pub mod codec;
pub mod crc;
pub mod error;
pub mod parser;
pub mod serializer;
#[cfg(feature = "async")]
pub mod tokio_codec;

pub use channel::{ChannelPool, ChannelSlot, MAX_CHANNELS};
pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, Identity, Version, MAX_FRAME_SIZE,
    MAX_PAYLOAD_LEN,
};
pub use error::{FrameError, Result};
pub use parser::{FrameParser, ParserStats};
pub use serializer::FrameSerializer;
#[cfg(feature = "async")]
pub use tokio_codec::MavCodec;
