use crate::codec::Version;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The buffer does not start with a MAVLink start-of-frame marker.
    #[error("invalid frame magic 0x{0:02x} (expected 0xfe or 0xfd)")]
    InvalidMagic(u8),

    /// The trailing checksum does not match the frame contents.
    #[error("checksum mismatch for message {msgid}: received 0x{received:04x}, computed 0x{computed:04x}")]
    ChecksumMismatch {
        msgid: u32,
        received: u16,
        computed: u16,
    },

    /// The payload exceeds what the length byte can express.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The message id cannot be represented in the frame version.
    #[error("message id {msgid} does not fit a {version} frame")]
    MessageIdOutOfRange { msgid: u32, version: Version },

    /// A v2 frame carries incompatibility flags this codec does not understand.
    #[error("unsupported incompatibility flags 0x{0:02x}")]
    UnsupportedIncompatFlags(u8),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
