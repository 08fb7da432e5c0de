use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::crc::{self, CrcExtraFn, X25_INIT};
use crate::error::{FrameError, Result};

/// Start-of-frame marker for MAVLink v1.
pub const STX_V1: u8 = 0xFE;
/// Start-of-frame marker for MAVLink v2.
pub const STX_V2: u8 = 0xFD;

/// v1 header: STX, len, seq, sysid, compid, msgid.
pub const HEADER_SIZE_V1: usize = 6;
/// v2 header: STX, len, incompat, compat, seq, sysid, compid, msgid (3 bytes).
pub const HEADER_SIZE_V2: usize = 10;
pub const CHECKSUM_SIZE: usize = 2;
pub const SIGNATURE_SIZE: usize = 13;

/// Largest payload a length byte can describe.
pub const MAX_PAYLOAD_LEN: usize = 255;
/// Largest possible frame on the wire (signed v2 with full payload).
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE_V2 + MAX_PAYLOAD_LEN + CHECKSUM_SIZE + SIGNATURE_SIZE;

/// v2 incompatibility flag: frame carries a signature block.
pub const IFLAG_SIGNED: u8 = 0x01;

const MAX_MSGID_V2: u32 = 0x00FF_FFFF;

/// Wire protocol revision of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    V1,
    V2,
}

impl Version {
    pub fn magic(self) -> u8 {
        match self {
            Version::V1 => STX_V1,
            Version::V2 => STX_V2,
        }
    }

    pub fn header_size(self) -> usize {
        match self {
            Version::V1 => HEADER_SIZE_V1,
            Version::V2 => HEADER_SIZE_V2,
        }
    }

    pub fn from_magic(magic: u8) -> Option<Self> {
        match magic {
            STX_V1 => Some(Version::V1),
            STX_V2 => Some(Version::V2),
            _ => None,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::V1 => f.write_str("MAVLink v1"),
            Version::V2 => f.write_str("MAVLink v2"),
        }
    }
}

/// Sender identity carried in every frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Identity {
    pub system_id: u8,
    pub component_id: u8,
}

impl Identity {
    pub const fn new(system_id: u8, component_id: u8) -> Self {
        Self {
            system_id,
            component_id,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.system_id, self.component_id)
    }
}

/// One MAVLink frame: header fields, payload and checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub version: Version,
    /// v2 only; always 0 for v1 frames.
    pub incompat_flags: u8,
    /// v2 only; always 0 for v1 frames.
    pub compat_flags: u8,
    pub seq: u8,
    pub sysid: u8,
    pub compid: u8,
    pub msgid: u32,
    pub payload: Bytes,
    pub checksum: u16,
    pub signature: Option<[u8; SIGNATURE_SIZE]>,
}

impl Frame {
    /// Create an unfinalized frame: zero identity, sequence and checksum.
    ///
    /// Call [`Frame::finalize`] (or send it through a serializer with an
    /// identity) before putting it on the wire.
    pub fn new(version: Version, msgid: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            version,
            incompat_flags: 0,
            compat_flags: 0,
            seq: 0,
            sysid: 0,
            compid: 0,
            msgid,
            payload: payload.into(),
            checksum: 0,
            signature: None,
        }
    }

    /// Declared sender of this frame.
    pub fn identity(&self) -> Identity {
        Identity::new(self.sysid, self.compid)
    }

    pub fn is_signed(&self) -> bool {
        self.version == Version::V2
            && self.incompat_flags & IFLAG_SIGNED != 0
            && self.signature.is_some()
    }

    /// Total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        let signature = if self.is_signed() { SIGNATURE_SIZE } else { 0 };
        self.version.header_size() + self.payload.len() + CHECKSUM_SIZE + signature
    }

    /// Checksum the frame should carry given its current header and payload.
    pub fn compute_checksum(&self, crc_extra: CrcExtraFn) -> u16 {
        let (header, len) = self.header_bytes();
        let crc = crc::accumulate_slice(&header[..len], X25_INIT);
        let crc = crc::accumulate_slice(&self.payload, crc);
        crc::accumulate(crc_extra(self.msgid), crc)
    }

    pub fn has_valid_checksum(&self, crc_extra: CrcExtraFn) -> bool {
        self.checksum == self.compute_checksum(crc_extra)
    }

    /// Stamp sender identity and sequence, then recompute the checksum.
    ///
    /// v2 frames get their trailing zero payload bytes trimmed (at least one
    /// byte is kept) and lose any signature, which cannot survive a rewrite.
    pub fn finalize(&mut self, identity: Identity, seq: u8, crc_extra: CrcExtraFn) {
        self.sysid = identity.system_id;
        self.compid = identity.component_id;
        self.seq = seq;

        if self.version == Version::V2 {
            self.incompat_flags &= !IFLAG_SIGNED;
            self.signature = None;
            let trimmed = trimmed_len(&self.payload);
            self.payload.truncate(trimmed);
        }

        self.checksum = self.compute_checksum(crc_extra);
    }

    /// Encode into a standalone buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        encode_frame(self, &mut buf)?;
        Ok(buf.freeze())
    }

    /// Header bytes covered by the checksum (everything after STX).
    fn header_bytes(&self) -> ([u8; HEADER_SIZE_V2 - 1], usize) {
        let mut header = [0u8; HEADER_SIZE_V2 - 1];
        let len = self.payload.len() as u8;
        match self.version {
            Version::V1 => {
                header[..5].copy_from_slice(&[len, self.seq, self.sysid, self.compid, self.msgid as u8]);
                (header, HEADER_SIZE_V1 - 1)
            }
            Version::V2 => {
                let id = self.msgid.to_le_bytes();
                header.copy_from_slice(&[
                    len,
                    self.incompat_flags,
                    self.compat_flags,
                    self.seq,
                    self.sysid,
                    self.compid,
                    id[0],
                    id[1],
                    id[2],
                ]);
                (header, HEADER_SIZE_V2 - 1)
            }
        }
    }
}

fn trimmed_len(payload: &[u8]) -> usize {
    let mut len = payload.len();
    while len > 1 && payload[len - 1] == 0 {
        len -= 1;
    }
    len
}

/// Encode a frame into the wire format, as-is.
///
/// v1:
/// ```text
/// ┌──────┬─────┬─────┬───────┬────────┬───────┬───────────┬──────────┐
/// │ 0xFE │ len │ seq │ sysid │ compid │ msgid │ payload   │ crc (LE) │
/// └──────┴─────┴─────┴───────┴────────┴───────┴───────────┴──────────┘
/// ```
/// v2:
/// ```text
/// ┌──────┬─────┬──────────┬────────┬─────┬───────┬────────┬──────────┬─────────┬──────────┬─────────────┐
/// │ 0xFD │ len │ incompat │ compat │ seq │ sysid │ compid │ msgid 3B │ payload │ crc (LE) │ [signature] │
/// └──────┴─────┴──────────┴────────┴─────┴───────┴────────┴──────────┴─────────┴──────────┴─────────────┘
/// ```
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    if frame.payload.len() > MAX_PAYLOAD_LEN {
        return Err(FrameError::PayloadTooLarge {
            size: frame.payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }
    let max_msgid = match frame.version {
        Version::V1 => u32::from(u8::MAX),
        Version::V2 => MAX_MSGID_V2,
    };
    if frame.msgid > max_msgid {
        return Err(FrameError::MessageIdOutOfRange {
            msgid: frame.msgid,
            version: frame.version,
        });
    }

    let (header, len) = frame.header_bytes();
    dst.reserve(frame.wire_size());
    dst.put_u8(frame.version.magic());
    dst.put_slice(&header[..len]);
    dst.put_slice(&frame.payload);
    dst.put_u16_le(frame.checksum);
    match &frame.signature {
        Some(signature) if frame.is_signed() => dst.put_slice(signature),
        _ => {}
    }
    Ok(())
}

/// Decode a frame from the front of a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. Errors leave the
/// buffer untouched; resynchronisation is the caller's decision.
pub fn decode_frame(src: &mut BytesMut, config: &FrameConfig) -> Result<Option<Frame>> {
    let Some(&magic) = src.first() else {
        return Ok(None);
    };
    let version = Version::from_magic(magic).ok_or(FrameError::InvalidMagic(magic))?;

    let header_size = version.header_size();
    if src.len() < header_size {
        return Ok(None); // Need more data
    }

    let payload_len = src[1] as usize;
    let (incompat_flags, compat_flags, seq, sysid, compid, msgid) = match version {
        Version::V1 => (0, 0, src[2], src[3], src[4], u32::from(src[5])),
        Version::V2 => (
            src[2],
            src[3],
            src[4],
            src[5],
            src[6],
            u32::from_le_bytes([src[7], src[8], src[9], 0]),
        ),
    };

    if incompat_flags & !IFLAG_SIGNED != 0 {
        return Err(FrameError::UnsupportedIncompatFlags(incompat_flags));
    }
    let signed = incompat_flags & IFLAG_SIGNED != 0;

    let crc_end = header_size + payload_len;
    let total = crc_end + CHECKSUM_SIZE + if signed { SIGNATURE_SIZE } else { 0 };
    if src.len() < total {
        return Ok(None); // Need more data
    }

    let received = u16::from_le_bytes([src[crc_end], src[crc_end + 1]]);
    let computed = crc::accumulate(
        (config.crc_extra)(msgid),
        crc::accumulate_slice(&src[1..crc_end], X25_INIT),
    );
    if received != computed {
        return Err(FrameError::ChecksumMismatch {
            msgid,
            received,
            computed,
        });
    }

    let signature = if signed {
        let mut block = [0u8; SIGNATURE_SIZE];
        block.copy_from_slice(&src[crc_end + CHECKSUM_SIZE..total]);
        Some(block)
    } else {
        None
    };

    let mut raw = src.split_to(total);
    raw.advance(header_size);
    let payload = raw.split_to(payload_len).freeze();

    Ok(Some(Frame {
        version,
        incompat_flags,
        compat_flags,
        seq,
        sysid,
        compid,
        msgid,
        payload,
        checksum: received,
        signature,
    }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone, Copy)]
pub struct FrameConfig {
    /// `CRC_EXTRA` lookup. Default: the built-in common-dialect table.
    pub crc_extra: CrcExtraFn,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            crc_extra: crc::crc_extra,
        }
    }
}
