use bytes::{BufMut, Bytes, BytesMut};

use crate::crc::crc16;
use crate::error::{FrameError, Result};

/// Start marker of a frame whose payload length fits one byte.
pub const START_SHORT: u8 = 0x02;

/// Start marker of a frame with a two-byte payload length.
pub const START_LONG: u8 = 0x03;

/// Terminator closing every frame.
pub const END_MARKER: u8 = 0x03;

/// Start marker + one length byte.
pub const SHORT_HEADER_SIZE: usize = 2;

/// Start marker + two length bytes.
pub const LONG_HEADER_SIZE: usize = 3;

/// CRC hi + CRC lo + end marker.
pub const TRAILER_SIZE: usize = 3;

/// Largest payload the long header can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// A verified frame payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The payload, command id first.
    pub payload: Bytes,
}

impl Frame {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Command id byte, if the payload is not empty.
    pub fn command_id(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    /// The total wire size of this frame (header + payload + trailer).
    pub fn wire_size(&self) -> usize {
        frame_size(self.payload.len())
    }
}

/// Wire size of a frame carrying `payload_len` bytes.
pub fn frame_size(payload_len: usize) -> usize {
    let header = if payload_len <= u8::MAX as usize {
        SHORT_HEADER_SIZE
    } else {
        LONG_HEADER_SIZE
    };
    header + payload_len + TRAILER_SIZE
}

/// Encode a payload into the wire format, returning the bytes written.
///
/// Wire format:
/// ```text
/// short: ┌──────┬─────────┬─────────────┬────────┬────────┬──────┐
///        │ 0x02 │ len (1) │ payload     │ crc hi │ crc lo │ 0x03 │
///        └──────┴─────────┴─────────────┴────────┴────────┴──────┘
/// long:  ┌──────┬─────────────┬─────────┬────────┬────────┬──────┐
///        │ 0x03 │ len (2B BE) │ payload │ crc hi │ crc lo │ 0x03 │
///        └──────┴─────────────┴─────────┴────────┴────────┴──────┘
/// ```
/// The CRC covers the payload only.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<usize> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }

    let total = frame_size(payload.len());
    dst.reserve(total);
    if payload.len() <= u8::MAX as usize {
        dst.put_u8(START_SHORT);
        dst.put_u8(payload.len() as u8);
    } else {
        dst.put_u8(START_LONG);
        dst.put_u16(payload.len() as u16);
    }
    dst.put_slice(payload);
    dst.put_u16(crc16(payload));
    dst.put_u8(END_MARKER);
    Ok(total)
}

/// Verify a complete short frame and return a view of its payload.
///
/// The terminator byte is not inspected; the receiver checks it before a
/// frame is handed over.
pub fn unpack_frame(frame: &[u8]) -> Result<&[u8]> {
    if frame.len() < SHORT_HEADER_SIZE + TRAILER_SIZE {
        return Err(FrameError::Truncated {
            needed: SHORT_HEADER_SIZE + TRAILER_SIZE,
            available: frame.len(),
        });
    }

    match frame[0] {
        START_SHORT => {}
        START_LONG => {
            let declared_len = u16::from_be_bytes([frame[1], frame[2]]);
            return Err(FrameError::UnsupportedLongFrame { declared_len });
        }
        other => return Err(FrameError::InvalidStartMarker(other)),
    }

    let declared = frame[1] as usize;
    let needed = SHORT_HEADER_SIZE + declared + TRAILER_SIZE;
    if frame.len() != needed {
        return Err(FrameError::Truncated {
            needed,
            available: frame.len(),
        });
    }

    let trailer = &frame[frame.len() - TRAILER_SIZE..];
    let expected = u16::from_be_bytes([trailer[0], trailer[1]]);
    let payload = &frame[SHORT_HEADER_SIZE..SHORT_HEADER_SIZE + declared];
    let computed = crc16(payload);

    if computed != expected {
        return Err(FrameError::ChecksumMismatch { expected, computed });
    }
    Ok(payload)
}

/// Like [`unpack_frame`], but copies the payload into `dst`.
pub fn unpack_frame_into(frame: &[u8], dst: &mut BytesMut) -> Result<usize> {
    let payload = unpack_frame(frame)?;
    dst.extend_from_slice(payload);
    Ok(payload.len())
}
