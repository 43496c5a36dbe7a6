//! CRC-checked framing for VESC-style UART links.
//!
//! Every message travels as:
//! - a start marker (`0x02` short, `0x03` long)
//! - a one-byte (short) or two-byte big-endian (long) payload length
//! - the payload, command id first
//! - a big-endian CRC-16/XMODEM of the payload
//! - the `0x03` terminator
//!
//! Long frames can be encoded but not decoded; receiving one is reported
//! rather than misparsed.

pub mod assembler;
pub mod buffer;
pub mod codec;
pub mod crc;
pub mod error;
pub mod receiver;
#[cfg(feature = "async")]
pub mod stream_codec;
pub mod writer;

pub use assembler::{AssemblerEvent, DropReason, FrameAssembler, DEFAULT_BUFFER_CAPACITY};
pub use buffer::{PayloadBuilder, PayloadCursor, MAX_SHORT_PAYLOAD};
pub use codec::{
    encode_frame, frame_size, unpack_frame, unpack_frame_into, Frame, END_MARKER, MAX_PAYLOAD,
    START_LONG, START_SHORT,
};
pub use crc::crc16;
pub use error::{FrameError, Result};
pub use receiver::{FrameReceiver, ReceiveOutcome, ReceiverConfig, DEFAULT_TIMEOUT};
#[cfg(feature = "async")]
pub use stream_codec::VescCodec;
pub use writer::FrameWriter;
