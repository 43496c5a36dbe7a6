//! `tokio_util::codec` adapter for async serial streams.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::assembler::{AssemblerEvent, FrameAssembler, DEFAULT_BUFFER_CAPACITY};
use crate::codec::{encode_frame, Frame};
use crate::error::{FrameError, Result};
use crate::receiver::{verify, ReceiveOutcome};

/// Frame codec for `FramedRead`/`FramedWrite`.
///
/// Yields [`ReceiveOutcome::Frame`], [`ReceiveOutcome::ChecksumFailed`] or
/// [`ReceiveOutcome::UnsupportedLongFrame`] so a bad frame does not end the
/// stream. Deadlines are left to the caller (`tokio::time::timeout`).
#[derive(Debug)]
pub struct VescCodec {
    assembler: FrameAssembler,
}

impl VescCodec {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }

    pub fn with_capacity(buffer_capacity: usize) -> Self {
        Self {
            assembler: FrameAssembler::with_capacity(buffer_capacity),
        }
    }
}

impl Default for VescCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for VescCodec {
    type Item = ReceiveOutcome;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<ReceiveOutcome>> {
        while src.has_remaining() {
            match self.assembler.push(src.get_u8()) {
                AssemblerEvent::Pending => {}
                AssemblerEvent::Dropped(reason) => {
                    warn!(?reason, "dropped malformed frame");
                }
                AssemblerEvent::LongFrame { declared_len } => {
                    return Ok(Some(ReceiveOutcome::UnsupportedLongFrame { declared_len }));
                }
                AssemblerEvent::Complete(raw) => return verify(raw).map(Some),
            }
        }
        Ok(None)
    }
}

impl Encoder<Frame> for VescCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        encode_frame(&frame.payload, dst).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_across_chunks() {
        let mut codec = VescCodec::new();
        let mut wire = BytesMut::new();
        codec.encode(Frame::new(vec![0x00, 0x03, 0x3E]), &mut wire).unwrap();

        let mut src = BytesMut::from(&wire[..3]);
        assert!(codec.decode(&mut src).unwrap().is_none());
        src.extend_from_slice(&wire[3..]);

        assert_eq!(
            codec.decode(&mut src).unwrap(),
            Some(ReceiveOutcome::Frame(Frame::new(vec![0x00, 0x03, 0x3E])))
        );
        assert!(src.is_empty());
    }

    #[test]
    fn bad_checksum_does_not_end_stream() {
        let mut codec = VescCodec::new();
        let mut src = BytesMut::new();
        codec.encode(Frame::new(vec![0x1E]), &mut src).unwrap();
        src[2] ^= 0x01;
        codec.encode(Frame::new(vec![0x1E]), &mut src).unwrap();

        assert!(matches!(
            codec.decode(&mut src).unwrap(),
            Some(ReceiveOutcome::ChecksumFailed { .. })
        ));
        assert_eq!(
            codec.decode(&mut src).unwrap(),
            Some(ReceiveOutcome::Frame(Frame::new(vec![0x1E])))
        );
    }

    #[test]
    fn long_frame_reported_and_skipped() {
        let mut codec = VescCodec::new();
        let mut src = BytesMut::new();
        codec.encode(Frame::new(vec![0x00; 400]), &mut src).unwrap();
        codec.encode(Frame::new(vec![0x1E]), &mut src).unwrap();

        assert_eq!(
            codec.decode(&mut src).unwrap(),
            Some(ReceiveOutcome::UnsupportedLongFrame { declared_len: 400 })
        );
        assert_eq!(
            codec.decode(&mut src).unwrap(),
            Some(ReceiveOutcome::Frame(Frame::new(vec![0x1E])))
        );
    }

    #[test]
    fn agrees_with_blocking_receiver() {
        use vescwire_transport::{ManualClock, MemoryPort};

        use crate::receiver::FrameReceiver;

        let mut wire = BytesMut::new();
        let mut codec = VescCodec::new();
        codec.encode(Frame::new(vec![0x00, 3, 62]), &mut wire).unwrap();
        wire[3] ^= 0x10;

        let mut port = MemoryPort::new();
        port.push_rx(&wire);
        let blocking = FrameReceiver::new()
            .receive_blocking(&mut port, &ManualClock::with_step(1))
            .unwrap();

        let mut src = wire.clone();
        assert_eq!(codec.decode(&mut src).unwrap(), Some(blocking));
    }
}
