//! Byte-at-a-time frame recognition shared by both receive strategies.

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::codec::{
    END_MARKER, LONG_HEADER_SIZE, SHORT_HEADER_SIZE, START_LONG, START_SHORT, TRAILER_SIZE,
};

/// Default receive buffer capacity.
pub const DEFAULT_BUFFER_CAPACITY: usize = 256;

/// Smallest buffer able to hold an empty short frame.
const MIN_BUFFER_CAPACITY: usize = SHORT_HEADER_SIZE + TRAILER_SIZE;

/// Why a partially received frame was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// A byte outside any frame was not a start marker.
    InvalidStartMarker(u8),
    /// The declared length does not fit the receive buffer.
    Oversize { declared_len: usize, capacity: usize },
    /// The byte at the expected terminator position was not `0x03`.
    BadTerminator(u8),
}

/// Result of feeding one byte to the [`FrameAssembler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblerEvent {
    /// More bytes are needed.
    Pending,
    /// A correctly terminated short frame, header and trailer included.
    /// Its CRC has not been checked yet.
    Complete(Bytes),
    /// The frame in progress was discarded; scanning continues.
    Dropped(DropReason),
    /// A long-form header was read. The remaining bytes of that frame will be
    /// skipped silently.
    LongFrame { declared_len: u16 },
}

/// Frame recognition state machine.
///
/// Holds the in-progress frame in an owned buffer of fixed capacity; a frame
/// whose declared size exceeds it is dropped at the length byte, so the
/// buffer never grows past its capacity.
#[derive(Debug)]
pub struct FrameAssembler {
    buf: BytesMut,
    capacity: usize,
    expected_total: Option<usize>,
    skip: usize,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_BUFFER_CAPACITY);
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
            expected_total: None,
            skip: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes of the frame in progress.
    pub fn received(&self) -> usize {
        self.buf.len()
    }

    /// Total frame size announced by the length byte, once seen.
    pub fn expected_total(&self) -> Option<usize> {
        self.expected_total
    }

    /// True while trailing bytes of an unsupported long frame are being skipped.
    pub fn is_skipping(&self) -> bool {
        self.skip > 0
    }

    /// Forget the frame in progress. Bytes still owed by a reported long
    /// frame keep being skipped.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.expected_total = None;
    }

    /// Forget everything, including any long-frame skip.
    pub fn clear(&mut self) {
        self.reset();
        self.skip = 0;
    }

    pub fn push(&mut self, byte: u8) -> AssemblerEvent {
        if self.skip > 0 {
            self.skip -= 1;
            return AssemblerEvent::Pending;
        }

        if self.buf.is_empty() && byte != START_SHORT && byte != START_LONG {
            return AssemblerEvent::Dropped(DropReason::InvalidStartMarker(byte));
        }

        self.buf.extend_from_slice(&[byte]);
        let received = self.buf.len();

        match (self.buf[0], received) {
            (START_SHORT, SHORT_HEADER_SIZE) => {
                let declared_len = self.buf[1] as usize;
                let total = SHORT_HEADER_SIZE + declared_len + TRAILER_SIZE;
                if total > self.capacity {
                    self.reset();
                    return AssemblerEvent::Dropped(DropReason::Oversize {
                        declared_len,
                        capacity: self.capacity,
                    });
                }
                trace!(declared_len, total, "short frame header");
                self.expected_total = Some(total);
            }
            (START_LONG, LONG_HEADER_SIZE) => {
                let declared_len = u16::from_be_bytes([self.buf[1], self.buf[2]]);
                self.reset();
                self.skip = declared_len as usize + TRAILER_SIZE;
                return AssemblerEvent::LongFrame { declared_len };
            }
            _ => {}
        }

        if self.expected_total == Some(received) {
            self.expected_total = None;
            if byte != END_MARKER {
                self.buf.clear();
                return AssemblerEvent::Dropped(DropReason::BadTerminator(byte));
            }
            let frame = self.buf.split().freeze();
            self.buf.reserve(self.capacity);
            return AssemblerEvent::Complete(frame);
        }

        AssemblerEvent::Pending
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::encode_frame;

    fn feed(assembler: &mut FrameAssembler, bytes: &[u8]) -> Vec<AssemblerEvent> {
        bytes
            .iter()
            .map(|&b| assembler.push(b))
            .filter(|event| *event != AssemblerEvent::Pending)
            .collect()
    }

    fn wire(payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_frame(payload, &mut buf).unwrap();
        buf
    }

    #[test]
    fn completes_short_frame() {
        let mut assembler = FrameAssembler::new();
        let frame = wire(&[0x00, 0x03, 0x3E]);

        let events = feed(&mut assembler, &frame);
        assert_eq!(events, vec![AssemblerEvent::Complete(frame.freeze())]);
        assert_eq!(assembler.received(), 0);
    }

    #[test]
    fn back_to_back_frames() {
        let mut assembler = FrameAssembler::new();
        let mut stream = wire(&[0x1E]);
        stream.extend_from_slice(&wire(&[0x00]));

        let events = feed(&mut assembler, &stream);
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| matches!(e, AssemblerEvent::Complete(_))));
    }

    #[test]
    fn garbage_before_start_is_dropped_byte_by_byte() {
        let mut assembler = FrameAssembler::new();
        let mut stream = BytesMut::from(&[0xFF, 0x55][..]);
        stream.extend_from_slice(&wire(&[0x1E]));

        let events = feed(&mut assembler, &stream);
        assert_eq!(
            events[..2],
            [
                AssemblerEvent::Dropped(DropReason::InvalidStartMarker(0xFF)),
                AssemblerEvent::Dropped(DropReason::InvalidStartMarker(0x55)),
            ]
        );
        assert!(matches!(events[2], AssemblerEvent::Complete(_)));
    }

    #[test]
    fn wrong_terminator_drops_frame() {
        let mut assembler = FrameAssembler::new();
        let mut frame = wire(&[0x1E]).to_vec();
        *frame.last_mut().unwrap() = 0x7E;

        let events = feed(&mut assembler, &frame);
        assert_eq!(
            events,
            vec![AssemblerEvent::Dropped(DropReason::BadTerminator(0x7E))]
        );
        assert_eq!(assembler.received(), 0);
    }

    #[test]
    fn declared_length_beyond_capacity_is_dropped() {
        let mut assembler = FrameAssembler::with_capacity(16);
        let events = feed(&mut assembler, &[0x02, 20]);

        assert_eq!(
            events,
            vec![AssemblerEvent::Dropped(DropReason::Oversize {
                declared_len: 20,
                capacity: 16
            })]
        );
    }

    #[test]
    fn default_capacity_rejects_largest_short_frames() {
        let mut assembler = FrameAssembler::new();
        // 251 + 5 fits exactly, 252 + 5 does not.
        assert!(feed(&mut assembler, &[0x02, 251]).is_empty());
        assembler.reset();
        let events = feed(&mut assembler, &[0x02, 252]);
        assert!(matches!(
            events[..],
            [AssemblerEvent::Dropped(DropReason::Oversize { .. })]
        ));
    }

    #[test]
    fn long_frame_is_reported_then_skipped() {
        let mut assembler = FrameAssembler::new();
        let long = wire(&vec![0x02; 300]);
        let mut stream = long.clone();
        stream.extend_from_slice(&wire(&[0x1E]));

        let events = feed(&mut assembler, &stream);
        assert_eq!(
            events,
            vec![
                AssemblerEvent::LongFrame { declared_len: 300 },
                AssemblerEvent::Complete(wire(&[0x1E]).freeze()),
            ]
        );
        assert!(!assembler.is_skipping());
    }

    #[test]
    fn reset_keeps_skip_but_clear_does_not() {
        let mut assembler = FrameAssembler::new();
        feed(&mut assembler, &[0x03, 0x01, 0x00]);
        assert!(assembler.is_skipping());

        assembler.reset();
        assert!(assembler.is_skipping());

        assembler.clear();
        assert!(!assembler.is_skipping());
    }

    #[test]
    fn partial_frame_reports_progress() {
        let mut assembler = FrameAssembler::new();
        feed(&mut assembler, &[0x02, 10, 1, 2, 3]);

        assert_eq!(assembler.received(), 5);
        assert_eq!(assembler.expected_total(), Some(15));
    }
}
