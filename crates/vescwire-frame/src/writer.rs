use bytes::BytesMut;
use tracing::debug;
use vescwire_transport::SerialPort;

use crate::codec::{encode_frame, frame_size, Frame, MAX_PAYLOAD};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 256 + 8;

/// Writes complete frames to a [`SerialPort`].
#[derive(Debug)]
pub struct FrameWriter {
    buf: BytesMut,
    max_payload_size: usize,
}

impl FrameWriter {
    /// Create a new frame writer accepting any payload the header can describe.
    pub fn new() -> Self {
        Self::with_max_payload(MAX_PAYLOAD)
    }

    /// Create a frame writer that refuses payloads above `max_payload_size`.
    pub fn with_max_payload(max_payload_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_payload_size: max_payload_size.min(MAX_PAYLOAD),
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame<P>(&mut self, port: &mut P, frame: &Frame) -> Result<usize>
    where
        P: SerialPort + ?Sized,
    {
        self.send(port, frame.payload.as_ref())
    }

    /// Encode and send a payload, returning the number of bytes on the wire.
    pub fn send<P>(&mut self, port: &mut P, payload: &[u8]) -> Result<usize>
    where
        P: SerialPort + ?Sized,
    {
        if payload.len() > self.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_payload_size,
            });
        }

        self.buf.clear();
        let total = encode_frame(payload, &mut self.buf)?;
        debug!(len = payload.len(), frame = ?self.buf.as_ref(), "sending frame");

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match port.write(&self.buf[offset..])? {
                0 => return Err(FrameError::ConnectionClosed),
                n => offset += n,
            }
        }

        port.flush()?;
        Ok(total)
    }

    /// Update maximum payload size for subsequent frame encoding.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.max_payload_size = max_payload_size.min(MAX_PAYLOAD);
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    /// Wire size a payload of `len` bytes will occupy.
    pub fn wire_size(&self, len: usize) -> usize {
        frame_size(len)
    }
}

impl Default for FrameWriter {
    fn default() -> Self {
        Self::new()
    }
}
