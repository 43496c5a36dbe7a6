//! Big-endian field codec for command payloads.
//!
//! [`PayloadBuilder`] appends into an owned, fixed-capacity buffer and
//! [`PayloadCursor`] reads back out of a borrowed payload. Both refuse to run
//! past their bounds instead of corrupting memory or panicking.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Largest payload a short frame can carry.
pub const MAX_SHORT_PAYLOAD: usize = u8::MAX as usize;

/// Fixed-capacity payload writer with an explicit cursor.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    buf: BytesMut,
    capacity: usize,
}

impl PayloadBuilder {
    /// Builder sized for a short frame.
    pub fn new() -> Self {
        Self::with_capacity(MAX_SHORT_PAYLOAD)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Bytes written so far (the cursor position).
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.buf.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Reset the cursor without releasing the allocation.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    fn reserve(&mut self, needed: usize) -> Result<()> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(FrameError::BufferFull { needed, remaining });
        }
        Ok(())
    }

    pub fn append_u8(&mut self, value: u8) -> Result<()> {
        self.reserve(1)?;
        self.buf.put_u8(value);
        Ok(())
    }

    /// Booleans travel as a single `0`/`1` byte.
    pub fn append_bool(&mut self, value: bool) -> Result<()> {
        self.append_u8(u8::from(value))
    }

    pub fn append_i16(&mut self, value: i16) -> Result<()> {
        self.reserve(2)?;
        self.buf.put_i16(value);
        Ok(())
    }

    pub fn append_i32(&mut self, value: i32) -> Result<()> {
        self.reserve(4)?;
        self.buf.put_i32(value);
        Ok(())
    }

    pub fn append_u32(&mut self, value: u32) -> Result<()> {
        self.reserve(4)?;
        self.buf.put_u32(value);
        Ok(())
    }

    /// Append `value * scale` truncated toward zero, saturating at the i32 range.
    pub fn append_scaled_i32(&mut self, value: f32, scale: f32) -> Result<()> {
        self.append_i32((value * scale) as i32)
    }

    pub fn append_slice(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(bytes.len())?;
        self.buf.put_slice(bytes);
        Ok(())
    }
}

impl Default for PayloadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<[u8]> for PayloadBuilder {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

/// Sequential big-endian reader over a payload.
#[derive(Debug, Clone)]
pub struct PayloadCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Unread tail of the payload.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8]> {
        let available = self.remaining();
        if needed > available {
            return Err(FrameError::Truncated { needed, available });
        }
        let field = &self.buf[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(field)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?.get_u8())
    }

    pub fn get_bool(&mut self) -> Result<bool> {
        Ok(self.get_u8()? != 0)
    }

    pub fn get_i16(&mut self) -> Result<i16> {
        Ok(self.take(2)?.get_i16())
    }

    pub fn get_i32(&mut self) -> Result<i32> {
        Ok(self.take(4)?.get_i32())
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        Ok(self.take(4)?.get_u32())
    }

    /// Two-byte signed fixed-point value: `raw / scale`.
    pub fn get_float16(&mut self, scale: f32) -> Result<f32> {
        Ok(f32::from(self.get_i16()?) / scale)
    }

    /// Four-byte signed fixed-point value: `raw / scale`.
    pub fn get_float32(&mut self, scale: f32) -> Result<f32> {
        Ok(self.get_i32()? as f32 / scale)
    }
}
