use std::io::{ErrorKind, Read, Write};

use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::SerialPort;

const READ_CHUNK_SIZE: usize = 256;

/// [`SerialPort`] over any `Read + Write` stream.
///
/// The stream should be non-blocking or carry a short read timeout; a
/// `WouldBlock` or `TimedOut` read is reported as zero available bytes.
/// Writes and flushes retry on `WouldBlock` so a frame is never cut short.
pub struct StreamPort<T> {
    inner: T,
    pending: BytesMut,
}

impl<T: Read + Write> StreamPort<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            pending: BytesMut::with_capacity(READ_CHUNK_SIZE),
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the port and return the inner stream. Buffered input is lost.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => {
                    trace!(bytes = n, "stream read");
                    self.pending.extend_from_slice(&chunk[..n]);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    return Ok(())
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl<T: Read + Write> SerialPort for StreamPort<T> {
    fn bytes_available(&mut self) -> Result<usize> {
        if self.pending.is_empty() {
            self.fill()?;
        }
        Ok(self.pending.len())
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.pending.get_u8()))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        loop {
            match self.inner.write(bytes) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl<T> std::fmt::Debug for StreamPort<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamPort")
            .field("pending", &self.pending.len())
            .finish()
    }
}
