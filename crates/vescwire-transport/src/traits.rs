use std::time::Instant;

use crate::error::Result;

/// A half-duplex byte link to the motor controller.
///
/// Implementations must answer [`bytes_available`](SerialPort::bytes_available)
/// promptly: the incremental receiver calls it once per poll and relies on a
/// zero answer instead of a blocking wait.
pub trait SerialPort {
    /// Number of bytes that can be read right now without blocking.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read one byte, or `None` when nothing is buffered.
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Write bytes, returning how many were accepted.
    fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Flush buffered output.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Discard everything currently readable.
    fn discard_input(&mut self) -> Result<usize> {
        let mut dropped = 0usize;
        while self.bytes_available()? > 0 {
            if self.read_byte()?.is_none() {
                break;
            }
            dropped += 1;
        }
        Ok(dropped)
    }
}

impl<P: SerialPort + ?Sized> SerialPort for &mut P {
    fn bytes_available(&mut self) -> Result<usize> {
        (**self).bytes_available()
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        (**self).write(bytes)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn discard_input(&mut self) -> Result<usize> {
        (**self).discard_input()
    }
}

/// Monotonic millisecond clock.
///
/// Must not go backwards for the duration of a receive operation.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Wall-clock backed by [`Instant`], counting from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}
