//! Serial transport and clock capabilities.
//!
//! The protocol engine never opens ports or configures baud rates. It consumes
//! two small capabilities defined here:
//! - [`SerialPort`]: byte availability, single-byte reads and bulk writes
//! - [`Clock`]: monotonic milliseconds used for receive deadlines
//!
//! [`StreamPort`] adapts any `Read + Write` stream (a serial device handle, a
//! socket, a pty) and [`MemoryPort`] / [`ManualClock`] provide an in-memory
//! link for simulation and tests.

pub mod error;
pub mod memory;
pub mod stream;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::{ManualClock, MemoryPort};
pub use stream::StreamPort;
pub use traits::{Clock, SerialPort, SystemClock};
