//! UART protocol codec and command client for VESC motor controllers.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte-level serial port and clock abstractions
//! - [`frame`]: CRC-checked framing, frame assembly, blocking and incremental receive
//! - [`client`]: typed commands, telemetry decoding, the request/response dispatcher
//! - [`sim`]: an in-process controller for demos and tests
//! - `logging`: `tracing-subscriber` setup (behind the `logging` feature)

/// Re-export transport types.
pub mod transport {
    pub use vescwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use vescwire_frame::*;
}

/// Re-export client types.
pub mod client {
    pub use vescwire_client::*;
}

#[cfg(feature = "logging")]
pub mod logging;
pub mod sim;

pub use vescwire_client::{ClientConfig, ClientError, Target, VescClient};
