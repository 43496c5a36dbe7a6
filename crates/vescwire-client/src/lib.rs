//! Typed command dispatch for VESC motor controllers.
//!
//! [`VescClient`] encodes setpoints and queries into frames, sends them over
//! a [`SerialPort`](vescwire_transport::SerialPort), and decodes responses
//! into a two-generation [`TelemetryHistory`] and the last seen
//! [`FirmwareVersion`]. Responses can be awaited with a deadline or driven
//! from the caller's own loop with [`VescClient::request_values`] and
//! [`VescClient::poll`].

pub mod aux_input;
pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod request;
pub mod telemetry;
pub mod version;

pub use aux_input::{AuxInput, AUX_CENTER};
pub use client::{Response, VescClient, TELEMETRY_LEN_HINT};
pub use command::{CommandId, Target};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use request::{Request, CURRENT_SCALE, DUTY_SCALE};
pub use telemetry::{
    encoded_len, mask, Encoding, FaultCode, Field, FieldSpec, TelemetryHistory,
    TelemetrySnapshot, TELEMETRY_FIELDS,
};
pub use version::FirmwareVersion;
