use tracing::{debug, info};
use vescwire_frame::{FrameReceiver, FrameWriter, PayloadBuilder, PayloadCursor, ReceiveOutcome};
use vescwire_transport::{Clock, SerialPort, SystemClock};

use crate::aux_input::AuxInput;
use crate::command::{CommandId, Target};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::request::Request;
use crate::telemetry::{mask, TelemetryHistory, TelemetrySnapshot};
use crate::version::FirmwareVersion;

/// Payload length announced when arming for a telemetry response.
pub const TELEMETRY_LEN_HINT: usize = 55;

/// What a decoded response updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    FirmwareVersion(FirmwareVersion),
    /// The latest snapshot was replaced; `mask` names the fields that changed.
    Values { mask: u32 },
}

/// Command dispatcher for one controller link.
///
/// Owns the port, the receive state, and the last known controller state.
/// Requests never overlap: each blocking call or [`request_values`] starts a
/// fresh exchange and abandons any partial one.
///
/// [`request_values`]: VescClient::request_values
#[derive(Debug)]
pub struct VescClient<P, C = SystemClock> {
    port: P,
    clock: C,
    writer: FrameWriter,
    receiver: FrameReceiver,
    config: ClientConfig,
    telemetry: TelemetryHistory,
    fw_version: Option<FirmwareVersion>,
    aux: AuxInput,
    pending: Option<CommandId>,
}

impl<P: SerialPort> VescClient<P, SystemClock> {
    pub fn new(port: P) -> Self {
        Self::with_config(port, ClientConfig::default())
    }

    pub fn with_config(port: P, config: ClientConfig) -> Self {
        Self::with_clock(port, SystemClock::new(), config)
    }
}

impl<P: SerialPort, C: Clock> VescClient<P, C> {
    pub fn with_clock(port: P, clock: C, config: ClientConfig) -> Self {
        Self {
            port,
            clock,
            writer: FrameWriter::with_max_payload(config.max_payload_size),
            receiver: FrameReceiver::with_config(config.receiver_config()),
            config,
            telemetry: TelemetryHistory::default(),
            fw_version: None,
            aux: AuxInput::default(),
            pending: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Encode `request` for `target` and write it. Returns bytes written.
    pub fn send(&mut self, target: Target, request: &Request) -> Result<usize> {
        let mut payload = PayloadBuilder::with_capacity(self.config.max_payload_size);
        request.encode(target, &mut payload)?;
        let written = self.writer.send(&mut self.port, payload.as_slice())?;
        debug!(
            command = ?request.command(),
            ?target,
            payload_len = payload.len(),
            written,
            "sent command"
        );
        Ok(written)
    }

    pub fn set_current(&mut self, target: Target, amps: f32) -> Result<usize> {
        self.send(target, &Request::SetCurrent(amps))
    }

    pub fn set_brake_current(&mut self, target: Target, amps: f32) -> Result<usize> {
        self.send(target, &Request::SetBrakeCurrent(amps))
    }

    pub fn set_rpm(&mut self, target: Target, rpm: f32) -> Result<usize> {
        self.send(target, &Request::SetRpm(rpm))
    }

    pub fn set_pos(&mut self, target: Target, degrees: f32) -> Result<usize> {
        self.send(target, &Request::SetPos(degrees))
    }

    pub fn set_duty(&mut self, target: Target, duty: f32) -> Result<usize> {
        self.send(target, &Request::SetDuty(duty))
    }

    pub fn send_keepalive(&mut self, target: Target) -> Result<usize> {
        self.send(target, &Request::Keepalive)
    }

    /// Send the stored auxiliary input state (see [`aux_input_mut`](Self::aux_input_mut)).
    pub fn set_aux_input(&mut self, target: Target) -> Result<usize> {
        let input = self.aux;
        self.send(target, &Request::SetAuxInput(input))
    }

    /// Query the firmware version and wait for the answer.
    pub fn get_fw_version(&mut self, target: Target) -> Result<FirmwareVersion> {
        match self.transact(target, Request::FwVersion)? {
            Response::FirmwareVersion(version) => Ok(version),
            Response::Values { .. } => Err(ClientError::UnexpectedResponse(CommandId::GetValues)),
        }
    }

    /// Query every telemetry field and wait for the answer.
    pub fn get_values(&mut self, target: Target) -> Result<&TelemetrySnapshot> {
        self.get_values_masked(target, mask::ALL)
    }

    /// Query the fields selected by `fields` and wait for the answer.
    pub fn get_values_masked(
        &mut self,
        target: Target,
        fields: u32,
    ) -> Result<&TelemetrySnapshot> {
        match self.transact(target, Request::GetValues { mask: fields })? {
            Response::Values { .. } => Ok(self.telemetry.latest()),
            Response::FirmwareVersion(_) => {
                Err(ClientError::UnexpectedResponse(CommandId::FwVersion))
            }
        }
    }

    /// Send a telemetry query without waiting; drive the answer with [`poll`](Self::poll).
    pub fn request_values(&mut self, target: Target, fields: u32) -> Result<usize> {
        let request = Request::GetValues { mask: fields };
        self.pending = None;
        let written = self.send(target, &request)?;
        self.receiver.arm(&self.clock, TELEMETRY_LEN_HINT);
        self.pending = Some(request.command());
        Ok(written)
    }

    /// True while a [`request_values`](Self::request_values) answer is outstanding.
    pub fn is_awaiting_response(&self) -> bool {
        self.pending.is_some()
    }

    /// Advance an outstanding non-blocking request without blocking.
    ///
    /// `Ok(None)` means nothing to report yet, or nothing outstanding.
    pub fn poll(&mut self) -> Result<Option<Response>> {
        let Some(expected) = self.pending else {
            return Ok(None);
        };
        let outcome = self.receiver.poll(&mut self.port, &self.clock)?;
        if matches!(outcome, ReceiveOutcome::Pending) {
            return Ok(None);
        }
        self.pending = None;
        self.complete(expected, outcome).map(Some)
    }

    /// Decode one response payload and update client state.
    ///
    /// Nothing changes when decoding fails.
    pub fn process_payload(&mut self, payload: &[u8]) -> Result<Response> {
        let id = command_of(payload)?;
        let mut cursor = PayloadCursor::new(&payload[1..]);
        let response = match id {
            CommandId::FwVersion => {
                let version = FirmwareVersion::read(&mut cursor)?;
                self.fw_version = Some(version);
                Response::FirmwareVersion(version)
            }
            CommandId::GetValues => {
                self.telemetry.apply(mask::ALL, &mut cursor)?;
                Response::Values { mask: mask::ALL }
            }
            CommandId::GetValuesSelective => {
                let fields = cursor.get_u32()?;
                self.telemetry.apply(fields, &mut cursor)?;
                Response::Values { mask: fields }
            }
            CommandId::SetDuty
            | CommandId::SetCurrent
            | CommandId::SetCurrentBrake
            | CommandId::SetRpm
            | CommandId::SetPos
            | CommandId::Alive
            | CommandId::ForwardCan
            | CommandId::SetChuckData => return Err(ClientError::UnexpectedResponse(id)),
        };
        debug!(?id, len = payload.len(), trailing = cursor.remaining(), "decoded response");
        Ok(response)
    }

    pub fn values(&self) -> &TelemetrySnapshot {
        self.telemetry.latest()
    }

    pub fn previous_values(&self) -> &TelemetrySnapshot {
        self.telemetry.previous()
    }

    pub fn fw_version(&self) -> Option<FirmwareVersion> {
        self.fw_version
    }

    pub fn aux_input(&self) -> &AuxInput {
        &self.aux
    }

    pub fn aux_input_mut(&mut self) -> &mut AuxInput {
        &mut self.aux
    }

    /// Emit the latest snapshot as one structured `info` event.
    pub fn log_values(&self) {
        let v = self.telemetry.latest();
        info!(
            temp_mosfet = v.temp_mosfet,
            temp_motor = v.temp_motor,
            avg_motor_current = v.avg_motor_current,
            avg_input_current = v.avg_input_current,
            avg_id = v.avg_id,
            avg_iq = v.avg_iq,
            duty_cycle = v.duty_cycle,
            rpm = v.rpm,
            input_voltage = v.input_voltage,
            amp_hours = v.amp_hours,
            amp_hours_charged = v.amp_hours_charged,
            watt_hours = v.watt_hours,
            watt_hours_charged = v.watt_hours_charged,
            tachometer = v.tachometer,
            tachometer_abs = v.tachometer_abs,
            fault = ?v.fault(),
            pid_pos = v.pid_pos,
            controller_id = v.controller_id,
            "telemetry"
        );
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn into_inner(self) -> P {
        self.port
    }

    fn transact(&mut self, target: Target, request: Request) -> Result<Response> {
        self.pending = None;
        self.send(target, &request)?;
        let outcome = self.receiver.receive_blocking(&mut self.port, &self.clock)?;
        self.complete(request.command(), outcome)
    }

    fn complete(&mut self, expected: CommandId, outcome: ReceiveOutcome) -> Result<Response> {
        match outcome {
            ReceiveOutcome::Frame(frame) => {
                let id = command_of(&frame.payload)?;
                if !answers(expected, id) {
                    return Err(ClientError::UnexpectedResponse(id));
                }
                self.process_payload(&frame.payload)
            }
            ReceiveOutcome::Pending | ReceiveOutcome::TimedOut { .. } => {
                Err(ClientError::Timeout(self.config.timeout()))
            }
            ReceiveOutcome::ChecksumFailed { expected, computed } => {
                Err(ClientError::ChecksumMismatch { expected, computed })
            }
            ReceiveOutcome::UnsupportedLongFrame { declared_len } => {
                Err(ClientError::UnsupportedLongFrame { declared_len })
            }
        }
    }
}

fn command_of(payload: &[u8]) -> Result<CommandId> {
    let &first = payload.first().ok_or(ClientError::EmptyPayload)?;
    CommandId::try_from(first).map_err(|_| ClientError::UnknownCommand(first))
}

/// Telemetry queries accept either telemetry response form.
fn answers(request: CommandId, response: CommandId) -> bool {
    match request {
        CommandId::GetValues | CommandId::GetValuesSelective => matches!(
            response,
            CommandId::GetValues | CommandId::GetValuesSelective
        ),
        other => other == response,
    }
}
