//! In-process controller simulator.
//!
//! Attach a [`SimulatedController`] to a [`MemoryPort`] and every frame the
//! client writes is parsed, applied to the simulated state, and answered
//! the way firmware would answer it.

use std::sync::{Arc, Mutex, PoisonError};

use bytes::BytesMut;
use tracing::{debug, warn};
use vescwire_client::{
    mask, AuxInput, CommandId, FirmwareVersion, Request, Target, TelemetrySnapshot,
    CURRENT_SCALE, DUTY_SCALE,
};
use vescwire_frame::{
    encode_frame, unpack_frame, AssemblerEvent, FrameAssembler, PayloadBuilder, PayloadCursor,
    Result,
};
use vescwire_transport::MemoryPort;

/// A command as the simulated controller decoded it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReceivedCommand {
    pub target: Target,
    pub request: Request,
}

/// Firmware stand-in.
#[derive(Debug)]
pub struct SimulatedController {
    /// State reported by telemetry queries; setpoints write into it.
    pub telemetry: TelemetrySnapshot,
    pub version: FirmwareVersion,
    /// When set, queries are decoded but never answered.
    pub silent: bool,
    assembler: FrameAssembler,
    received: Vec<ReceivedCommand>,
}

impl Default for SimulatedController {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedController {
    pub fn new() -> Self {
        Self::with_telemetry(TelemetrySnapshot::default())
    }

    pub fn with_telemetry(telemetry: TelemetrySnapshot) -> Self {
        Self {
            telemetry,
            version: FirmwareVersion::new(6, 2),
            silent: false,
            assembler: FrameAssembler::new(),
            received: Vec::new(),
        }
    }

    /// Every command decoded so far, oldest first.
    pub fn received(&self) -> &[ReceivedCommand] {
        &self.received
    }

    pub fn keepalives(&self) -> usize {
        self.received
            .iter()
            .filter(|cmd| cmd.request == Request::Keepalive)
            .count()
    }

    /// Install this controller as `port`'s responder. The returned handle
    /// shares state with the installed copy.
    pub fn attach(self, port: &MemoryPort) -> Arc<Mutex<SimulatedController>> {
        let shared = Arc::new(Mutex::new(self));
        let device = Arc::clone(&shared);
        port.set_responder(move |bytes| {
            let mut device = device.lock().unwrap_or_else(PoisonError::into_inner);
            let reply = device.receive(bytes);
            (!reply.is_empty()).then_some(reply)
        });
        shared
    }

    /// Feed raw wire bytes; returns the framed replies they triggered.
    pub fn receive(&mut self, bytes: &[u8]) -> Vec<u8> {
        let mut out = BytesMut::new();
        for &byte in bytes {
            let AssemblerEvent::Complete(raw) = self.assembler.push(byte) else {
                continue;
            };
            let payload = match unpack_frame(&raw) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(%err, "simulator rejected frame");
                    continue;
                }
            };
            match self.handle(payload) {
                Ok(Some(reply)) => {
                    if let Err(err) = encode_frame(&reply, &mut out) {
                        warn!(%err, "simulator reply not encodable");
                    }
                }
                Ok(None) => {}
                Err(err) => warn!(%err, "simulator could not decode command"),
            }
        }
        out.to_vec()
    }

    /// Apply one command payload; returns the reply payload, if any.
    pub fn handle(&mut self, payload: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut cursor = PayloadCursor::new(payload);
        let mut id = cursor.get_u8()?;
        let mut target = Target::Local;
        if id == u8::from(CommandId::ForwardCan) {
            target = Target::from(cursor.get_u8()?);
            id = cursor.get_u8()?;
        }
        let Ok(command) = CommandId::try_from(id) else {
            warn!(id, "simulator ignoring unknown command");
            return Ok(None);
        };

        let mut reply = PayloadBuilder::new();
        reply.append_u8(id)?;
        let request = match command {
            CommandId::FwVersion => {
                self.version.write(&mut reply)?;
                Request::FwVersion
            }
            CommandId::GetValues => {
                self.telemetry.write_fields(mask::ALL, &mut reply)?;
                Request::GetValues { mask: mask::ALL }
            }
            CommandId::GetValuesSelective => {
                let fields = cursor.get_u32()?;
                reply.append_u32(fields)?;
                self.telemetry.write_fields(fields, &mut reply)?;
                Request::GetValues { mask: fields }
            }
            CommandId::SetCurrent => {
                let amps = cursor.get_float32(CURRENT_SCALE)?;
                self.telemetry.avg_motor_current = amps;
                Request::SetCurrent(amps)
            }
            CommandId::SetCurrentBrake => {
                let amps = cursor.get_float32(CURRENT_SCALE)?;
                self.telemetry.avg_motor_current = -amps.abs();
                Request::SetBrakeCurrent(amps)
            }
            CommandId::SetRpm => {
                let rpm = cursor.get_i32()? as f32;
                self.telemetry.rpm = rpm;
                Request::SetRpm(rpm)
            }
            CommandId::SetPos => {
                let pos = cursor.get_i32()? as f32;
                self.telemetry.pid_pos = pos;
                Request::SetPos(pos)
            }
            CommandId::SetDuty => {
                let duty = cursor.get_float32(DUTY_SCALE)?;
                self.telemetry.duty_cycle = duty;
                Request::SetDuty(duty)
            }
            CommandId::Alive => Request::Keepalive,
            CommandId::SetChuckData => {
                let input = AuxInput {
                    x: cursor.get_u8()?,
                    y: cursor.get_u8()?,
                    lower_button: cursor.get_bool()?,
                    upper_button: cursor.get_bool()?,
                };
                Request::SetAuxInput(input)
            }
            CommandId::ForwardCan => {
                warn!("simulator ignoring nested CAN forward");
                return Ok(None);
            }
        };

        debug!(?target, ?request, "simulator applied command");
        self.received.push(ReceivedCommand { target, request });

        if command.has_response() && !self.silent {
            Ok(Some(reply.as_slice().to_vec()))
        } else {
            Ok(None)
        }
    }
}
