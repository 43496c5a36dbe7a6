//! Outbound command encoding.

use bytes::Bytes;
use vescwire_frame::{PayloadBuilder, Result};

use crate::aux_input::AuxInput;
use crate::command::{CommandId, Target};
use crate::telemetry::mask;

/// Scale applied to currents (A) before truncation.
pub const CURRENT_SCALE: f32 = 1000.0;
/// Scale applied to duty cycle (fraction) before truncation.
pub const DUTY_SCALE: f32 = 100000.0;

/// A command the client can send.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Request {
    FwVersion,
    /// Telemetry query. [`mask::ALL`] selects the full `GetValues` form.
    GetValues { mask: u32 },
    /// Motor current in amperes.
    SetCurrent(f32),
    /// Brake current in amperes.
    SetBrakeCurrent(f32),
    /// Electrical RPM.
    SetRpm(f32),
    /// Position in degrees.
    SetPos(f32),
    /// Duty cycle, -1.0..=1.0.
    SetDuty(f32),
    Keepalive,
    SetAuxInput(AuxInput),
}

impl Request {
    pub fn command(&self) -> CommandId {
        match self {
            Request::FwVersion => CommandId::FwVersion,
            Request::GetValues { mask: mask::ALL } => CommandId::GetValues,
            Request::GetValues { .. } => CommandId::GetValuesSelective,
            Request::SetCurrent(_) => CommandId::SetCurrent,
            Request::SetBrakeCurrent(_) => CommandId::SetCurrentBrake,
            Request::SetRpm(_) => CommandId::SetRpm,
            Request::SetPos(_) => CommandId::SetPos,
            Request::SetDuty(_) => CommandId::SetDuty,
            Request::Keepalive => CommandId::Alive,
            Request::SetAuxInput(_) => CommandId::SetChuckData,
        }
    }

    /// Append the payload for `target`: optional CAN prefix, command id, arguments.
    pub fn encode(&self, target: Target, out: &mut PayloadBuilder) -> Result<()> {
        if let Some(id) = target.can_id() {
            out.append_u8(CommandId::ForwardCan.into())?;
            out.append_u8(id)?;
        }
        let command = self.command();
        out.append_u8(command.into())?;

        match *self {
            Request::FwVersion | Request::Keepalive => Ok(()),
            Request::GetValues { mask } => {
                if command == CommandId::GetValuesSelective {
                    out.append_u32(mask)?;
                }
                Ok(())
            }
            Request::SetCurrent(amps) | Request::SetBrakeCurrent(amps) => {
                out.append_scaled_i32(amps, CURRENT_SCALE)
            }
            Request::SetRpm(value) | Request::SetPos(value) => out.append_i32(value as i32),
            Request::SetDuty(duty) => out.append_scaled_i32(duty, DUTY_SCALE),
            Request::SetAuxInput(input) => input.write(out),
        }
    }

    /// Encode into a fresh short-frame-sized payload.
    pub fn to_payload(&self, target: Target) -> Result<Bytes> {
        let mut out = PayloadBuilder::new();
        self.encode(target, &mut out)?;
        Ok(out.freeze())
    }
}
