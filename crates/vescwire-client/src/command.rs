//! Command catalogue.
//!
//! Ids are fixed by the controller firmware. Adding a command means adding a
//! variant here and a branch at the encode and decode sites; the compiler
//! flags every match that needs one.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Single-byte command identifiers understood by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum CommandId {
    /// Firmware version query and response.
    FwVersion = 0,
    /// Full telemetry query and response.
    GetValues = 4,
    SetDuty = 5,
    SetCurrent = 6,
    SetCurrentBrake = 7,
    SetRpm = 8,
    SetPos = 9,
    /// Keepalive; resets the controller's command timeout.
    Alive = 30,
    /// Wrapper routing the rest of the payload to a CAN peer.
    ForwardCan = 34,
    /// Auxiliary ("nunchuck") input state.
    SetChuckData = 35,
    /// Telemetry query and response restricted to a field mask.
    GetValuesSelective = 50,
}

impl CommandId {
    /// True for ids the controller answers with a payload this crate decodes.
    pub fn has_response(self) -> bool {
        matches!(
            self,
            CommandId::FwVersion | CommandId::GetValues | CommandId::GetValuesSelective
        )
    }
}

/// Which controller a command is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    /// The controller on the other end of the serial link.
    #[default]
    Local,
    /// A controller reached through the local one's CAN bus.
    Can(u8),
}

impl Target {
    /// CAN id to forward to, if any. `Can(0)` addresses the local controller.
    pub fn can_id(self) -> Option<u8> {
        match self {
            Target::Local | Target::Can(0) => None,
            Target::Can(id) => Some(id),
        }
    }
}

impl From<u8> for Target {
    fn from(id: u8) -> Self {
        match id {
            0 => Target::Local,
            id => Target::Can(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_match_firmware() {
        assert_eq!(u8::from(CommandId::FwVersion), 0);
        assert_eq!(u8::from(CommandId::GetValues), 4);
        assert_eq!(u8::from(CommandId::SetCurrent), 6);
        assert_eq!(u8::from(CommandId::Alive), 30);
        assert_eq!(u8::from(CommandId::ForwardCan), 34);
        assert_eq!(u8::from(CommandId::GetValuesSelective), 50);
    }

    #[test]
    fn unknown_id_is_rejected() {
        assert!(CommandId::try_from(1u8).is_err());
        assert!(CommandId::try_from(200u8).is_err());
        assert_eq!(CommandId::try_from(35u8).unwrap(), CommandId::SetChuckData);
    }

    #[test]
    fn only_queries_have_responses() {
        assert!(CommandId::GetValues.has_response());
        assert!(CommandId::FwVersion.has_response());
        assert!(!CommandId::SetRpm.has_response());
        assert!(!CommandId::ForwardCan.has_response());
    }

    #[test]
    fn zero_means_local() {
        assert_eq!(Target::from(0), Target::Local);
        assert_eq!(Target::from(7), Target::Can(7));
        assert_eq!(Target::Can(0).can_id(), None);
        assert_eq!(Target::Can(7).can_id(), Some(7));
        assert_eq!(Target::default().can_id(), None);
    }
}
