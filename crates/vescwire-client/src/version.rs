use std::fmt;

use serde::Serialize;
use vescwire_frame::{PayloadBuilder, PayloadCursor, Result};

/// Controller firmware version, as reported by `FwVersion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl FirmwareVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Read major and minor; anything after them (hardware name, uuid) is ignored.
    pub fn read(cursor: &mut PayloadCursor<'_>) -> Result<Self> {
        let major = cursor.get_u8()?;
        let minor = cursor.get_u8()?;
        Ok(Self { major, minor })
    }

    pub fn write(&self, out: &mut PayloadBuilder) -> Result<()> {
        out.append_u8(self.major)?;
        out.append_u8(self.minor)
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)
    }
}
