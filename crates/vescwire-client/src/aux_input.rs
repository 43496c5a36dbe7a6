use serde::{Deserialize, Serialize};
use vescwire_frame::{PayloadBuilder, Result};

/// Stick position reported when nothing is pushed.
pub const AUX_CENTER: u8 = 127;

/// Auxiliary ("nunchuck") input forwarded to the controller's app layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct AuxInput {
    pub x: u8,
    pub y: u8,
    pub lower_button: bool,
    pub upper_button: bool,
}

impl Default for AuxInput {
    fn default() -> Self {
        Self {
            x: AUX_CENTER,
            y: AUX_CENTER,
            lower_button: false,
            upper_button: false,
        }
    }
}

impl AuxInput {
    /// Append the command body: axes, buttons, then six reserved
    /// accelerometer bytes sent as zero.
    pub fn write(&self, out: &mut PayloadBuilder) -> Result<()> {
        out.append_u8(self.x)?;
        out.append_u8(self.y)?;
        out.append_bool(self.lower_button)?;
        out.append_bool(self.upper_button)?;
        out.append_slice(&[0; 6])
    }
}
