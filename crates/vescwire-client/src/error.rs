use std::time::Duration;

use crate::command::CommandId;

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Frame-level or transport-level error.
    #[error("frame error: {0}")]
    Frame(#[from] vescwire_frame::FrameError),

    /// No complete response before the deadline.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The response frame failed its CRC check.
    #[error("response checksum mismatch: expected {expected:#06x}, computed {computed:#06x}")]
    ChecksumMismatch { expected: u16, computed: u16 },

    /// The controller answered with a long-form frame.
    #[error("unsupported long-form response ({declared_len} bytes)")]
    UnsupportedLongFrame { declared_len: u16 },

    /// The payload's first byte is not a known command id.
    #[error("unknown command id {0}")]
    UnknownCommand(u8),

    /// A known command arrived where a different response was expected.
    #[error("unexpected {0:?} response")]
    UnexpectedResponse(CommandId),

    /// A frame carried no command id.
    #[error("empty payload")]
    EmptyPayload,
}

impl ClientError {
    /// True when repeating the request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Timeout(_)
                | ClientError::ChecksumMismatch { .. }
                | ClientError::UnsupportedLongFrame { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
