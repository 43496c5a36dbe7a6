use vescwire_transport::TransportError;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The first byte is neither the short (0x02) nor the long (0x03) start marker.
    #[error("invalid start marker 0x{0:02X}")]
    InvalidStartMarker(u8),

    /// A long-form frame (start marker 0x03) was recognized; decoding it is not supported.
    #[error("long-form frame with {declared_len} byte payload is not supported")]
    UnsupportedLongFrame { declared_len: u16 },

    /// The CRC carried by the frame does not match the payload.
    #[error("checksum mismatch (frame 0x{expected:04X}, computed 0x{computed:04X})")]
    ChecksumMismatch { expected: u16, computed: u16 },

    /// Not enough bytes to read the requested field or frame.
    #[error("truncated input (needed {needed} bytes, {available} available)")]
    Truncated { needed: usize, available: usize },

    /// The payload exceeds what the frame header can describe.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A fixed-capacity buffer has no room for the write.
    #[error("buffer full (needed {needed} bytes, {remaining} remaining)")]
    BufferFull { needed: usize, remaining: usize },

    /// The transport accepted zero bytes of a frame.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,

    /// The serial transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// An I/O error surfaced through the stream codec.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
