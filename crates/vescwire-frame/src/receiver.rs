use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, trace, warn};
use vescwire_transport::{Clock, SerialPort};

use crate::assembler::{AssemblerEvent, DropReason, FrameAssembler, DEFAULT_BUFFER_CAPACITY};
use crate::codec::{unpack_frame, Frame, SHORT_HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Default time to wait for a response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

/// Configuration for the frame receiver.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Receive buffer capacity in bytes. Default: 256.
    pub buffer_capacity: usize,
    /// Deadline applied to each blocking receive and each `arm`.
    pub timeout: Duration,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// How a receive attempt ended.
///
/// Timeouts and checksum failures are ordinary outcomes; only transport
/// failures are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// A frame arrived and its CRC matched.
    Frame(Frame),
    /// Incremental receive only: no complete frame yet.
    Pending,
    /// The deadline passed without a complete frame. `dropped` is the last
    /// malformed frame discarded during the attempt, if any.
    TimedOut { dropped: Option<DropReason> },
    /// A complete frame arrived with a bad CRC.
    ChecksumFailed { expected: u16, computed: u16 },
    /// A long-form frame arrived; it cannot be decoded.
    UnsupportedLongFrame { declared_len: u16 },
}

impl ReceiveOutcome {
    /// True for every outcome except `Pending`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReceiveOutcome::Pending)
    }
}

/// Receives frames from a [`SerialPort`].
///
/// Two drivers share one [`FrameAssembler`]:
/// - [`receive_blocking`](Self::receive_blocking) busy-polls until a frame
///   completes or the deadline passes.
/// - [`arm`](Self::arm) + [`poll`](Self::poll) let a caller with its own
///   scheduling loop drain available bytes without ever blocking.
#[derive(Debug)]
pub struct FrameReceiver {
    assembler: FrameAssembler,
    config: ReceiverConfig,
    deadline: Option<u64>,
    expected_len_hint: usize,
    last_drop: Option<DropReason>,
}

impl FrameReceiver {
    /// Create a new receiver with default configuration.
    pub fn new() -> Self {
        Self::with_config(ReceiverConfig::default())
    }

    /// Create a new receiver with explicit configuration.
    pub fn with_config(config: ReceiverConfig) -> Self {
        Self {
            assembler: FrameAssembler::with_capacity(config.buffer_capacity),
            config,
            deadline: None,
            expected_len_hint: 0,
            last_drop: None,
        }
    }

    /// Current receiver configuration.
    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// Update the deadline used by subsequent receives.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
    }

    /// True between [`arm`](Self::arm) and a terminal [`poll`](Self::poll).
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Payload length announced by the last `arm`.
    pub fn expected_len_hint(&self) -> usize {
        self.expected_len_hint
    }

    /// Bytes of the frame currently being assembled.
    pub fn bytes_received(&self) -> usize {
        self.assembler.received()
    }

    /// Stop an incremental receive; the partial frame is discarded.
    pub fn disarm(&mut self) {
        self.deadline = None;
        self.assembler.reset();
    }

    /// Wait for one frame, busy-polling `port` until the configured timeout.
    pub fn receive_blocking<P, C>(&mut self, port: &mut P, clock: &C) -> Result<ReceiveOutcome>
    where
        P: SerialPort + ?Sized,
        C: Clock + ?Sized,
    {
        self.deadline = None;
        self.assembler.reset();
        self.last_drop = None;

        let deadline = clock.now_ms().saturating_add(timeout_ms(self.config.timeout));
        // A port that never runs dry must not outlive the deadline.
        'wait: while clock.now_ms() < deadline {
            while port.bytes_available()? > 0 {
                let Some(byte) = port.read_byte()? else {
                    break;
                };
                if let Some(outcome) = self.feed(byte)? {
                    return Ok(outcome);
                }
                if clock.now_ms() >= deadline {
                    break 'wait;
                }
            }
            std::hint::spin_loop();
        }

        debug!(
            received = self.assembler.received(),
            timeout = ?self.config.timeout,
            "receive timed out"
        );
        self.assembler.reset();
        Ok(ReceiveOutcome::TimedOut {
            dropped: self.last_drop.take(),
        })
    }

    /// Start an incremental receive. The deadline is fixed here, not per poll.
    pub fn arm<C>(&mut self, clock: &C, expected_len_hint: usize)
    where
        C: Clock + ?Sized,
    {
        self.assembler.reset();
        self.last_drop = None;
        self.expected_len_hint = expected_len_hint;
        self.deadline = Some(clock.now_ms().saturating_add(timeout_ms(self.config.timeout)));
        trace!(expected_len_hint, "receiver armed");
    }

    /// Drain whatever `port` has available right now.
    ///
    /// Returns `Pending` when not armed or when the frame is still incomplete.
    /// A terminal outcome disarms the receiver. When the deadline has passed,
    /// unread input is flushed.
    pub fn poll<P, C>(&mut self, port: &mut P, clock: &C) -> Result<ReceiveOutcome>
    where
        P: SerialPort + ?Sized,
        C: Clock + ?Sized,
    {
        let Some(deadline) = self.deadline else {
            return Ok(ReceiveOutcome::Pending);
        };

        if clock.now_ms() >= deadline {
            self.deadline = None;
            self.assembler.clear();
            let flushed = port.discard_input()?;
            debug!(
                flushed,
                expected_len_hint = self.expected_len_hint,
                "receive deadline elapsed"
            );
            return Ok(ReceiveOutcome::TimedOut {
                dropped: self.last_drop.take(),
            });
        }

        while port.bytes_available()? > 0 {
            let Some(byte) = port.read_byte()? else {
                break;
            };
            if let Some(outcome) = self.feed(byte)? {
                self.deadline = None;
                return Ok(outcome);
            }
        }
        Ok(ReceiveOutcome::Pending)
    }

    fn feed(&mut self, byte: u8) -> Result<Option<ReceiveOutcome>> {
        match self.assembler.push(byte) {
            AssemblerEvent::Pending => Ok(None),
            AssemblerEvent::Dropped(reason) => {
                warn!(?reason, "dropped malformed frame");
                self.last_drop = Some(reason);
                Ok(None)
            }
            AssemblerEvent::LongFrame { declared_len } => {
                warn!(declared_len, "long-form frame is not supported");
                Ok(Some(ReceiveOutcome::UnsupportedLongFrame { declared_len }))
            }
            AssemblerEvent::Complete(raw) => verify(raw).map(Some),
        }
    }
}

impl Default for FrameReceiver {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn verify(raw: Bytes) -> Result<ReceiveOutcome> {
    match unpack_frame(&raw) {
        Ok(payload) => {
            let len = payload.len();
            debug!(len, frame = ?raw.as_ref(), "received frame");
            let payload = raw.slice(SHORT_HEADER_SIZE..SHORT_HEADER_SIZE + len);
            Ok(ReceiveOutcome::Frame(Frame { payload }))
        }
        Err(FrameError::ChecksumMismatch { expected, computed }) => {
            warn!(expected, computed, "frame checksum mismatch");
            Ok(ReceiveOutcome::ChecksumFailed { expected, computed })
        }
        Err(err) => Err(err),
    }
}

fn timeout_ms(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
