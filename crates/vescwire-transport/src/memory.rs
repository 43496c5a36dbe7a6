//! In-memory link for simulating a controller.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::{Clock, SerialPort};

type Responder = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>> + Send>;

#[derive(Default)]
struct Link {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    responder: Option<Responder>,
    closed: bool,
}

/// Shared in-memory [`SerialPort`].
///
/// Clones share the same link, so a test can keep one handle to inject
/// device bytes and inspect written frames while the client owns another.
#[derive(Clone, Default)]
pub struct MemoryPort {
    link: Arc<Mutex<Link>>,
}

impl MemoryPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes as if the device had sent them.
    pub fn push_rx(&self, bytes: &[u8]) {
        self.lock().rx.extend(bytes.iter().copied());
    }

    /// Bytes queued but not yet read.
    pub fn rx_len(&self) -> usize {
        self.lock().rx.len()
    }

    /// Take everything written so far.
    pub fn take_tx(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().tx)
    }

    /// Install a device simulator. Each write is passed to `responder`; any
    /// returned bytes are queued for reading.
    pub fn set_responder<F>(&self, responder: F)
    where
        F: FnMut(&[u8]) -> Option<Vec<u8>> + Send + 'static,
    {
        self.lock().responder = Some(Box::new(responder));
    }

    /// Make subsequent reads and writes fail with [`TransportError::Closed`].
    pub fn close(&self) {
        self.lock().closed = true;
    }

    fn lock(&self) -> MutexGuard<'_, Link> {
        // A poisoned link only means a test thread panicked mid-write.
        self.link.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SerialPort for MemoryPort {
    fn bytes_available(&mut self) -> Result<usize> {
        let link = self.lock();
        if link.closed {
            return Err(TransportError::Closed);
        }
        Ok(link.rx.len())
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut link = self.lock();
        if link.closed {
            return Err(TransportError::Closed);
        }
        Ok(link.rx.pop_front())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let mut link = self.lock();
        if link.closed {
            return Err(TransportError::Closed);
        }
        link.tx.extend_from_slice(bytes);
        let reply = link.responder.as_mut().and_then(|respond| respond(bytes));
        if let Some(reply) = reply {
            trace!(bytes = reply.len(), "simulated device replied");
            link.rx.extend(reply);
        }
        Ok(bytes.len())
    }
}

impl std::fmt::Debug for MemoryPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let link = self.lock();
        f.debug_struct("MemoryPort")
            .field("rx", &link.rx.len())
            .field("tx", &link.tx.len())
            .field("closed", &link.closed)
            .finish()
    }
}

/// Hand-driven [`Clock`].
///
/// With a non-zero step every reading advances the clock, which lets a
/// busy-polling receiver reach its deadline without real sleeps.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
    step: u64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock that advances `step_ms` on every [`Clock::now_ms`] call.
    pub fn with_step(step_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(0)),
            step: step_ms,
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    /// Current reading without stepping.
    pub fn peek(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.fetch_add(self.step, Ordering::SeqCst)
    }
}
