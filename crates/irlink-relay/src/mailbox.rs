use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use irlink_frame::ByteBuffer;
use tracing::trace;

use crate::stats::RelayStats;

/// Which way a mailbox carries data.
pub trait Direction: Send + Sync + 'static {
    /// Name used in log fields.
    const NAME: &'static str;
}

/// Emulation thread → transport.
#[derive(Debug)]
pub struct Outbound;

/// Transport → emulation thread.
#[derive(Debug)]
pub struct Inbound;

impl Direction for Outbound {
    const NAME: &'static str = "outbound";
}

impl Direction for Inbound {
    const NAME: &'static str = "inbound";
}

/// A single-slot, lock-protected handoff between two threads.
///
/// Holds at most one buffer. A deposit into an occupied slot replaces the
/// unread buffer (last writer wins); a withdraw empties the slot, so each
/// deposit is delivered at most once.
pub struct Mailbox<D: Direction> {
    slot: Mutex<ByteBuffer>,
    _direction: PhantomData<fn() -> D>,
}

impl<D: Direction> Mailbox<D> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(ByteBuffer::new()),
            _direction: PhantomData,
        }
    }

    // The slot holds plain bytes, so a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, ByteBuffer> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move `src` into the slot and clear `src`.
    ///
    /// Returns `true` when an unread buffer was overwritten. An empty `src`
    /// leaves the slot alone.
    pub fn deposit(&self, src: &mut ByteBuffer) -> bool {
        if src.is_empty() {
            return false;
        }
        let mut slot = self.lock();
        let overwritten = !slot.is_empty();
        std::mem::swap(&mut *slot, src);
        src.clear();
        trace!(direction = D::NAME, len = slot.len(), overwritten, "deposit");
        overwritten
    }

    /// Move the slot's buffer into `dst`, leaving the slot empty.
    ///
    /// Returns the withdrawn length; `dst` is cleared and 0 returned when
    /// nothing is pending.
    pub fn withdraw(&self, dst: &mut ByteBuffer) -> usize {
        dst.clear();
        let mut slot = self.lock();
        if slot.is_empty() {
            return 0;
        }
        std::mem::swap(&mut *slot, dst);
        trace!(direction = D::NAME, len = dst.len(), "withdraw");
        dst.len()
    }

    /// Whether nothing is waiting in the slot.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Discard any pending buffer.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl<D: Direction> Default for Mailbox<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Direction> std::fmt::Debug for Mailbox<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("direction", &D::NAME)
            .field("pending", &self.lock().len())
            .finish()
    }
}

/// Whether the transport has a live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

/// State shared between the emulation thread and the I/O thread.
///
/// The two mailboxes never share a lock, so the directions proceed
/// independently.
#[derive(Debug, Default)]
pub struct Relay {
    outbound: Mailbox<Outbound>,
    inbound: Mailbox<Inbound>,
    connected: AtomicBool,
    stats: RelayStats,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outbound(&self) -> &Mailbox<Outbound> {
        &self.outbound
    }

    pub fn inbound(&self) -> &Mailbox<Inbound> {
        &self.inbound
    }

    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    pub fn connection_state(&self) -> ConnectionState {
        if self.connected.load(Ordering::Acquire) {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    pub(crate) fn set_connection_state(&self, state: ConnectionState) {
        self.connected.store(state.is_connected(), Ordering::Release);
    }

    /// Drop whatever is pending in either direction.
    pub fn clear(&self) {
        self.outbound.clear();
        self.inbound.clear();
    }
}
