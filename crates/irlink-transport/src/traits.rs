use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// A raw byte channel to the world outside the emulator.
///
/// Adapters are selected and configured at construction (port name, socket
/// addresses) and opened with [`connect`](TransportAdapter::connect). All
/// calls are made from a single I/O thread, so implementations need `Send`
/// but not `Sync`.
pub trait TransportAdapter: Send {
    /// Open the configured channel.
    fn connect(&mut self) -> Result<()>;

    /// Whether the channel is currently open.
    fn is_connected(&self) -> bool;

    /// Write a whole buffer. Returns the number of bytes accepted.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize>;

    /// Whether a read would return data right now.
    fn available(&mut self) -> Result<bool>;

    /// Read at most `max_len` bytes, waiting no longer than `timeout`.
    ///
    /// An empty result means nothing arrived in time.
    fn read_bytes(&mut self, max_len: usize, timeout: Duration) -> Result<Bytes>;

    /// Close the channel. Calling this on a closed adapter is a no-op.
    fn disconnect(&mut self);

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str;
}

impl<T: TransportAdapter + ?Sized> TransportAdapter for Box<T> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write_bytes(data)
    }

    fn available(&mut self) -> Result<bool> {
        (**self).available()
    }

    fn read_bytes(&mut self, max_len: usize, timeout: Duration) -> Result<Bytes> {
        (**self).read_bytes(max_len, timeout)
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }

    fn transport_name(&self) -> &'static str {
        (**self).transport_name()
    }
}
