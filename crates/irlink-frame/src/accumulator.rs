use std::time::{Duration, Instant};

use irlink_transport::{TransportAdapter, TransportError};
use tracing::{debug, trace, warn};

use crate::buffer::{ByteBuffer, MAX_LEN};
use crate::error::{FrameError, Result};

/// Default inter-packet silence: a gap this long ends the current packet.
pub const DEFAULT_SILENCE_TIMEOUT: Duration = Duration::from_millis(20);

/// Default time a single transport read may wait for bytes.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Configuration for silence-delimited framing.
///
/// The silence timeout has to sit below the shortest gap between two real
/// packets and above the longest gap the transport introduces inside one.
#[derive(Debug, Clone)]
pub struct FramingConfig {
    /// Silence after the last byte that completes a packet. Default: 20 ms.
    pub silence_timeout: Duration,
    /// Upper bound for one transport read. Default: 1 ms.
    pub read_timeout: Duration,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            silence_timeout: DEFAULT_SILENCE_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// What one framing step produced.
#[derive(Debug)]
pub enum FrameEvent {
    /// Nothing read and nothing buffered.
    Idle,
    /// Bytes are buffered but the packet is not finished yet.
    Pending { len: usize },
    /// New bytes were appended; `len` is the buffered total.
    Buffered { len: usize },
    /// The read did not fit and was dropped; `held` bytes remain buffered.
    Overflow { dropped: usize, held: usize },
    /// Silence elapsed; this is one whole packet.
    Packet(ByteBuffer),
    /// The transport call failed. Nothing was buffered this step.
    Fault(TransportError),
}

/// Reassembles packets from arbitrarily fragmented reads.
///
/// There is no length prefix or terminator on the wire: a packet is whatever
/// arrives before the line goes quiet for [`FramingConfig::silence_timeout`].
#[derive(Debug)]
pub struct FrameAccumulator {
    buf: ByteBuffer,
    // Some only while buf is non-empty.
    last_activity: Option<Instant>,
    config: FramingConfig,
}

impl FrameAccumulator {
    /// Create an accumulator with default configuration.
    pub fn new() -> Self {
        Self::with_config(FramingConfig::default())
    }

    /// Create an accumulator with explicit configuration.
    pub fn with_config(config: FramingConfig) -> Self {
        Self {
            buf: ByteBuffer::new(),
            last_activity: None,
            config,
        }
    }

    /// Append freshly read bytes observed at `now`.
    ///
    /// On overflow the buffered bytes are kept as they were and `data` is
    /// dropped. The activity timestamp still moves to `now`: the line was
    /// not silent.
    pub fn push(&mut self, data: &[u8], now: Instant) -> Result<usize> {
        if data.is_empty() {
            return Ok(self.buf.len());
        }
        let appended = self.buf.extend_from_slice(data);
        if !self.buf.is_empty() {
            self.last_activity = Some(now);
        }
        appended.map(|()| self.buf.len())
    }

    /// Hand out the buffered packet if the line has been silent for longer
    /// than the configured timeout.
    pub fn flush_if_silent(&mut self, now: Instant) -> Option<ByteBuffer> {
        let last = self.last_activity?;
        if now.saturating_duration_since(last) <= self.config.silence_timeout {
            return None;
        }
        self.last_activity = None;
        let packet = std::mem::take(&mut self.buf);
        Some(packet)
    }

    /// Run one framing step against `transport`.
    pub fn poll<T: TransportAdapter + ?Sized>(
        &mut self,
        transport: &mut T,
        now: Instant,
    ) -> FrameEvent {
        let data = match transport.available() {
            Ok(true) => match transport.read_bytes(MAX_LEN, self.config.read_timeout) {
                Ok(data) => data,
                Err(TransportError::Oversized { max }) => return self.oversized_read(max, now),
                Err(err) => return FrameEvent::Fault(err),
            },
            Ok(false) => bytes::Bytes::new(),
            Err(err) => return FrameEvent::Fault(err),
        };

        if data.is_empty() {
            return match self.flush_if_silent(now) {
                Some(packet) => {
                    debug!(len = packet.len(), "packet complete");
                    FrameEvent::Packet(packet)
                }
                None if self.buf.is_empty() => FrameEvent::Idle,
                None => FrameEvent::Pending {
                    len: self.buf.len(),
                },
            };
        }

        match self.push(&data, now) {
            Ok(len) => {
                trace!(read = data.len(), len, "fragment buffered");
                FrameEvent::Buffered { len }
            }
            Err(FrameError::Overflow { held, incoming, max }) => {
                warn!(held, incoming, max, "inbound packet overflow, dropping read");
                FrameEvent::Overflow {
                    dropped: incoming,
                    held,
                }
            }
        }
    }

    // The transport discarded a message too long to buffer. Data did arrive,
    // so the current packet stays open.
    fn oversized_read(&mut self, max: usize, now: Instant) -> FrameEvent {
        let held = self.buf.len();
        warn!(held, max, "oversized inbound message dropped");
        if held > 0 {
            self.last_activity = Some(now);
        }
        FrameEvent::Overflow {
            dropped: max + 1,
            held,
        }
    }

    /// Drop anything buffered.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.last_activity = None;
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The bytes buffered so far.
    pub fn pending(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// Current framing configuration.
    pub fn config(&self) -> &FramingConfig {
        &self.config
    }
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
