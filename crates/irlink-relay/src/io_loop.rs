use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use irlink_frame::{ByteBuffer, FrameAccumulator, FrameEvent};
use irlink_transport::{TransportAdapter, TransportError};
use tracing::{debug, info, trace, warn};

use crate::config::RelayConfig;
use crate::mailbox::{ConnectionState, Relay};

/// The I/O thread's side of the relay.
///
/// Owns the transport and the frame accumulator; touches shared state only
/// through the relay's mailboxes. No mailbox lock is held across a transport
/// call.
pub struct IoLoop<T> {
    transport: T,
    relay: Arc<Relay>,
    accumulator: FrameAccumulator,
    outgoing: ByteBuffer,
    poll_interval: Duration,
}

impl<T: TransportAdapter> IoLoop<T> {
    pub fn new(transport: T, relay: Arc<Relay>, config: &RelayConfig) -> Self {
        Self {
            transport,
            relay,
            accumulator: FrameAccumulator::with_config(config.framing()),
            outgoing: ByteBuffer::new(),
            poll_interval: config.poll_interval,
        }
    }

    /// Run one iteration: flush pending transmit, then one framing step.
    pub fn tick(&mut self, now: Instant) {
        if self.relay.outbound().withdraw(&mut self.outgoing) > 0 {
            if self.relay.is_connected() {
                self.send_outgoing();
            } else {
                trace!(len = self.outgoing.len(), "transport down, dropping transmit");
                self.relay.stats().record_dropped_transmit();
            }
            self.outgoing.clear();
        }

        // Re-checked: the write above may have lost the channel.
        if !self.relay.is_connected() {
            return;
        }

        match self.accumulator.poll(&mut self.transport, now) {
            FrameEvent::Packet(mut packet) => {
                let len = packet.len();
                self.relay.stats().record_received(len);
                if self.relay.inbound().deposit(&mut packet) {
                    warn!(len, "unread inbound packet overwritten");
                    self.relay.stats().record_overwritten();
                }
                debug!(len, "packet received");
            }
            FrameEvent::Overflow { .. } => self.relay.stats().record_overflow(),
            FrameEvent::Fault(err) => self.handle_fault("read", err),
            FrameEvent::Idle | FrameEvent::Pending { .. } | FrameEvent::Buffered { .. } => {}
        }
    }

    fn send_outgoing(&mut self) {
        let len = self.outgoing.len();
        match self.transport.write_bytes(self.outgoing.as_slice()) {
            Ok(0) => {
                debug!(len, "transport took nothing, packet dropped");
                self.relay.stats().record_dropped_transmit();
            }
            Ok(written) => {
                if written < len {
                    warn!(len, written, "short write, remainder dropped");
                }
                self.relay.stats().record_sent(written);
                debug!(len = written, "packet sent");
            }
            Err(err) => self.handle_fault("write", err),
        }
    }

    fn handle_fault(&mut self, op: &'static str, err: TransportError) {
        self.relay.stats().record_fault();
        if err.is_fatal() {
            warn!(op, error = %err, "transport lost");
            self.relay.set_connection_state(ConnectionState::Disconnected);
            self.accumulator.reset();
        } else {
            warn!(op, error = %err, "transport error, nothing transferred this tick");
        }
    }

    /// Tick at the configured cadence until `running` is cleared, then hand
    /// the transport back to the owner.
    pub fn run(mut self, running: Arc<AtomicBool>) -> T {
        info!(
            transport = self.transport.transport_name(),
            poll_interval = ?self.poll_interval,
            "io loop started"
        );
        while running.load(Ordering::Acquire) {
            self.tick(Instant::now());
            if !running.load(Ordering::Acquire) {
                break;
            }
            thread::sleep(self.poll_interval);
        }
        info!(transport = self.transport.transport_name(), "io loop stopped");
        self.transport
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Bytes of the packet currently being assembled.
    pub fn pending_inbound(&self) -> &[u8] {
        self.accumulator.pending()
    }
}

#[cfg(test)]
mod tests {
    use irlink_frame::MAX_LEN;
    use irlink_transport::{MockCall, MockHandle, MockTransport};

    use super::*;

    const MS: Duration = Duration::from_millis(1);

    fn connected_loop() -> (IoLoop<MockTransport>, MockHandle, Arc<Relay>) {
        let (mut transport, handle) = MockTransport::new();
        transport.connect().unwrap();
        let relay = Arc::new(Relay::new());
        relay.set_connection_state(ConnectionState::Connected);
        let io = IoLoop::new(transport, Arc::clone(&relay), &RelayConfig::default());
        (io, handle, relay)
    }

    fn deposit_outbound(relay: &Relay, bytes: &[u8]) {
        relay
            .outbound()
            .deposit(&mut ByteBuffer::from_slice(bytes).unwrap());
    }

    fn take_inbound(relay: &Relay) -> Vec<u8> {
        let mut dst = ByteBuffer::new();
        relay.inbound().withdraw(&mut dst);
        dst.as_slice().to_vec()
    }

    #[test]
    fn tick_drains_outbound_into_transport() {
        let (mut io, handle, relay) = connected_loop();
        deposit_outbound(&relay, &[0x10, 0x20]);

        io.tick(Instant::now());

        assert_eq!(handle.written().len(), 1);
        assert_eq!(handle.written()[0].as_ref(), &[0x10, 0x20]);
        assert!(relay.outbound().is_empty());
        assert_eq!(relay.stats().snapshot().packets_sent, 1);
    }

    #[test]
    fn fragments_become_one_inbound_packet() {
        let (mut io, handle, relay) = connected_loop();
        let t0 = Instant::now();

        handle.push_inbound(&[0x01, 0x02]);
        io.tick(t0);
        handle.push_inbound(&[0x03]);
        io.tick(t0 + 4 * MS);
        io.tick(t0 + 10 * MS);
        assert!(relay.inbound().is_empty());
        assert_eq!(io.pending_inbound(), &[0x01, 0x02, 0x03]);

        io.tick(t0 + 30 * MS);
        assert_eq!(take_inbound(&relay), vec![0x01, 0x02, 0x03]);
        assert_eq!(relay.stats().snapshot().packets_received, 1);
    }

    #[test]
    fn silence_splits_two_packets() {
        let (mut io, handle, relay) = connected_loop();
        let t0 = Instant::now();

        handle.push_inbound(&[0x01]);
        io.tick(t0);
        io.tick(t0 + 25 * MS);
        let first = take_inbound(&relay);

        handle.push_inbound(&[0x02]);
        io.tick(t0 + 26 * MS);
        io.tick(t0 + 50 * MS);
        let second = take_inbound(&relay);

        assert_eq!(first, vec![0x01]);
        assert_eq!(second, vec![0x02]);
    }

    #[test]
    fn unread_inbound_packet_is_overwritten() {
        let (mut io, handle, relay) = connected_loop();
        let t0 = Instant::now();

        handle.push_inbound(&[0xAA]);
        io.tick(t0);
        io.tick(t0 + 25 * MS);
        handle.push_inbound(&[0xBB]);
        io.tick(t0 + 26 * MS);
        io.tick(t0 + 50 * MS);

        assert_eq!(take_inbound(&relay), vec![0xBB]);
        assert_eq!(relay.stats().snapshot().overwritten, 1);
    }

    #[test]
    fn overflow_is_counted_and_buffer_kept() {
        let (mut io, handle, relay) = connected_loop();
        let t0 = Instant::now();

        handle.push_inbound(&[0x33; MAX_LEN]);
        handle.push_inbound(&[0x44]);
        io.tick(t0);
        io.tick(t0 + MS);
        io.tick(t0 + 30 * MS);

        assert_eq!(take_inbound(&relay), vec![0x33; MAX_LEN]);
        assert_eq!(relay.stats().snapshot().overflows, 1);
    }

    #[test]
    fn oversized_message_counts_as_overflow() {
        let (mut io, handle, relay) = connected_loop();
        handle.fail_next_read(TransportError::Oversized { max: MAX_LEN });
        io.tick(Instant::now());

        assert!(relay.is_connected());
        let stats = relay.stats().snapshot();
        assert_eq!(stats.overflows, 1);
        assert_eq!(stats.transport_faults, 0);
    }

    #[test]
    fn disconnected_transport_is_never_touched() {
        let (transport, handle) = MockTransport::new();
        let relay = Arc::new(Relay::new());
        let mut io = IoLoop::new(transport, Arc::clone(&relay), &RelayConfig::default());
        deposit_outbound(&relay, b"lost");
        handle.push_inbound(b"ignored");

        io.tick(Instant::now());

        assert!(handle.calls().is_empty());
        assert!(relay.outbound().is_empty());
        assert!(relay.inbound().is_empty());
        assert_eq!(relay.stats().snapshot().dropped_transmits, 1);
    }

    #[test]
    fn fatal_read_error_drops_connection() {
        let (mut io, handle, relay) = connected_loop();
        handle.push_inbound(&[0x01]);
        io.tick(Instant::now());

        handle.drop_connection("unplugged");
        io.tick(Instant::now());

        assert_eq!(relay.connection_state(), ConnectionState::Disconnected);
        assert!(io.pending_inbound().is_empty());
        assert_eq!(relay.stats().snapshot().transport_faults, 1);
    }

    #[test]
    fn transient_write_error_keeps_connection() {
        let (mut io, handle, relay) = connected_loop();
        handle.fail_next_write(TransportError::Injected("busy".into()));
        deposit_outbound(&relay, b"first");
        io.tick(Instant::now());
        deposit_outbound(&relay, b"second");
        io.tick(Instant::now());

        assert!(relay.is_connected());
        assert_eq!(handle.written().len(), 1);
        assert_eq!(handle.written()[0].as_ref(), b"second");
        assert_eq!(relay.stats().snapshot().transport_faults, 1);
    }

    #[test]
    fn write_happens_before_read_within_a_tick() {
        let (mut io, handle, relay) = connected_loop();
        deposit_outbound(&relay, b"x");
        io.tick(Instant::now());

        let calls = handle.calls();
        assert_eq!(calls[1], MockCall::Write(1));
        assert_eq!(calls[2], MockCall::Available);
    }

    #[test]
    fn run_returns_transport_when_stopped() {
        let (io, handle, relay) = connected_loop();
        let running = Arc::new(AtomicBool::new(true));
        let worker = {
            let running = Arc::clone(&running);
            thread::spawn(move || io.run(running))
        };

        deposit_outbound(&relay, b"go");
        let start = Instant::now();
        while handle.written().is_empty() {
            assert!(start.elapsed() < Duration::from_secs(2), "loop never wrote");
            thread::sleep(MS);
        }

        running.store(false, Ordering::Release);
        let transport = worker.join().unwrap();
        assert_eq!(transport.transport_name(), "mock");
    }
}
