//! Scriptable in-memory transport for tests and demos.
//!
//! [`MockTransport`] is handed to the relay; the paired [`MockHandle`] stays
//! with the test to feed inbound fragments, inject failures and inspect what
//! the relay wrote.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;

use crate::error::{Result, TransportError};
use crate::traits::TransportAdapter;

/// A recorded adapter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Connect,
    Write(usize),
    Available,
    Read,
    Disconnect,
}

#[derive(Default)]
struct MockState {
    connected: bool,
    closed: bool,
    inbound: VecDeque<Bytes>,
    written: Vec<Bytes>,
    calls: Vec<MockCall>,
    calls_after_disconnect: usize,
    connect_failure: Option<String>,
    read_failures: VecDeque<TransportError>,
    write_failures: VecDeque<TransportError>,
    dropped: Option<String>,
}

impl MockState {
    fn record(&mut self, call: MockCall) {
        if self.closed {
            self.calls_after_disconnect += 1;
        }
        self.calls.push(call);
    }

    fn check_open(&self) -> Result<()> {
        if let Some(reason) = &self.dropped {
            return Err(TransportError::Disconnected(reason.clone()));
        }
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        Ok(())
    }
}

/// In-memory adapter driven by a [`MockHandle`].
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// Test-side view of a [`MockTransport`].
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create an adapter and the handle that scripts it.
    pub fn new() -> (Self, MockHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockHandle { state },
        )
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MockHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a fragment for the relay to read.
    pub fn push_inbound(&self, data: &[u8]) {
        self.lock().inbound.push_back(Bytes::copy_from_slice(data));
    }

    /// Fragments still waiting to be read.
    pub fn pending_inbound(&self) -> usize {
        self.lock().inbound.len()
    }

    /// Every buffer written so far, in order.
    pub fn written(&self) -> Vec<Bytes> {
        self.lock().written.clone()
    }

    /// Every adapter call so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Calls made after [`disconnect`](TransportAdapter::disconnect).
    pub fn calls_after_disconnect(&self) -> usize {
        self.lock().calls_after_disconnect
    }

    /// Whether the adapter is currently open.
    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Whether `disconnect` has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Make the next `connect` fail.
    pub fn fail_connect(&self, reason: &str) {
        self.lock().connect_failure = Some(reason.to_string());
    }

    /// Make the next read fail with `err`.
    pub fn fail_next_read(&self, err: TransportError) {
        self.lock().read_failures.push_back(err);
    }

    /// Make the next write fail with `err`.
    pub fn fail_next_write(&self, err: TransportError) {
        self.lock().write_failures.push_back(err);
    }

    /// Simulate the device going away: every later call reports a fatal
    /// disconnect.
    pub fn drop_connection(&self, reason: &str) {
        self.lock().dropped = Some(reason.to_string());
    }
}

impl TransportAdapter for MockTransport {
    fn connect(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.record(MockCall::Connect);
        if let Some(reason) = state.connect_failure.take() {
            return Err(TransportError::Connect {
                target: "mock".to_string(),
                source: std::io::Error::other(reason),
            });
        }
        state.connected = true;
        state.closed = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize> {
        let mut state = self.lock();
        state.record(MockCall::Write(data.len()));
        state.check_open()?;
        if let Some(err) = state.write_failures.pop_front() {
            return Err(err);
        }
        state.written.push(Bytes::copy_from_slice(data));
        Ok(data.len())
    }

    fn available(&mut self) -> Result<bool> {
        let mut state = self.lock();
        state.record(MockCall::Available);
        state.check_open()?;
        Ok(!state.inbound.is_empty() || !state.read_failures.is_empty())
    }

    fn read_bytes(&mut self, max_len: usize, _timeout: Duration) -> Result<Bytes> {
        let mut state = self.lock();
        state.record(MockCall::Read);
        state.check_open()?;
        if let Some(err) = state.read_failures.pop_front() {
            return Err(err);
        }
        let Some(mut chunk) = state.inbound.pop_front() else {
            return Ok(Bytes::new());
        };
        if chunk.len() > max_len {
            let rest = chunk.split_off(max_len);
            state.inbound.push_front(rest);
        }
        Ok(chunk)
    }

    fn disconnect(&mut self) {
        let mut state = self.lock();
        state.record(MockCall::Disconnect);
        state.connected = false;
        state.closed = true;
    }

    fn transport_name(&self) -> &'static str {
        "mock"
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("connected", &self.lock().connected)
            .finish()
    }
}
