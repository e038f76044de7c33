use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use irlink_frame::ByteBuffer;
use irlink_transport::TransportAdapter;
use tracing::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::io_loop::IoLoop;
use crate::mailbox::{ConnectionState, Relay};
use crate::stats::StatsSnapshot;

type Worker = JoinHandle<Box<dyn TransportAdapter>>;

/// Emulation-facing handle for one IR link.
///
/// Lifecycle is `init` → `setup` → `tx_*`/`rx_buffer` → `deinit`. The data
/// path methods only touch the relay's mailboxes and never wait on the
/// transport.
///
/// ```no_run
/// use irlink_relay::{IrManager, RelayConfig};
/// use irlink_transport::UdpTransport;
///
/// let mut ir = IrManager::init(RelayConfig::default())?;
/// let transport = UdpTransport::new("127.0.0.1:7000".parse()?, "127.0.0.1:7001".parse()?);
/// ir.setup(transport)?;
/// ir.tx_bytes(&[0x01, 0x02])?;
///
/// let mut rx = irlink_frame::ByteBuffer::new();
/// if ir.rx_buffer(&mut rx, irlink_frame::CARTRIDGE_RX_LIMIT) > 0 {
///     println!("{:02x?}", rx.as_slice());
/// }
/// ir.deinit();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct IrManager {
    config: RelayConfig,
    relay: Arc<Relay>,
    running: Arc<AtomicBool>,
    worker: Option<Worker>,
    transport_name: Option<&'static str>,
}

impl IrManager {
    /// Validate `config` and create an idle manager.
    pub fn init(config: RelayConfig) -> Result<Self> {
        config.validate()?;
        debug!(
            poll_interval = ?config.poll_interval,
            silence_timeout = ?config.silence_timeout,
            "ir manager initialized"
        );
        Ok(Self {
            config,
            relay: Arc::new(Relay::new()),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            transport_name: None,
        })
    }

    /// Connect `transport` and start the I/O thread.
    ///
    /// A failed connect is not an error: the thread still runs, the state
    /// reads `Disconnected`, transmits are dropped and receives return 0.
    pub fn setup<T>(&mut self, mut transport: T) -> Result<ConnectionState>
    where
        T: TransportAdapter + 'static,
    {
        if self.worker.is_some() {
            return Err(RelayError::AlreadyRunning);
        }

        let name = transport.transport_name();
        let state = match transport.connect() {
            Ok(()) => {
                info!(transport = name, "transport connected");
                ConnectionState::Connected
            }
            Err(err) => {
                warn!(transport = name, error = %err, "transport connect failed");
                ConnectionState::Disconnected
            }
        };
        self.relay.set_connection_state(state);
        self.running.store(true, Ordering::Release);

        let transport: Box<dyn TransportAdapter> = Box::new(transport);
        let io = IoLoop::new(transport, Arc::clone(&self.relay), &self.config);
        let running = Arc::clone(&self.running);
        let spawned = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || io.run(running));

        match spawned {
            Ok(worker) => {
                self.worker = Some(worker);
                self.transport_name = Some(name);
                Ok(state)
            }
            Err(err) => {
                self.running.store(false, Ordering::Release);
                self.relay.set_connection_state(ConnectionState::Disconnected);
                Err(RelayError::Spawn(err))
            }
        }
    }

    /// Queue `buf` for transmission and clear it.
    ///
    /// An unsent earlier buffer is replaced.
    pub fn tx_buffer(&self, buf: &mut ByteBuffer) {
        if self.relay.outbound().deposit(buf) {
            warn!("unsent outbound packet overwritten");
            self.relay.stats().record_overwritten();
        }
    }

    /// Queue a copy of `data` for transmission.
    pub fn tx_bytes(&self, data: &[u8]) -> Result<()> {
        let mut buf = ByteBuffer::from_slice(data)?;
        self.tx_buffer(&mut buf);
        Ok(())
    }

    /// Take the most recent received packet into `dst`, keeping at most
    /// `max_len` bytes of it.
    ///
    /// Bytes past `max_len` are discarded and counted in
    /// [`StatsSnapshot::truncated_bytes`]. Returns the delivered length, or 0
    /// (with `dst` cleared) when nothing arrived.
    pub fn rx_buffer(&self, dst: &mut ByteBuffer, max_len: usize) -> usize {
        let len = self.relay.inbound().withdraw(dst);
        let cut = dst.truncate(max_len);
        if cut > 0 {
            warn!(len, max_len, cut, "received packet longer than reader limit, truncated");
            self.relay.stats().record_truncated(cut);
        }
        dst.len()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.relay.connection_state()
    }

    pub fn is_connected(&self) -> bool {
        self.relay.is_connected()
    }

    /// Whether the I/O thread is running.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Name of the transport handed to the last `setup`.
    pub fn transport_name(&self) -> Option<&'static str> {
        self.transport_name
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.relay.stats().snapshot()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Stop, drop anything pending in either direction, and start again on
    /// `transport`.
    pub fn reset<T>(&mut self, transport: T) -> Result<ConnectionState>
    where
        T: TransportAdapter + 'static,
    {
        self.deinit();
        self.relay.clear();
        self.setup(transport)
    }

    /// Stop the I/O thread, wait for it, then disconnect the transport it
    /// hands back. Safe to call more than once.
    pub fn deinit(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.running.store(false, Ordering::Release);
        match worker.join() {
            Ok(mut transport) => {
                transport.disconnect();
                info!(transport = transport.transport_name(), "transport disconnected");
            }
            Err(_) => error!("io thread panicked; transport dropped without disconnect"),
        }
        self.relay.set_connection_state(ConnectionState::Disconnected);
    }
}

impl Drop for IrManager {
    fn drop(&mut self) {
        self.deinit();
    }
}

impl std::fmt::Debug for IrManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IrManager")
            .field("state", &self.connection_state())
            .field("running", &self.is_running())
            .field("transport", &self.transport_name)
            .finish()
    }
}
