//! Cross-thread relay between an emulated IR port and a real transport.
//!
//! The emulation thread never waits on I/O. It deposits outgoing packets in
//! one single-slot mailbox and takes received packets from another; a
//! dedicated thread moves bytes between those mailboxes and the transport.
//!
//! - [`IrManager`] is the emulation-facing handle (`init`, `setup`,
//!   `tx_buffer`, `rx_buffer`, `reset`, `deinit`)
//! - [`IoLoop`] is the background thread's tick, public so it can be driven
//!   step by step
//! - [`Relay`] and [`Mailbox`] are the shared handoff state

pub mod config;
pub mod error;
pub mod io_loop;
pub mod mailbox;
pub mod manager;
pub mod stats;

pub use config::{RelayConfig, DEFAULT_POLL_INTERVAL};
pub use error::{RelayError, Result};
pub use io_loop::IoLoop;
pub use mailbox::{ConnectionState, Direction, Inbound, Mailbox, Outbound, Relay};
pub use manager::IrManager;
pub use stats::{RelayStats, StatsSnapshot};
