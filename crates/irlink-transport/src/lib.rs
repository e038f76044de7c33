//! Raw byte transports for the irlink relay.
//!
//! Provides a unified interface over the channels an emulated IR port can be
//! bridged to:
//! - Serial ports (USB IR dongles), behind the `serial` feature
//! - Point-to-point UDP between two emulator instances
//! - An in-memory mock for tests
//!
//! This is the lowest layer of irlink. Everything else talks to the outside
//! world through the [`TransportAdapter`] trait defined here.

pub mod error;
pub mod mock;
pub mod traits;
pub mod udp;

#[cfg(feature = "serial")]
pub mod serial;

pub use error::{Result, TransportError};
pub use mock::{MockCall, MockHandle, MockTransport};
pub use traits::TransportAdapter;
pub use udp::UdpTransport;

#[cfg(feature = "serial")]
pub use serial::{PortDescription, SerialTransport};
