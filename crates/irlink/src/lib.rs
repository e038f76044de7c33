//! Bridge an emulated IR transceiver to a real channel.
//!
//! irlink relays raw byte packets between an emulator's IR port and a serial
//! IR dongle or a UDP peer, reassembling fragmented reads into whole packets
//! by inter-byte silence.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte transports (serial behind `serial`, UDP, mock)
//! - [`frame`]: bounded buffers and silence-delimited framing
//! - [`relay`]: the cross-thread relay and the emulation-facing [`relay::IrManager`]

/// Re-export transport types.
pub mod transport {
    pub use irlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use irlink_frame::*;
}

/// Re-export relay types.
pub mod relay {
    pub use irlink_relay::*;
}
