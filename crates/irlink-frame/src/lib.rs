//! Bounded byte buffers and silence-delimited packet framing.
//!
//! The emulated IR link has no length prefix and no terminator byte on the
//! wire. A packet is everything that arrives before the line goes quiet:
//! - [`ByteBuffer`] holds at most [`MAX_LEN`] bytes, enforced by its type
//! - [`FrameAccumulator`] grows a buffer from fragmented reads and hands it
//!   out once the configured silence has elapsed

pub mod accumulator;
pub mod buffer;
pub mod error;

pub use accumulator::{
    FrameAccumulator, FrameEvent, FramingConfig, DEFAULT_READ_TIMEOUT, DEFAULT_SILENCE_TIMEOUT,
};
pub use buffer::{ByteBuffer, CARTRIDGE_RX_LIMIT, MAX_LEN};
pub use error::{FrameError, Result};
