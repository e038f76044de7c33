use std::fmt;

use bytes::Bytes;

use crate::error::{FrameError, Result};

/// Largest buffer moved in one operation: one length byte's worth.
pub const MAX_LEN: usize = u8::MAX as usize;

/// Receive limit of the emulated cartridge's IR buffer. Pass it as the
/// `max_len` of a receive when the destination is the cartridge.
pub const CARTRIDGE_RX_LIMIT: usize = 0xB8;

/// A byte buffer that can never hold more than [`MAX_LEN`] bytes.
///
/// Storage is inline, so moving one between threads is a fixed-size copy
/// with no allocation.
#[derive(Clone)]
pub struct ByteBuffer {
    data: [u8; MAX_LEN],
    len: u8,
}

impl ByteBuffer {
    /// An empty buffer.
    pub const fn new() -> Self {
        Self {
            data: [0; MAX_LEN],
            len: 0,
        }
    }

    /// Copy `src` into a new buffer.
    pub fn from_slice(src: &[u8]) -> Result<Self> {
        let mut buf = Self::new();
        buf.extend_from_slice(src)?;
        Ok(buf)
    }

    /// Append `src`. Nothing is copied if it does not fit entirely.
    pub fn extend_from_slice(&mut self, src: &[u8]) -> Result<()> {
        let held = self.len();
        if src.len() > self.remaining() {
            return Err(FrameError::Overflow {
                held,
                incoming: src.len(),
                max: MAX_LEN,
            });
        }
        self.data[held..held + src.len()].copy_from_slice(src);
        // Fits in u8: held + src.len() <= MAX_LEN.
        self.len = (held + src.len()) as u8;
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len()]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes that can still be appended.
    pub fn remaining(&self) -> usize {
        MAX_LEN - self.len()
    }

    /// Mark the buffer empty. Stale bytes past the length are left in place.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Shorten to at most `len` bytes. Returns how many bytes were cut.
    pub fn truncate(&mut self, len: usize) -> usize {
        let held = self.len();
        if len >= held {
            return 0;
        }
        // len < held <= MAX_LEN, so it fits in u8.
        self.len = len as u8;
        held - len
    }

    /// Copy the contents out into a shareable `Bytes`.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_slice())
    }
}

impl Default for ByteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ByteBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for ByteBuffer {}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl TryFrom<&[u8]> for ByteBuffer {
    type Error = FrameError;

    fn try_from(src: &[u8]) -> Result<Self> {
        Self::from_slice(src)
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("len", &self.len())
            .field("data", &self.as_slice())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_empty() {
        let buf = ByteBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.remaining(), MAX_LEN);
        assert!(buf.as_slice().is_empty());
    }

    #[test]
    fn extend_appends_in_order() {
        let mut buf = ByteBuffer::from_slice(&[0x01, 0x02]).unwrap();
        buf.extend_from_slice(&[0x03]).unwrap();
        assert_eq!(buf.as_slice(), &[0x01, 0x02, 0x03]);
        assert_eq!(buf.to_bytes().as_ref(), &[0x01, 0x02, 0x03]);
    }

    #[test]
    fn fills_to_exact_capacity() {
        let buf = ByteBuffer::from_slice(&[0xEE; MAX_LEN]).unwrap();
        assert_eq!(buf.len(), MAX_LEN);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn overflow_leaves_contents_untouched() {
        let mut buf = ByteBuffer::from_slice(&[0x11; 250]).unwrap();
        let err = buf.extend_from_slice(&[0x22; 6]).unwrap_err();

        assert_eq!(
            err,
            FrameError::Overflow {
                held: 250,
                incoming: 6,
                max: MAX_LEN
            }
        );
        assert_eq!(buf.len(), 250);
        assert!(buf.as_slice().iter().all(|b| *b == 0x11));
    }

    #[test]
    fn from_slice_rejects_oversized_input() {
        let result = ByteBuffer::try_from(&[0u8; MAX_LEN + 1][..]);
        assert!(matches!(result, Err(FrameError::Overflow { .. })));
    }

    #[test]
    fn clear_resets_length() {
        let mut buf = ByteBuffer::from_slice(b"abc").unwrap();
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf, ByteBuffer::default());
    }

    #[test]
    fn truncate_cuts_to_cartridge_limit() {
        let mut buf = ByteBuffer::from_slice(&[0x5A; 200]).unwrap();
        assert_eq!(buf.truncate(CARTRIDGE_RX_LIMIT), 200 - CARTRIDGE_RX_LIMIT);
        assert_eq!(buf.len(), CARTRIDGE_RX_LIMIT);
        assert_eq!(buf.truncate(MAX_LEN), 0);
        assert_eq!(buf.len(), CARTRIDGE_RX_LIMIT);
    }
}
