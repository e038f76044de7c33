/// Errors that can occur while assembling frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Appending would push the buffer past its capacity.
    #[error("buffer overflow ({held} bytes held + {incoming} incoming, max {max})")]
    Overflow {
        held: usize,
        incoming: usize,
        max: usize,
    },
}

pub type Result<T> = std::result::Result<T, FrameError>;
