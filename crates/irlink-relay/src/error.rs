/// Errors that can occur while managing the relay.
///
/// Nothing here is produced by the data path: transport failures during
/// operation are logged and counted, never returned to the emulation thread.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A timing parameter is out of range.
    #[error("invalid relay config: {0}")]
    InvalidConfig(String),

    /// `setup` was called while the I/O thread is still running.
    #[error("relay already running")]
    AlreadyRunning,

    /// The I/O thread could not be started.
    #[error("failed to spawn io thread: {0}")]
    Spawn(std::io::Error),

    /// A buffer did not fit the link's maximum length.
    #[error("frame error: {0}")]
    Frame(#[from] irlink_frame::FrameError),
}

pub type Result<T> = std::result::Result<T, RelayError>;
