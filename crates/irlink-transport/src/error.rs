use std::io::ErrorKind;
use std::net::SocketAddr;

/// Errors that can occur in transport adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the configured channel.
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        source: std::io::Error,
    },

    /// Failed to bind the local end of a network channel.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to list the channels available on this host.
    #[error("failed to enumerate ports: {0}")]
    Enumerate(std::io::Error),

    /// An I/O error occurred on the open channel.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The adapter has not been connected (or was already disconnected).
    #[error("transport not connected")]
    NotConnected,

    /// The remote end or the device went away.
    #[error("transport disconnected: {0}")]
    Disconnected(String),

    /// A message longer than the caller's limit arrived and was discarded.
    #[error("message longer than {max} bytes dropped")]
    Oversized { max: usize },

    /// A failure scripted by the mock adapter.
    #[error("injected failure: {0}")]
    Injected(String),
}

impl TransportError {
    /// Whether the channel is unusable after this error.
    ///
    /// Fatal errors flip the relay's connection state; everything else is
    /// reported and treated as "no bytes transferred this tick".
    pub fn is_fatal(&self) -> bool {
        match self {
            TransportError::NotConnected | TransportError::Disconnected(_) => true,
            TransportError::Io(err) => matches!(
                err.kind(),
                ErrorKind::BrokenPipe
                    | ErrorKind::NotConnected
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::UnexpectedEof
                    | ErrorKind::NotFound
            ),
            TransportError::Connect { .. }
            | TransportError::Bind { .. }
            | TransportError::Enumerate(_)
            | TransportError::Oversized { .. }
            | TransportError::Injected(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_pipe_is_fatal() {
        let err = TransportError::from(std::io::Error::from(ErrorKind::BrokenPipe));
        assert!(err.is_fatal());
    }

    #[test]
    fn timeouts_and_refusals_are_transient() {
        let timed_out = TransportError::from(std::io::Error::from(ErrorKind::TimedOut));
        let refused = TransportError::from(std::io::Error::from(ErrorKind::ConnectionRefused));
        assert!(!timed_out.is_fatal());
        assert!(!refused.is_fatal());
        assert!(!TransportError::Injected("glitch".into()).is_fatal());
        assert!(!TransportError::Oversized { max: 255 }.is_fatal());
    }

    #[test]
    fn disconnect_is_fatal() {
        assert!(TransportError::NotConnected.is_fatal());
        assert!(TransportError::Disconnected("unplugged".into()).is_fatal());
    }
}
