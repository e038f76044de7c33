use std::fmt;
use std::io;

use irlink_frame::FrameError;
use irlink_relay::RelayError;
use irlink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

#[cfg_attr(not(feature = "serial"), allow(dead_code))]
pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => DATA_INVALID,
        io::ErrorKind::NotFound
        | io::ErrorKind::PermissionDenied
        | io::ErrorKind::AddrInUse
        | io::ErrorKind::AddrNotAvailable
        | io::ErrorKind::ConnectionRefused => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg_attr(not(feature = "serial"), allow(dead_code))]
pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Enumerate(source)
        | TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Overflow { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
    }
}

pub fn relay_error(context: &str, err: RelayError) -> CliError {
    match err {
        RelayError::InvalidConfig(_) => CliError::new(USAGE, format!("{context}: {err}")),
        RelayError::Frame(err) => frame_error(context, err),
        RelayError::Spawn(source) => CliError::new(INTERNAL, format!("{context}: {source}")),
        RelayError::AlreadyRunning => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_oversized_packet_to_data_invalid() {
        let err = RelayError::Frame(FrameError::Overflow {
            held: 0,
            incoming: 300,
            max: 255,
        });
        assert_eq!(relay_error("tx", err).code, DATA_INVALID);
    }

    #[test]
    fn maps_missing_device_to_transport_error() {
        let err = TransportError::Connect {
            target: "/dev/ttyUSB9".to_string(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        let cli = transport_error("connect failed", err);
        assert_eq!(cli.code, TRANSPORT_ERROR);
        assert!(cli.message.starts_with("connect failed: "));
    }

    #[test]
    fn maps_bad_config_to_usage() {
        let err = RelayError::InvalidConfig("poll interval must be greater than zero".into());
        assert_eq!(relay_error("init failed", err).code, USAGE);
    }
}
