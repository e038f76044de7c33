use std::time::Duration;

use irlink_frame::{FramingConfig, DEFAULT_READ_TIMEOUT, DEFAULT_SILENCE_TIMEOUT};

use crate::error::{RelayError, Result};

/// Default pause between two I/O loop ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_micros(250);

/// Timing configuration for the relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Sleep between I/O loop ticks. Default: 250 µs.
    pub poll_interval: Duration,
    /// Silence that completes an inbound packet. Default: 20 ms.
    pub silence_timeout: Duration,
    /// Upper bound for one transport read. Default: 1 ms.
    pub read_timeout: Duration,
    /// Name given to the I/O thread.
    pub thread_name: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            silence_timeout: DEFAULT_SILENCE_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            thread_name: "irlink-io".to_string(),
        }
    }
}

impl RelayConfig {
    /// Check the timing parameters against each other.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(RelayError::InvalidConfig(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.silence_timeout.is_zero() {
            return Err(RelayError::InvalidConfig(
                "silence timeout must be greater than zero".to_string(),
            ));
        }
        // A read that can outlast the silence window would hide packet gaps.
        if self.read_timeout >= self.silence_timeout {
            return Err(RelayError::InvalidConfig(format!(
                "read timeout ({:?}) must be shorter than silence timeout ({:?})",
                self.read_timeout, self.silence_timeout
            )));
        }
        Ok(())
    }

    /// The framing parameters derived from this config.
    pub fn framing(&self) -> FramingConfig {
        FramingConfig {
            silence_timeout: self.silence_timeout,
            read_timeout: self.read_timeout,
        }
    }
}
