use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use bytes::Bytes;
use serialport::{SerialPort, SerialPortType};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::TransportAdapter;

/// Serial port transport (USB IR dongles, FTDI adapters, ...).
pub struct SerialTransport {
    port_name: String,
    baud_rate: u32,
    port: Option<Box<dyn SerialPort>>,
    read_timeout: Duration,
}

/// A serial port found on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescription {
    pub name: String,
    pub description: String,
}

impl SerialTransport {
    /// Default line speed.
    pub const DEFAULT_BAUD_RATE: u32 = 115_200;
    const INITIAL_TIMEOUT: Duration = Duration::from_millis(1);

    /// Select a port by name (`/dev/ttyUSB0`, `COM7`, ...). Nothing is opened
    /// until [`connect`](TransportAdapter::connect).
    pub fn new(port_name: impl Into<String>) -> Self {
        Self::with_baud_rate(port_name, Self::DEFAULT_BAUD_RATE)
    }

    /// Select a port with an explicit line speed.
    pub fn with_baud_rate(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            port: None,
            read_timeout: Self::INITIAL_TIMEOUT,
        }
    }

    /// The configured port name.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// List the serial ports present on this host.
    pub fn available_ports() -> Result<Vec<PortDescription>> {
        let ports = serialport::available_ports()
            .map_err(|err| TransportError::Enumerate(err.into()))?;

        Ok(ports
            .into_iter()
            .map(|port| PortDescription {
                description: describe(&port.port_type),
                name: port.port_name,
            })
            .collect())
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(TransportError::NotConnected)
    }
}

fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => usb
            .product
            .clone()
            .or_else(|| usb.manufacturer.clone())
            .unwrap_or_else(|| format!("USB {:04x}:{:04x}", usb.vid, usb.pid)),
        SerialPortType::PciPort => "PCI serial port".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth serial port".to_string(),
        SerialPortType::Unknown => "serial port".to_string(),
    }
}

impl TransportAdapter for SerialTransport {
    fn connect(&mut self) -> Result<()> {
        if self.port.is_some() {
            return Ok(());
        }

        let port = serialport::new(&self.port_name, self.baud_rate)
            .timeout(self.read_timeout)
            .open()
            .map_err(|err| TransportError::Connect {
                target: self.port_name.clone(),
                source: err.into(),
            })?;

        info!(port = %self.port_name, baud = self.baud_rate, "serial port opened");
        self.port = Some(port);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize> {
        let port = self.port_mut()?;
        port.write_all(data)?;
        port.flush()?;
        Ok(data.len())
    }

    fn available(&mut self) -> Result<bool> {
        let port = self.port_mut()?;
        let pending = port
            .bytes_to_read()
            .map_err(|err| TransportError::Io(err.into()))?;
        Ok(pending > 0)
    }

    fn read_bytes(&mut self, max_len: usize, timeout: Duration) -> Result<Bytes> {
        if self.read_timeout != timeout {
            self.port_mut()?
                .set_timeout(timeout)
                .map_err(|err| TransportError::Io(err.into()))?;
            self.read_timeout = timeout;
        }

        let port = self.port_mut()?;
        let mut chunk = vec![0u8; max_len];
        match port.read(&mut chunk) {
            Ok(n) => {
                chunk.truncate(n);
                Ok(Bytes::from(chunk))
            }
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Ok(Bytes::new())
            }
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn disconnect(&mut self) {
        if self.port.take().is_some() {
            debug!(port = %self.port_name, "serial port closed");
        }
    }

    fn transport_name(&self) -> &'static str {
        "serial"
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port_name", &self.port_name)
            .field("baud_rate", &self.baud_rate)
            .field("connected", &self.port.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_missing_port_fails() {
        let mut transport = SerialTransport::new("/dev/irlink-does-not-exist");
        let err = transport.connect().unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert!(!transport.is_connected());
    }

    #[test]
    fn io_before_connect_reports_not_connected() {
        let mut transport = SerialTransport::with_baud_rate("/dev/irlink-does-not-exist", 9600);
        assert!(matches!(
            transport.write_bytes(b"x"),
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            transport.available(),
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            transport.read_bytes(8, Duration::from_millis(1)),
            Err(TransportError::NotConnected)
        ));
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut transport = SerialTransport::new("COM7");
        transport.disconnect();
        transport.disconnect();
        assert_eq!(transport.port_name(), "COM7");
        assert_eq!(transport.transport_name(), "serial");
    }

    #[test]
    fn describes_port_types() {
        assert_eq!(describe(&SerialPortType::PciPort), "PCI serial port");
        assert_eq!(describe(&SerialPortType::Unknown), "serial port");
    }
}
