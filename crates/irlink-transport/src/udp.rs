use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::traits::TransportAdapter;

/// Point-to-point UDP transport between two emulator instances.
///
/// Each datagram carries whatever fragment the sender had on hand; packet
/// boundaries are still recovered by the framing engine, not by datagrams.
pub struct UdpTransport {
    local: SocketAddr,
    remote: SocketAddr,
    socket: Option<UdpSocket>,
}

impl UdpTransport {
    /// Select the local bind address and the remote peer. Nothing is bound
    /// until [`connect`](TransportAdapter::connect).
    pub fn new(local: SocketAddr, remote: SocketAddr) -> Self {
        Self {
            local,
            remote,
            socket: None,
        }
    }

    /// The bound local address, once connected (resolves port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// The remote peer address.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    fn socket(&self) -> Result<&UdpSocket> {
        self.socket.as_ref().ok_or(TransportError::NotConnected)
    }
}

impl TransportAdapter for UdpTransport {
    fn connect(&mut self) -> Result<()> {
        if self.socket.is_some() {
            return Ok(());
        }

        let socket = UdpSocket::bind(self.local).map_err(|e| TransportError::Bind {
            addr: self.local,
            source: e,
        })?;
        socket
            .connect(self.remote)
            .map_err(|e| TransportError::Connect {
                target: self.remote.to_string(),
                source: e,
            })?;
        socket.set_nonblocking(true)?;

        info!(local = ?socket.local_addr().ok(), remote = %self.remote, "udp channel open");
        self.socket = Some(socket);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize> {
        let socket = self.socket()?;
        match socket.send(data) {
            Ok(n) => Ok(n),
            // No peer listening yet; the datagram is gone either way.
            Err(err) if err.kind() == ErrorKind::ConnectionRefused => {
                debug!(remote = %self.remote, "peer not listening");
                Ok(0)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn available(&mut self) -> Result<bool> {
        let socket = self.socket()?;
        let mut peeked = [0u8; 1];
        match socket.peek(&mut peeked) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(false),
            // Stale ICMP port-unreachable from an earlier send.
            Err(err) if err.kind() == ErrorKind::ConnectionRefused => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn read_bytes(&mut self, max_len: usize, _timeout: Duration) -> Result<Bytes> {
        let socket = self.socket()?;
        // One spare byte tells a datagram of exactly `max_len` from a longer one.
        let mut chunk = BytesMut::zeroed(max_len.saturating_add(1));
        match socket.recv(&mut chunk) {
            Ok(n) if n > max_len => {
                warn!(max_len, "oversized datagram dropped");
                Err(TransportError::Oversized { max: max_len })
            }
            Ok(n) => {
                chunk.truncate(n);
                Ok(chunk.freeze())
            }
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::WouldBlock | ErrorKind::ConnectionRefused
                ) =>
            {
                Ok(Bytes::new())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn disconnect(&mut self) {
        if self.socket.take().is_some() {
            debug!(remote = %self.remote, "udp channel closed");
        }
    }

    fn transport_name(&self) -> &'static str {
        "udp"
    }
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("local", &self.local)
            .field("remote", &self.remote)
            .field("connected", &self.socket.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    fn wait_available(transport: &mut UdpTransport) {
        let start = Instant::now();
        while !transport.available().unwrap() {
            assert!(start.elapsed() < Duration::from_secs(2), "datagram never arrived");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn exchanges_datagrams_with_peer() {
        let peer = UdpSocket::bind(loopback()).unwrap();
        let mut transport = UdpTransport::new(loopback(), peer.local_addr().unwrap());
        transport.connect().unwrap();
        assert!(transport.is_connected());

        assert_eq!(transport.write_bytes(&[0x01, 0x02, 0x03]).unwrap(), 3);
        let mut buf = [0u8; 16];
        let (n, from) = peer.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[0x01, 0x02, 0x03]);
        assert_eq!(Some(from), transport.local_addr());

        peer.send_to(&[0xAA, 0xBB], from).unwrap();
        wait_available(&mut transport);
        let data = transport.read_bytes(255, Duration::from_millis(1)).unwrap();
        assert_eq!(data.as_ref(), &[0xAA, 0xBB]);
    }

    #[test]
    fn datagram_at_limit_is_delivered_whole() {
        let peer = UdpSocket::bind(loopback()).unwrap();
        let mut transport = UdpTransport::new(loopback(), peer.local_addr().unwrap());
        transport.connect().unwrap();

        peer.send_to(&[0x5A; 255], transport.local_addr().unwrap()).unwrap();
        wait_available(&mut transport);
        let data = transport.read_bytes(255, Duration::from_millis(1)).unwrap();
        assert_eq!(data.len(), 255);
    }

    #[test]
    fn datagram_over_limit_is_reported_not_truncated() {
        let peer = UdpSocket::bind(loopback()).unwrap();
        let mut transport = UdpTransport::new(loopback(), peer.local_addr().unwrap());
        transport.connect().unwrap();

        peer.send_to(&[0x5A; 300], transport.local_addr().unwrap()).unwrap();
        wait_available(&mut transport);
        let err = transport.read_bytes(255, Duration::from_millis(1)).unwrap_err();
        assert!(matches!(err, TransportError::Oversized { max: 255 }));
        assert!(!err.is_fatal());

        peer.send_to(&[0x01], transport.local_addr().unwrap()).unwrap();
        wait_available(&mut transport);
        let data = transport.read_bytes(255, Duration::from_millis(1)).unwrap();
        assert_eq!(data.as_ref(), &[0x01]);
    }

    #[test]
    fn nothing_available_on_idle_socket() {
        let peer = UdpSocket::bind(loopback()).unwrap();
        let mut transport = UdpTransport::new(loopback(), peer.local_addr().unwrap());
        transport.connect().unwrap();

        assert!(!transport.available().unwrap());
        let data = transport.read_bytes(255, Duration::from_millis(1)).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn io_requires_connect() {
        let mut transport = UdpTransport::new(loopback(), loopback());
        assert!(matches!(
            transport.write_bytes(b"x"),
            Err(TransportError::NotConnected)
        ));
        assert!(transport.local_addr().is_none());
    }

    #[test]
    fn disconnect_releases_socket() {
        let peer = UdpSocket::bind(loopback()).unwrap();
        let mut transport = UdpTransport::new(loopback(), peer.local_addr().unwrap());
        transport.connect().unwrap();
        transport.disconnect();
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.available(),
            Err(TransportError::NotConnected)
        ));
    }
}
