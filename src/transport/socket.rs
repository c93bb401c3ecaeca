//! UDP transport for the async drivers.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;

use crate::core::constants::RECV_BUFFER_SIZE;
use crate::core::Transport;

/// A shared UDP socket usable as the engine's [`Transport`].
///
/// Sends use `try_send_to`, so the engine never awaits. A send that would
/// block is reported as an error and treated as a lost datagram.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    /// Bind a new socket.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self::from_socket(socket))
    }

    /// Wrap an existing socket.
    pub fn from_socket(socket: UdpSocket) -> Self {
        Self {
            socket: Arc::new(socket),
        }
    }

    /// Local address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive one datagram into `buf`, returning its length and sender.
    pub async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await
    }

    /// A receive buffer large enough for any datagram.
    pub fn recv_buffer() -> Vec<u8> {
        vec![0u8; RECV_BUFFER_SIZE]
    }

    /// Get a reference to the underlying socket.
    pub fn inner(&self) -> &UdpSocket {
        &self.socket
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, peer: SocketAddr, datagram: &[u8]) -> io::Result<()> {
        let sent = self.socket.try_send_to(datagram, peer)?;
        if sent != datagram.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short send: {} of {} bytes", sent, datagram.len()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind() {
        let transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        assert!(transport.local_addr().unwrap().port() != 0);
    }

    #[tokio::test]
    async fn test_send_recv() {
        let server = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let server_addr = server.local_addr().unwrap();
        let mut client = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        client.inner().writable().await.unwrap();
        client.send(server_addr, b"hello").unwrap();

        let mut buf = UdpTransport::recv_buffer();
        let (len, from) = server.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"hello");
        assert_eq!(from, client.local_addr().unwrap());
    }
}
