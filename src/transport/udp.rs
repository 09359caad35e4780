//! UDP socket implementation of [`DatagramSocket`].

use std::io;
use std::net::SocketAddr;

use tokio::net::UdpSocket;

use super::DatagramSocket;

impl DatagramSocket for UdpSocket {
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf).await
    }

    async fn send_to(&self, data: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, data, target).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        UdpSocket::local_addr(self)
    }
}
