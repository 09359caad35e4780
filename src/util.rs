//! Internal utilities.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

/// Create and bind a UDP socket with proper IPv6 configuration.
///
/// For IPv6 sockets, sets `IPV6_V6ONLY = true` so the socket does not accept
/// IPv4-mapped addresses. `recv_buffer_size`, when set, is requested from the
/// kernel (which may cap it).
pub(crate) fn bind_udp_socket(
    addr: SocketAddr,
    recv_buffer_size: Option<usize>,
) -> io::Result<UdpSocket> {
    let domain = if addr.is_ipv6() {
        Domain::IPV6
    } else {
        Domain::IPV4
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

    if addr.is_ipv6() {
        socket.set_only_v6(true)?;
    }

    // Quick restarts after a crash must be able to rebind the agent port
    socket.set_reuse_address(true)?;

    if let Some(size) = recv_buffer_size {
        socket.set_recv_buffer_size(size)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;

    UdpSocket::from_std(socket.into())
}

/// Unspecified address of the same family as `addr`, on an ephemeral port.
pub(crate) fn ephemeral_for(addr: SocketAddr) -> SocketAddr {
    let ip = if addr.is_ipv6() {
        IpAddr::V6(Ipv6Addr::UNSPECIFIED)
    } else {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    };
    SocketAddr::new(ip, 0)
}
