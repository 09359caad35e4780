//! Transport layer.
//!
//! Provides the [`DatagramSocket`] seam, the two transmission [`Channel`]s,
//! the port-to-channel table and the [`TransportContext`] that owns both
//! sockets.

mod builder;
mod context;
mod udp;

#[cfg(any(test, feature = "testing"))]
mod mock;

pub use builder::*;
pub use context::*;

#[cfg(any(test, feature = "testing"))]
pub use mock::*;

use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Well-known agent port for requests and responses.
pub const SNMP_PORT: u16 = 161;

/// Well-known port traps are sent to.
pub const SNMP_TRAP_PORT: u16 = 162;

/// Reserved documentation address (RFC 5737) used as the IPv4 trap sentinel.
pub const TRAP_SENTINEL_V4: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 0));

/// Reserved documentation address (RFC 3849) used as the IPv6 trap sentinel.
pub const TRAP_SENTINEL_V6: IpAddr = IpAddr::V6(Ipv6Addr::new(
    0x2001, 0x0db8, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff,
));

/// Datagram socket abstraction.
///
/// Implemented for [`tokio::net::UdpSocket`]; tests substitute a fake.
/// `send_to` returns the number of bytes the socket accepted so callers can
/// detect partial sends.
pub trait DatagramSocket: Send + Sync {
    /// Receive one datagram into `buf`.
    fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send;

    /// Send `data` to `target`.
    fn send_to(
        &self,
        data: &[u8],
        target: SocketAddr,
    ) -> impl Future<Output = io::Result<usize>> + Send;

    /// Local bind address.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

/// Transmission channel.
///
/// The network stack on small devices cannot reliably `sendto` different
/// destinations through one socket, so responses and traps leave through
/// separate sockets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Bound to the agent port; receives requests and sends responses.
    Response,
    /// Ephemeral source for outbound traps.
    Trap,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Response => write!(f, "response"),
            Self::Trap => write!(f, "trap"),
        }
    }
}

/// Destination-port to channel table.
///
/// Ports without an entry use the fallback channel.
///
/// ```rust
/// use snmp_bridge::transport::{Channel, ChannelMap};
///
/// let map = ChannelMap::default();
/// assert_eq!(map.select(162), Channel::Trap);
/// assert_eq!(map.select(40000), Channel::Response);
///
/// let map = map.route(10162, Channel::Trap);
/// assert_eq!(map.select(10162), Channel::Trap);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMap {
    routes: Vec<(u16, Channel)>,
    fallback: Channel,
}

impl ChannelMap {
    /// Empty table sending everything to `fallback`.
    pub fn new(fallback: Channel) -> Self {
        Self {
            routes: Vec::new(),
            fallback,
        }
    }

    /// Standard table: `trap_port` goes to the trap channel, everything else
    /// to the response channel.
    pub fn with_trap_port(trap_port: u16) -> Self {
        Self::new(Channel::Response).route(trap_port, Channel::Trap)
    }

    /// Route `port` to `channel`, replacing any existing entry.
    pub fn route(mut self, port: u16, channel: Channel) -> Self {
        match self.routes.iter_mut().find(|(p, _)| *p == port) {
            Some(entry) => entry.1 = channel,
            None => self.routes.push((port, channel)),
        }
        self
    }

    /// Channel for a destination port.
    pub fn select(&self, port: u16) -> Channel {
        self.routes
            .iter()
            .find(|(p, _)| *p == port)
            .map(|(_, c)| *c)
            .unwrap_or(self.fallback)
    }

    /// Channel used for unrouted ports.
    pub fn fallback(&self) -> Channel {
        self.fallback
    }
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self::with_trap_port(SNMP_TRAP_PORT)
    }
}
