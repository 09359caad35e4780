//! Builder for [`TransportContext`].

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::net::UdpSocket;

use super::context::Settings;
use super::{
    Channel, ChannelMap, DatagramSocket, SNMP_TRAP_PORT, TRAP_SENTINEL_V4, TransportContext,
};
use crate::error::{Error, Result};
use crate::netif::{InterfaceAddress, NetworkInterface};
use crate::packet::{DEFAULT_SEGMENT_SIZE, MAX_TRANSPORT_UNIT, PacketPool};
use crate::util::{bind_udp_socket, ephemeral_for};

/// Number of transport units the default packet pool can hold at once.
const DEFAULT_POOL_UNITS: usize = 8;

/// Builder for [`TransportContext`].
///
/// Use this builder to configure and open the transport. Both channels are
/// opened by [`open()`](TransportBuilder::open); if either fails the agent
/// cannot start and the error is returned as-is.
///
/// # Example
///
/// ```rust,no_run
/// use snmp_bridge::TransportContext;
///
/// # async fn example() -> snmp_bridge::Result<()> {
/// let ctx = TransportContext::builder()
///     .bind("0.0.0.0:161")
///     .interface_address("192.168.1.50".parse().unwrap())
///     .open()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct TransportBuilder {
    bind_addr: String,
    trap_bind_addr: Option<String>,
    trap_port: u16,
    mtu: usize,
    trap_sentinel: Option<IpAddr>,
    pool_budget: Option<usize>,
    segment_size: usize,
    interface: Option<Arc<dyn NetworkInterface>>,
    recv_buffer_size: Option<usize>,
    routes: Vec<(u16, Channel)>,
}

impl TransportBuilder {
    /// Create a new builder with default settings.
    ///
    /// Defaults:
    /// - Bind address: `0.0.0.0:161`
    /// - Trap channel: unspecified address of the same family, ephemeral port
    /// - Trap port: 162
    /// - Max transport unit: 1500 bytes
    /// - Trap sentinel: `192.0.2.0`
    /// - Packet pool: eight transport units in 512-byte segments
    /// - Interface: detached (no local address)
    /// - Receive buffer size: kernel default
    pub fn new() -> Self {
        Self {
            bind_addr: "0.0.0.0:161".to_string(),
            trap_bind_addr: None,
            trap_port: SNMP_TRAP_PORT,
            mtu: MAX_TRANSPORT_UNIT,
            trap_sentinel: Some(TRAP_SENTINEL_V4),
            pool_budget: None,
            segment_size: DEFAULT_SEGMENT_SIZE,
            interface: None,
            recv_buffer_size: None,
            routes: Vec::new(),
        }
    }

    /// Set the address the response channel binds to.
    ///
    /// Binding to port 161 usually requires privileges; use a high port
    /// during development.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Set the address the trap channel binds to.
    pub fn trap_bind(mut self, addr: impl Into<String>) -> Self {
        self.trap_bind_addr = Some(addr.into());
        self
    }

    /// Set the destination port that selects the trap channel.
    pub fn trap_port(mut self, port: u16) -> Self {
        self.trap_port = port;
        self
    }

    /// Set the largest datagram payload accepted or sent.
    pub fn max_transport_unit(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    /// Set the trap sentinel address, or disable redirection with `None`.
    pub fn trap_sentinel(mut self, sentinel: Option<IpAddr>) -> Self {
        self.trap_sentinel = sentinel;
        self
    }

    /// Set the packet pool budget in bytes.
    ///
    /// Must hold at least one transport unit.
    pub fn pool_budget(mut self, bytes: usize) -> Self {
        self.pool_budget = Some(bytes);
        self
    }

    /// Set the maximum size of one chain segment.
    pub fn segment_size(mut self, bytes: usize) -> Self {
        self.segment_size = bytes;
        self
    }

    /// Use `interface` to answer local address queries.
    pub fn interface(mut self, interface: impl NetworkInterface + 'static) -> Self {
        self.interface = Some(Arc::new(interface));
        self
    }

    /// Use a fixed local address.
    pub fn interface_address(self, addr: IpAddr) -> Self {
        self.interface(InterfaceAddress::new(addr))
    }

    /// Set the kernel receive buffer size requested for the response channel.
    pub fn recv_buffer_size(mut self, size: Option<usize>) -> Self {
        self.recv_buffer_size = size;
        self
    }

    /// Route an additional destination port to a channel.
    pub fn route(mut self, port: u16, channel: Channel) -> Self {
        self.routes.push((port, channel));
        self
    }

    fn settings(&mut self) -> Result<Settings> {
        if self.mtu == 0 {
            return Err(Error::Config("max transport unit must be non-zero".into()).boxed());
        }
        if self.segment_size == 0 {
            return Err(Error::Config("segment size must be non-zero".into()).boxed());
        }

        let budget = self.pool_budget.unwrap_or(DEFAULT_POOL_UNITS * self.mtu);
        if budget < self.mtu {
            return Err(Error::Config(
                format!(
                    "pool budget of {} bytes cannot hold one {}-byte datagram",
                    budget, self.mtu
                )
                .into(),
            )
            .boxed());
        }

        let channels = self
            .routes
            .iter()
            .fold(ChannelMap::with_trap_port(self.trap_port), |map, (port, channel)| {
                map.route(*port, *channel)
            });

        let interface = self
            .interface
            .take()
            .unwrap_or_else(|| Arc::new(InterfaceAddress::detached()));

        Ok(Settings {
            mtu: self.mtu,
            channels,
            trap_sentinel: self.trap_sentinel,
            pool: PacketPool::new(budget, self.segment_size),
            interface,
        })
    }

    /// Open both channels.
    ///
    /// Binds the response channel to the configured address and the trap
    /// channel to an ephemeral port. Any failure is fatal for agent startup
    /// and is returned without retrying; a channel opened before the failure
    /// is released.
    pub async fn open(mut self) -> Result<TransportContext<UdpSocket>> {
        let settings = self.settings()?;

        let bind_addr: SocketAddr = self.bind_addr.parse().map_err(|_| {
            Error::Config(format!("invalid bind address: {}", self.bind_addr).into())
        })?;
        let trap_addr: SocketAddr = match &self.trap_bind_addr {
            Some(addr) => addr.parse().map_err(|_| {
                Error::Config(format!("invalid trap bind address: {}", addr).into())
            })?,
            None => ephemeral_for(bind_addr),
        };

        let response = bind_udp_socket(bind_addr, self.recv_buffer_size).map_err(|e| {
            tracing::error!(
                target: "snmp_bridge::transport",
                { snmp.bind = %bind_addr, error = %e },
                "binding response channel failed"
            );
            Error::Bind {
                channel: Channel::Response,
                addr: bind_addr,
                source: e,
            }
        })?;

        let trap = bind_udp_socket(trap_addr, None).map_err(|e| {
            tracing::error!(
                target: "snmp_bridge::transport",
                { snmp.bind = %trap_addr, error = %e },
                "opening trap channel failed"
            );
            Error::Bind {
                channel: Channel::Trap,
                addr: trap_addr,
                source: e,
            }
        })?;

        tracing::info!(
            target: "snmp_bridge::transport",
            {
                snmp.local_addr = ?response.local_addr().ok(),
                snmp.trap_local_addr = ?trap.local_addr().ok(),
                snmp.mtu = settings.mtu,
            },
            "transport opened"
        );

        Ok(TransportContext::from_parts(settings, response, trap))
    }

    /// Build a context over already opened sockets.
    pub fn with_sockets<S: DatagramSocket>(
        mut self,
        response: S,
        trap: S,
    ) -> Result<TransportContext<S>> {
        let settings = self.settings()?;
        Ok(TransportContext::from_parts(settings, response, trap))
    }
}

impl Default for TransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
