//! The transport context: both channels, the scratch region and the trap
//! redirect state.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::net::UdpSocket;

use super::{Channel, ChannelMap, DatagramSocket, TransportBuilder};
use crate::error::{Error, ErrorClass, Result};
use crate::netif::NetworkInterface;
use crate::packet::{self, PacketBuf, PacketPool};

/// Counters kept by the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Datagrams accepted and handed to the engine.
    pub received: u64,
    /// Receive calls that failed or yielded an empty datagram.
    pub receive_errors: u64,
    /// Datagrams dropped because the packet pool was exhausted.
    pub dropped_no_buffer: u64,
    /// Datagrams dropped because of a size or copy mismatch.
    pub dropped_copy: u64,
    /// Datagrams sent on the response channel.
    pub responses_sent: u64,
    /// Datagrams sent on the trap channel.
    pub traps_sent: u64,
    /// Sends whose destination was rewritten from the sentinel.
    pub traps_redirected: u64,
    /// Sends that failed for any reason.
    pub send_failures: u64,
}

impl TransportStats {
    fn record_drop(&mut self, class: ErrorClass) {
        match class {
            ErrorClass::ResourceExhaustion => self.dropped_no_buffer += 1,
            ErrorClass::CopyIntegrity => self.dropped_copy += 1,
            _ => self.receive_errors += 1,
        }
    }
}

/// Validated settings the context is built from.
pub(crate) struct Settings {
    pub(crate) mtu: usize,
    pub(crate) channels: ChannelMap,
    pub(crate) trap_sentinel: Option<IpAddr>,
    pub(crate) pool: PacketPool,
    pub(crate) interface: Arc<dyn NetworkInterface>,
}

/// Transport context shared by the receive loop and the engine.
///
/// Owns the response channel (bound to the agent port), the trap channel, a
/// scratch region of one transport unit and the source address of the most
/// recent request. The receive loop owns the context and lends it to the
/// engine as `&mut TransportContext` for each datagram; the engine sends its
/// responses and traps through that same reference, so no locking is needed.
///
/// # Trap redirection
///
/// When a trap sentinel is configured (by default `192.0.2.0`), any send
/// addressed to the sentinel goes to the address of the last request
/// instead. This lets a developer receive traps on the machine running the
/// manager without configuring a trap destination. Only one source is
/// remembered: if requests from several managers interleave, traps go to
/// whichever one spoke last.
pub struct TransportContext<S = UdpSocket> {
    response: S,
    trap: S,
    channels: ChannelMap,
    mtu: usize,
    scratch: Box<[u8]>,
    last_request_source: Option<IpAddr>,
    trap_sentinel: Option<IpAddr>,
    pool: PacketPool,
    interface: Arc<dyn NetworkInterface>,
    stats: TransportStats,
}

impl TransportContext<UdpSocket> {
    /// Create a builder for configuring and opening the transport.
    pub fn builder() -> TransportBuilder {
        TransportBuilder::new()
    }
}

impl<S: DatagramSocket> TransportContext<S> {
    pub(crate) fn from_parts(settings: Settings, response: S, trap: S) -> Self {
        Self {
            response,
            trap,
            channels: settings.channels,
            mtu: settings.mtu,
            // one spare byte so a datagram longer than the mtu is seen as such
            scratch: vec![0u8; settings.mtu + 1].into_boxed_slice(),
            last_request_source: None,
            trap_sentinel: settings.trap_sentinel,
            pool: settings.pool,
            interface: settings.interface,
            stats: TransportStats::default(),
        }
    }

    /// Receive the next request on the response channel.
    ///
    /// Waits for a datagram, copies it into a chain allocated for exactly its
    /// length and records the sender as the trap redirect target. Every error
    /// means "no datagram"; the source is only recorded on success. A
    /// datagram longer than the transport unit is dropped, never truncated.
    pub async fn recv(&mut self) -> Result<(PacketBuf, SocketAddr)> {
        match self.recv_datagram().await {
            Ok((pkt, source)) => {
                self.stats.received += 1;
                self.last_request_source = Some(source.ip());
                tracing::debug!(
                    target: "snmp_bridge::recv",
                    { snmp.source = %source, snmp.bytes = pkt.len(), snmp.segments = pkt.segment_count() },
                    "received request"
                );
                Ok((pkt, source))
            }
            Err((e, source)) => {
                let class = e.class();
                self.stats.record_drop(class);
                tracing::warn!(
                    target: "snmp_bridge::recv",
                    { snmp.source = ?source, snmp.error_class = %class },
                    "datagram dropped: {}", e
                );
                Err(e)
            }
        }
    }

    /// On failure, also returns the sender when the socket reported one.
    async fn recv_datagram(
        &mut self,
    ) -> std::result::Result<(PacketBuf, SocketAddr), (Box<Error>, Option<SocketAddr>)> {
        let (len, source) = self
            .response
            .recv_from(&mut self.scratch[..])
            .await
            .map_err(|e| {
                let err = Error::Receive {
                    channel: Channel::Response,
                    source: e,
                };
                (err.boxed(), None)
            })?;

        let fail = move |e: Box<Error>| (e, Some(source));
        if len == 0 {
            return Err(fail(
                Error::EmptyDatagram {
                    source_addr: source,
                }
                .boxed(),
            ));
        }
        if len > self.mtu {
            return Err(fail(Error::Oversized { len, max: self.mtu }.boxed()));
        }

        let pkt = packet::inbound(&self.pool, &self.scratch[..len], self.mtu).map_err(fail)?;
        Ok((pkt, source))
    }

    /// Send a response or trap.
    ///
    /// The payload is flattened into the scratch region, the destination is
    /// rewritten if it is the trap sentinel, and the channel is chosen from
    /// the destination port. A send that moves fewer bytes than the payload
    /// is an error. Nothing is retried.
    pub async fn send(&mut self, packet: &PacketBuf, dst: IpAddr, port: u16) -> Result<()> {
        let result = self.send_datagram(packet, dst, port).await;
        if let Err(e) = &result {
            self.stats.send_failures += 1;
            tracing::warn!(
                target: "snmp_bridge::send",
                { snmp.dst = %dst, snmp.port = port, snmp.bytes = packet.len(), snmp.error_class = %e.class() },
                "send failed: {}", e
            );
        }
        result
    }

    async fn send_datagram(&mut self, packet: &PacketBuf, dst: IpAddr, port: u16) -> Result<()> {
        let len = packet::outbound(packet, &mut self.scratch[..self.mtu])?.len();

        let ip = self.redirect(dst)?;
        let target = SocketAddr::new(ip, port);
        if ip.is_unspecified() || port == 0 {
            return Err(Error::InvalidDestination { target }.boxed());
        }

        let channel = self.channels.select(port);
        tracing::debug!(
            target: "snmp_bridge::send",
            { snmp.channel = %channel, snmp.target = %target, snmp.bytes = len },
            "sending datagram"
        );

        let socket = match channel {
            Channel::Response => &self.response,
            Channel::Trap => &self.trap,
        };
        let sent = socket
            .send_to(&self.scratch[..len], target)
            .await
            .map_err(|e| Error::Send {
                channel,
                target,
                len,
                source: e,
            })?;

        if sent != len {
            return Err(Error::PartialSend {
                channel,
                target,
                expected: len,
                sent,
            }
            .boxed());
        }

        match channel {
            Channel::Response => self.stats.responses_sent += 1,
            Channel::Trap => self.stats.traps_sent += 1,
        }
        if ip != dst {
            self.stats.traps_redirected += 1;
        }
        Ok(())
    }

    /// Apply the trap sentinel substitution to a destination.
    fn redirect(&self, dst: IpAddr) -> Result<IpAddr> {
        match self.trap_sentinel {
            Some(sentinel) if sentinel == dst => match self.last_request_source {
                Some(source) => {
                    tracing::warn!(
                        target: "snmp_bridge::send",
                        { snmp.sentinel = %sentinel, snmp.redirect = %source },
                        "trap destination is the sentinel, redirecting to last request source"
                    );
                    Ok(source)
                }
                None => Err(Error::NoRedirectTarget { sentinel }.boxed()),
            },
            _ => Ok(dst),
        }
    }

    /// Local address reachable from `destination`.
    ///
    /// The device has one interface, so `destination` is ignored and the
    /// interface's current address is returned. `None` means the address is
    /// not known yet.
    pub fn resolve_local_address(&self, destination: IpAddr) -> Option<IpAddr> {
        let addr = self
            .interface
            .ip_address()
            .filter(|ip| !ip.is_unspecified());
        if addr.is_none() {
            tracing::debug!(
                target: "snmp_bridge::netif",
                { snmp.dst = %destination },
                "local address unknown"
            );
        }
        addr
    }

    /// Source address of the most recent request, if any arrived.
    pub fn last_request_source(&self) -> Option<IpAddr> {
        self.last_request_source
    }

    /// The configured trap sentinel.
    pub fn trap_sentinel(&self) -> Option<IpAddr> {
        self.trap_sentinel
    }

    /// Pool the engine should allocate outbound packets from.
    pub fn pool(&self) -> &PacketPool {
        &self.pool
    }

    /// Maximum payload size of one datagram.
    pub fn max_transport_unit(&self) -> usize {
        self.mtu
    }

    /// The port-to-channel table.
    pub fn channels(&self) -> &ChannelMap {
        &self.channels
    }

    /// Local address of a channel's socket.
    pub fn local_addr(&self, channel: Channel) -> std::io::Result<SocketAddr> {
        match channel {
            Channel::Response => self.response.local_addr(),
            Channel::Trap => self.trap.local_addr(),
        }
    }

    /// Transport counters.
    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    /// Release both channels.
    ///
    /// Only the failure path closes the context; a running agent keeps it
    /// for the life of the process.
    pub fn close(self) {
        tracing::info!(
            target: "snmp_bridge::transport",
            { snmp.received = self.stats.received, snmp.send_failures = self.stats.send_failures },
            "closing transport"
        );
        drop(self);
    }
}

impl<S> std::fmt::Debug for TransportContext<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportContext")
            .field("channels", &self.channels)
            .field("mtu", &self.mtu)
            .field("last_request_source", &self.last_request_source)
            .field("trap_sentinel", &self.trap_sentinel)
            .field("pool", &self.pool)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
