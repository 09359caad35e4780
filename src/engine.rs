//! The seam between the transport and the protocol engine.
//!
//! The engine owns everything above the datagram: message decoding, MIB
//! lookups and response encoding. The transport calls
//! [`Engine::handle`] once per accepted datagram and lends it the
//! [`TransportContext`]; the engine answers through
//! [`TransportContext::send`] on that same context before returning.
//!
//! # Example
//!
//! ```rust
//! use snmp_bridge::{Engine, PacketBuf, TransportContext};
//! use snmp_bridge::transport::DatagramSocket;
//! use std::net::SocketAddr;
//!
//! /// Echoes every datagram back to its sender.
//! struct Reflector;
//!
//! impl<S: DatagramSocket> Engine<S> for Reflector {
//!     async fn handle(&mut self, ctx: &mut TransportContext<S>, packet: PacketBuf, source: SocketAddr) {
//!         let _ = ctx.send(&packet, source.ip(), source.port()).await;
//!     }
//! }
//! ```

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::UdpSocket;

use crate::packet::PacketBuf;
use crate::transport::{DatagramSocket, TransportContext};

/// Protocol engine driven by the receive loop.
///
/// `handle` runs on the receive loop's task; the loop does not receive the
/// next datagram until it returns. Failures inside the engine are the
/// engine's business and are not reported back to the loop.
pub trait Engine<S: DatagramSocket = UdpSocket>: Send {
    /// Process one inbound datagram.
    ///
    /// `packet` is owned by the engine and released when dropped. `source`
    /// is the sender's address and port; a response is normally sent back
    /// to it with `ctx.send(&reply, source.ip(), source.port())`.
    fn handle(
        &mut self,
        ctx: &mut TransportContext<S>,
        packet: PacketBuf,
        source: SocketAddr,
    ) -> impl Future<Output = ()> + Send;
}
