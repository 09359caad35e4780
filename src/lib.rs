//! # snmp-bridge
//!
//! Datagram transport for an embedded SNMP agent.
//!
//! The crate sits between a UDP socket layer and an SNMP protocol engine. It
//! receives request datagrams on the agent port, hands them to the engine as
//! chained packet buffers, and sends the engine's responses and traps back
//! out on one of two channels.
//!
//! ## Features
//!
//! - Response channel bound to the agent port, separate trap channel
//! - Channel chosen from the destination port (162 goes to the trap channel)
//! - Trap sentinel: traps addressed to `192.0.2.0` go to the last manager
//! - Chained packet buffers drawn from a bounded pool
//! - Async-first API built on Tokio
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snmp_bridge::{Engine, PacketBuf, TransportContext};
//! use std::net::SocketAddr;
//!
//! struct Reflector;
//!
//! impl Engine for Reflector {
//!     async fn handle(&mut self, ctx: &mut TransportContext, packet: PacketBuf, source: SocketAddr) {
//!         let _ = ctx.send(&packet, source.ip(), source.port()).await;
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> snmp_bridge::Result<()> {
//!     let builder = TransportContext::builder().bind("0.0.0.0:1161");
//!     snmp_bridge::serve(builder, Reflector).await
//! }
//! ```

pub mod agent;
pub mod engine;
pub mod error;
pub mod mib;
pub mod netif;
pub mod packet;
pub mod transport;

pub(crate) mod util;

#[cfg(feature = "cli")]
pub mod cli;

// Re-exports for convenience
pub use agent::{Iteration, ReceiveLoop, serve};
pub use engine::Engine;
pub use error::{Error, ErrorClass, Result};
pub use netif::{InterfaceAddress, NetworkInterface};
pub use packet::{MAX_TRANSPORT_UNIT, PacketBuf, PacketPool};
pub use transport::{
    Channel, ChannelMap, DatagramSocket, SNMP_PORT, SNMP_TRAP_PORT, TRAP_SENTINEL_V4,
    TRAP_SENTINEL_V6, TransportBuilder, TransportContext, TransportStats,
};
