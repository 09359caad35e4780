//! The receive loop.
//!
//! One task owns the [`TransportContext`] and alternates between two states:
//! waiting on the response channel, and dispatching a datagram to the
//! [`Engine`]. The engine's sends run inside the dispatch on the same task,
//! so there is exactly one thread of control through the context.
//!
//! # Example
//!
//! ```rust,no_run
//! use snmp_bridge::{Engine, PacketBuf, ReceiveLoop, TransportContext};
//! use snmp_bridge::transport::DatagramSocket;
//! use std::net::SocketAddr;
//!
//! struct Discard;
//!
//! impl<S: DatagramSocket> Engine<S> for Discard {
//!     async fn handle(&mut self, _: &mut TransportContext<S>, _: PacketBuf, _: SocketAddr) {}
//! }
//!
//! # async fn example() -> snmp_bridge::Result<()> {
//! let ctx = TransportContext::builder().bind("0.0.0.0:1161").open().await?;
//! ReceiveLoop::new(ctx, Discard).run().await;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::engine::Engine;
use crate::error::{ErrorClass, Result};
use crate::packet::PacketBuf;
use crate::transport::{
    Channel, DatagramSocket, TransportBuilder, TransportContext, TransportStats,
};

/// Outcome of one receive-loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iteration {
    /// A datagram was handed to the engine.
    Dispatched {
        /// Sender of the datagram.
        source: SocketAddr,
        /// Payload length.
        len: usize,
    },
    /// No datagram this iteration.
    Dropped(ErrorClass),
}

/// Drives an [`Engine`] from the response channel.
pub struct ReceiveLoop<E, S = UdpSocket> {
    ctx: TransportContext<S>,
    engine: E,
    cancel: Option<CancellationToken>,
}

impl<E, S> ReceiveLoop<E, S>
where
    S: DatagramSocket,
    E: Engine<S>,
{
    /// Create a loop over an opened context.
    pub fn new(ctx: TransportContext<S>, engine: E) -> Self {
        Self {
            ctx,
            engine,
            cancel: None,
        }
    }

    /// Stop the loop when `token` is cancelled.
    ///
    /// Cancellation is only observed while waiting for a datagram; a
    /// dispatch in progress always completes. Without a token the loop never
    /// returns.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The transport context.
    pub fn context(&self) -> &TransportContext<S> {
        &self.ctx
    }

    /// The engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Take the loop apart.
    pub fn into_parts(self) -> (TransportContext<S>, E) {
        (self.ctx, self.engine)
    }

    /// Run one wait-then-dispatch iteration.
    pub async fn step(&mut self) -> Iteration {
        let received = self.ctx.recv().await;
        self.dispatch(received).await
    }

    async fn dispatch(&mut self, received: Result<(PacketBuf, SocketAddr)>) -> Iteration {
        match received {
            Ok((packet, source)) => {
                let len = packet.len();
                tracing::trace!(
                    target: "snmp_bridge::recv",
                    { snmp.source = %source, snmp.bytes = len },
                    "dispatching to engine"
                );
                self.engine.handle(&mut self.ctx, packet, source).await;
                Iteration::Dispatched { source, len }
            }
            // the context has already logged the drop with its source
            Err(e) => Iteration::Dropped(e.class()),
        }
    }

    /// Run until cancelled, or forever without a cancellation token.
    ///
    /// Receive failures never end the loop. When the loop stops, the
    /// transport is closed and its final counters are returned.
    #[instrument(skip_all, fields(snmp.local_addr = ?self.ctx.local_addr(Channel::Response).ok()))]
    pub async fn run(mut self) -> TransportStats {
        tracing::info!(target: "snmp_bridge::recv", "receive loop started");

        let cancel = self.cancel.clone().unwrap_or_default();
        loop {
            let received = tokio::select! {
                result = self.ctx.recv() => result,
                _ = cancel.cancelled() => {
                    tracing::info!(target: "snmp_bridge::recv", "receive loop shutdown requested");
                    break;
                }
            };
            self.dispatch(received).await;
        }

        let stats = self.ctx.stats();
        self.ctx.close();
        stats
    }
}

/// Open the transport and run `engine` on it.
///
/// Returns only if opening fails; the loop itself runs forever.
pub async fn serve<E: Engine<UdpSocket>>(builder: TransportBuilder, engine: E) -> Result<()> {
    let ctx = builder.open().await?;
    ReceiveLoop::new(ctx, engine).run().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockSocket, SNMP_TRAP_PORT, TRAP_SENTINEL_V4};
    use std::io;
    use std::time::Duration;

    /// Replies with the request bytes reversed, then raises a trap.
    #[derive(Default)]
    struct Scripted {
        seen: Vec<(SocketAddr, Vec<u8>)>,
        trap: bool,
    }

    impl<S: DatagramSocket> Engine<S> for Scripted {
        async fn handle(
            &mut self,
            ctx: &mut TransportContext<S>,
            packet: PacketBuf,
            source: SocketAddr,
        ) {
            let data = packet.to_bytes().to_vec();
            drop(packet);
            let reply: Vec<u8> = data.iter().rev().copied().collect();
            self.seen.push((source, data));

            let reply = ctx.pool().alloc_from(&reply).unwrap();
            ctx.send(&reply, source.ip(), source.port()).await.unwrap();
            if self.trap {
                ctx.send(&reply, TRAP_SENTINEL_V4, SNMP_TRAP_PORT)
                    .await
                    .unwrap();
            }
        }
    }

    fn lp(trap: bool) -> (ReceiveLoop<Scripted, MockSocket>, MockSocket, MockSocket) {
        let response = MockSocket::new("0.0.0.0:161".parse().unwrap());
        let trap_sock = MockSocket::new("0.0.0.0:50000".parse().unwrap());
        let ctx = TransportBuilder::new()
            .with_sockets(response.clone(), trap_sock.clone())
            .unwrap();
        let engine = Scripted {
            trap,
            ..Default::default()
        };
        (ReceiveLoop::new(ctx, engine), response, trap_sock)
    }

    #[tokio::test]
    async fn step_dispatches_and_engine_responds() {
        let (mut lp, response, trap) = lp(true);
        let manager: SocketAddr = "10.0.0.5:40000".parse().unwrap();
        response.push_datagram(vec![1, 2, 3], manager);

        let it = lp.step().await;
        assert_eq!(
            it,
            Iteration::Dispatched {
                source: manager,
                len: 3
            }
        );

        assert_eq!(lp.engine().seen, vec![(manager, vec![1, 2, 3])]);
        assert_eq!(response.sent()[0].data.as_ref(), &[3, 2, 1]);
        assert_eq!(response.sent()[0].target, manager);
        assert_eq!(trap.sent()[0].target, "10.0.0.5:162".parse().unwrap());
        assert_eq!(lp.context().pool().in_use(), 0);
    }

    #[tokio::test]
    async fn receive_error_is_not_fatal() {
        let (mut lp, response, _) = lp(false);
        response.push_error(io::ErrorKind::TimedOut);
        response.push_datagram(vec![9], "10.0.0.5:40000".parse().unwrap());

        assert_eq!(
            lp.step().await,
            Iteration::Dropped(ErrorClass::TransientReceive)
        );
        assert!(matches!(lp.step().await, Iteration::Dispatched { .. }));
    }

    #[tokio::test]
    async fn exhausted_pool_drops_datagram() {
        let response = MockSocket::new("0.0.0.0:161".parse().unwrap());
        let ctx = TransportBuilder::new()
            .max_transport_unit(100)
            .pool_budget(100)
            .with_sockets(response.clone(), MockSocket::new("0.0.0.0:0".parse().unwrap()))
            .unwrap();
        let hog = ctx.pool().alloc(90).unwrap();
        let mut lp = ReceiveLoop::new(ctx, Scripted::default());

        response.push_datagram(vec![0; 40], "10.0.0.5:40000".parse().unwrap());
        assert_eq!(
            lp.step().await,
            Iteration::Dropped(ErrorClass::ResourceExhaustion)
        );
        assert!(lp.engine().seen.is_empty());
        assert_eq!(lp.context().last_request_source(), None);
        assert_eq!(lp.context().stats().dropped_no_buffer, 1);

        drop(hog);
        response.push_datagram(vec![0; 40], "10.0.0.5:40000".parse().unwrap());
        assert!(matches!(lp.step().await, Iteration::Dispatched { .. }));
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let (lp, response, _) = lp(false);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(lp.with_cancel(cancel.clone()).run());

        response.push_datagram(vec![1, 2], "10.0.0.5:40000".parse().unwrap());
        tokio::time::timeout(Duration::from_secs(1), async {
            while response.sent().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
