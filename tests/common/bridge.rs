//! In-process bridge on loopback for testing.
//!
//! Binds to ephemeral localhost ports and shuts down cleanly on drop.

use super::engine::ScriptedEngine;

use snmp_bridge::{Channel, ReceiveLoop, TransportBuilder, TransportStats};
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A running receive loop over real UDP sockets.
pub struct TestBridge {
    addr: SocketAddr,
    trap_addr: SocketAddr,
    engine: ScriptedEngine,
    cancel: CancellationToken,
    task: Option<JoinHandle<TransportStats>>,
}

impl TestBridge {
    /// Start a bridge with default settings.
    pub async fn new(engine: ScriptedEngine) -> Self {
        Self::with_builder(TransportBuilder::new(), engine).await
    }

    /// Start a bridge from `builder`, with both channels on loopback.
    pub async fn with_builder(builder: TransportBuilder, engine: ScriptedEngine) -> Self {
        let ctx = builder
            .bind("127.0.0.1:0")
            .trap_bind("127.0.0.1:0")
            .open()
            .await
            .expect("failed to open test bridge");

        let addr = ctx.local_addr(Channel::Response).unwrap();
        let trap_addr = ctx.local_addr(Channel::Trap).unwrap();
        let cancel = CancellationToken::new();

        let lp = ReceiveLoop::new(ctx, engine.clone()).with_cancel(cancel.clone());
        let task = tokio::spawn(lp.run());

        Self {
            addr,
            trap_addr,
            engine,
            cancel,
            task: Some(task),
        }
    }

    /// Response channel address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Trap channel address.
    pub fn trap_addr(&self) -> SocketAddr {
        self.trap_addr
    }

    pub fn engine(&self) -> &ScriptedEngine {
        &self.engine
    }

    /// Stop the loop, wait for it to close the transport and return its
    /// final counters.
    pub async fn shutdown(mut self) -> TransportStats {
        self.cancel.cancel();
        let task = self.task.take().expect("bridge already shut down");
        task.await.expect("receive loop panicked")
    }
}

impl Drop for TestBridge {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
