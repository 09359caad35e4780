//! Engine that follows a script and records what it saw.

use snmp_bridge::transport::DatagramSocket;
use snmp_bridge::{Engine, ErrorClass, PacketBuf, TransportContext};
use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};

/// One send the engine makes while handling a datagram.
#[derive(Debug, Clone)]
pub enum Action {
    /// Send `len` bytes back to the request's source.
    Reply(usize),
    /// Send the request bytes back to the request's source.
    Echo,
    /// Send `len` bytes to `dst:port`.
    SendTo { dst: IpAddr, port: u16, len: usize },
}

/// A datagram the engine was handed.
#[derive(Debug, Clone)]
pub struct Call {
    pub source: SocketAddr,
    pub data: Vec<u8>,
    /// Outcome of each scripted send, in order.
    pub results: Vec<Result<(), ErrorClass>>,
}

/// Engine that performs one list of actions per datagram.
///
/// Clones share the script and the call log, so a test keeps one clone while
/// the receive loop owns the other. Datagrams beyond the script get no
/// response.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    script: Arc<Mutex<VecDeque<Vec<Action>>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the actions for the next unscripted datagram.
    pub fn then(self, actions: Vec<Action>) -> Self {
        self.script.lock().unwrap().push_back(actions);
        self
    }

    /// Calls so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

/// Payload of `len` bytes, distinguishable from request bytes.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8 ^ 0xA5).collect()
}

impl<S: DatagramSocket> Engine<S> for ScriptedEngine {
    async fn handle(&mut self, ctx: &mut TransportContext<S>, packet: PacketBuf, source: SocketAddr) {
        let data = packet.to_bytes().to_vec();
        drop(packet);

        let actions = self.script.lock().unwrap().pop_front().unwrap_or_default();
        let mut results = Vec::with_capacity(actions.len());
        for action in actions {
            let (dst, port, bytes) = match action {
                Action::Reply(len) => (source.ip(), source.port(), payload(len)),
                Action::Echo => (source.ip(), source.port(), data.clone()),
                Action::SendTo { dst, port, len } => (dst, port, payload(len)),
            };
            let result = match ctx.pool().alloc_from(&bytes) {
                Ok(pkt) => ctx.send(&pkt, dst, port).await.map_err(|e| e.class()),
                Err(e) => Err(e.class()),
            };
            results.push(result);
        }

        self.calls.lock().unwrap().push(Call {
            source,
            data,
            results,
        });
    }
}
