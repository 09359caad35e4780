//! Real UDP sockets on loopback.

mod common;

use common::{Action, ScriptedEngine, TestBridge, payload};
use snmp_bridge::{TRAP_SENTINEL_V4, TransportBuilder};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

async fn recv(sock: &UdpSocket) -> (Vec<u8>, std::net::SocketAddr) {
    let mut buf = vec![0u8; 2048];
    let (n, from) = timeout(WAIT, sock.recv_from(&mut buf))
        .await
        .expect("timed out waiting for datagram")
        .unwrap();
    buf.truncate(n);
    (buf, from)
}

#[tokio::test]
async fn response_returns_from_agent_port() {
    let engine = ScriptedEngine::new().then(vec![Action::Reply(60)]);
    let bridge = TestBridge::new(engine).await;

    let manager = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    manager.send_to(&[0x30u8; 40], bridge.addr()).await.unwrap();

    let (data, from) = recv(&manager).await;
    assert_eq!(data, payload(60));
    assert_eq!(from, bridge.addr());

    let calls = bridge.engine().calls();
    assert_eq!(calls[0].data, vec![0x30u8; 40]);
    assert_eq!(calls[0].source, manager.local_addr().unwrap());

    bridge.shutdown().await;
}

#[tokio::test]
async fn sentinel_trap_reaches_manager_from_trap_channel() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let trap_port = receiver.local_addr().unwrap().port();

    let engine = ScriptedEngine::new().then(vec![
        Action::Reply(20),
        Action::SendTo {
            dst: TRAP_SENTINEL_V4,
            port: trap_port,
            len: 48,
        },
    ]);
    let bridge = TestBridge::with_builder(TransportBuilder::new().trap_port(trap_port), engine).await;

    let manager = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    manager.send_to(&[0x30u8; 12], bridge.addr()).await.unwrap();

    let (_, from) = recv(&manager).await;
    assert_eq!(from, bridge.addr());

    let (trap, from) = recv(&receiver).await;
    assert_eq!(trap, payload(48));
    assert_eq!(from, bridge.trap_addr());

    bridge.shutdown().await;
}

#[tokio::test]
async fn loop_survives_unanswered_datagrams() {
    let engine = ScriptedEngine::new()
        .then(vec![])
        .then(vec![])
        .then(vec![Action::Echo]);
    let bridge = TestBridge::new(engine).await;

    let manager = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    for i in 0..3u8 {
        manager.send_to(&[i; 8], bridge.addr()).await.unwrap();
    }

    let (data, _) = recv(&manager).await;
    assert_eq!(data, vec![2u8; 8]);
    assert_eq!(bridge.engine().call_count(), 3);

    bridge.shutdown().await;
}

#[tokio::test]
async fn datagram_longer_than_mtu_is_dropped_not_truncated() {
    let engine = ScriptedEngine::new().then(vec![Action::Echo]).then(vec![Action::Echo]);
    let bridge = TestBridge::new(engine).await;

    let manager = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    manager.send_to(&[0x30u8; 1600], bridge.addr()).await.unwrap();
    manager.send_to(&[0x31u8; 1500], bridge.addr()).await.unwrap();

    // only the second datagram comes back
    let (data, _) = recv(&manager).await;
    assert_eq!(data, vec![0x31u8; 1500]);

    let calls = bridge.engine().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].data.len(), 1500);

    let stats = bridge.shutdown().await;
    assert_eq!(stats.dropped_copy, 1);
    assert_eq!(stats.received, 1);
}

#[tokio::test]
async fn shutdown_completes_while_idle() {
    let bridge = TestBridge::new(ScriptedEngine::new()).await;
    timeout(WAIT, bridge.shutdown())
        .await
        .expect("receive loop did not stop");
}
