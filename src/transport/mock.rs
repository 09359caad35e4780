//! Mock socket for testing.
//!
//! Provides a programmable [`DatagramSocket`] that can simulate inbound
//! traffic, receive errors and short or failed sends without a network.

use super::DatagramSocket;
use bytes::Bytes;
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Something the mock hands out on the next receive.
#[derive(Clone, Debug)]
pub enum MockRecv {
    /// Deliver this datagram from this source.
    Datagram(Bytes, SocketAddr),
    /// Fill nothing but report this many bytes received.
    ReportedLen(usize, SocketAddr),
    /// Fail the receive.
    Error(io::ErrorKind),
}

/// How the mock answers the next send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendBehavior {
    /// Accept the whole datagram.
    Full,
    /// Report at most this many bytes sent.
    Short(usize),
    /// Fail the send.
    Error(io::ErrorKind),
}

/// A datagram passed to `send_to`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentDatagram {
    /// The bytes handed to the socket.
    pub data: Bytes,
    /// Destination address.
    pub target: SocketAddr,
}

struct MockSocketInner {
    local_addr: SocketAddr,
    inbound: VecDeque<MockRecv>,
    send_behavior: VecDeque<SendBehavior>,
    sent: Vec<SentDatagram>,
    send_calls: usize,
}

/// Mock datagram socket.
///
/// Clones share state, so a test keeps one clone to script traffic and
/// inspect sends while the transport owns the other. Receives wait until a
/// datagram is queued, like a real blocking socket.
///
/// # Example
///
/// ```rust
/// use snmp_bridge::transport::MockSocket;
///
/// let sock = MockSocket::new("0.0.0.0:161".parse().unwrap());
/// sock.push_datagram(vec![0x30, 0x00], "10.0.0.5:40000".parse().unwrap());
/// sock.short_next_send(10);
/// assert_eq!(sock.pending_inbound(), 1);
/// ```
#[derive(Clone)]
pub struct MockSocket {
    inner: Arc<Mutex<MockSocketInner>>,
    arrived: Arc<Notify>,
}

impl MockSocket {
    /// Create a mock bound to `local_addr`.
    pub fn new(local_addr: SocketAddr) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockSocketInner {
                local_addr,
                inbound: VecDeque::new(),
                send_behavior: VecDeque::new(),
                sent: Vec::new(),
                send_calls: 0,
            })),
            arrived: Arc::new(Notify::new()),
        }
    }

    fn push(&self, item: MockRecv) {
        self.inner.lock().unwrap().inbound.push_back(item);
        self.arrived.notify_one();
    }

    /// Queue an inbound datagram.
    pub fn push_datagram(&self, data: impl Into<Bytes>, source: SocketAddr) {
        self.push(MockRecv::Datagram(data.into(), source));
    }

    /// Queue a receive that reports `len` bytes without filling the buffer.
    pub fn push_reported_len(&self, len: usize, source: SocketAddr) {
        self.push(MockRecv::ReportedLen(len, source));
    }

    /// Queue a receive error.
    pub fn push_error(&self, kind: io::ErrorKind) {
        self.push(MockRecv::Error(kind));
    }

    /// Make the next send report only `n` bytes.
    pub fn short_next_send(&self, n: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.send_behavior.push_back(SendBehavior::Short(n));
    }

    /// Make the next send fail.
    pub fn fail_next_send(&self, kind: io::ErrorKind) {
        let mut inner = self.inner.lock().unwrap();
        inner.send_behavior.push_back(SendBehavior::Error(kind));
    }

    /// Datagrams passed to `send_to`, including failed ones.
    pub fn sent(&self) -> Vec<SentDatagram> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Number of `send_to` calls.
    pub fn send_calls(&self) -> usize {
        self.inner.lock().unwrap().send_calls
    }

    /// Inbound items not yet received.
    pub fn pending_inbound(&self) -> usize {
        self.inner.lock().unwrap().inbound.len()
    }
}

impl DatagramSocket for MockSocket {
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        loop {
            let next = self.inner.lock().unwrap().inbound.pop_front();
            match next {
                Some(MockRecv::Datagram(data, source)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    return Ok((n, source));
                }
                Some(MockRecv::ReportedLen(len, source)) => return Ok((len, source)),
                Some(MockRecv::Error(kind)) => return Err(io::Error::from(kind)),
                None => self.arrived.notified().await,
            }
        }
    }

    async fn send_to(&self, data: &[u8], target: SocketAddr) -> io::Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        inner.send_calls += 1;
        inner.sent.push(SentDatagram {
            data: Bytes::copy_from_slice(data),
            target,
        });
        match inner.send_behavior.pop_front().unwrap_or(SendBehavior::Full) {
            SendBehavior::Full => Ok(data.len()),
            SendBehavior::Short(n) => Ok(n.min(data.len())),
            SendBehavior::Error(kind) => Err(io::Error::from(kind)),
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.inner.lock().unwrap().local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn recv_waits_for_datagram() {
        let sock = MockSocket::new("0.0.0.0:161".parse().unwrap());
        let feeder = sock.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            feeder.push_datagram(&b"late"[..], "10.0.0.5:40000".parse().unwrap());
        });

        let mut buf = [0u8; 16];
        let (n, from) = sock.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"late");
        assert_eq!(from, "10.0.0.5:40000".parse().unwrap());
    }

    #[tokio::test]
    async fn send_behaviors_apply_in_order() {
        let sock = MockSocket::new("0.0.0.0:161".parse().unwrap());
        let target = "10.0.0.5:162".parse().unwrap();
        sock.short_next_send(2);
        sock.fail_next_send(io::ErrorKind::Other);

        assert_eq!(sock.send_to(b"abcd", target).await.unwrap(), 2);
        assert!(sock.send_to(b"abcd", target).await.is_err());
        assert_eq!(sock.send_to(b"abcd", target).await.unwrap(), 4);
        assert_eq!(sock.send_calls(), 3);
        assert_eq!(sock.sent()[0].data.as_ref(), b"abcd");
    }
}
