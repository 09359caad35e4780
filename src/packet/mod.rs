//! Packet buffers and the adapter between chained buffers and flat datagrams.
//!
//! The engine works on [`PacketBuf`], a chain of segments allocated from a
//! budgeted [`PacketPool`]. Sockets work on one contiguous slice. The two
//! adapter functions move bytes between the models and enforce that the
//! declared length always equals the number of bytes moved.

mod pool;

pub use pool::{DEFAULT_SEGMENT_SIZE, PacketBuf, PacketPool};

use crate::error::{Error, Result};

/// Largest payload carried in one datagram.
pub const MAX_TRANSPORT_UNIT: usize = 1500;

/// Adapt a received datagram into a freshly allocated chain.
///
/// The chain is allocated for exactly `payload.len()` bytes. Payloads larger
/// than `mtu` are rejected before touching the pool.
pub fn inbound(pool: &PacketPool, payload: &[u8], mtu: usize) -> Result<PacketBuf> {
    if payload.len() > mtu {
        return Err(Error::Oversized {
            len: payload.len(),
            max: mtu,
        }
        .boxed());
    }

    let mut pkt = pool.alloc(payload.len())?;
    pkt.take(payload)?;
    Ok(pkt)
}

/// Flatten an outbound chain into `scratch`.
///
/// `scratch` is the whole flat region, so its length is the transport unit.
/// Returns the prefix of `scratch` holding exactly `packet.len()` bytes.
pub fn outbound<'s>(packet: &PacketBuf, scratch: &'s mut [u8]) -> Result<&'s [u8]> {
    let len = packet.len();
    if len > scratch.len() {
        return Err(Error::Oversized {
            len,
            max: scratch.len(),
        }
        .boxed());
    }

    let copied = packet.copy_to(&mut scratch[..len], 0);
    if copied != len {
        return Err(Error::ShortCopy {
            expected: len,
            copied,
        }
        .boxed());
    }
    Ok(&scratch[..len])
}
