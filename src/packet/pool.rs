//! Budgeted packet pool and the chained packet buffer it hands out.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::{Bytes, BytesMut};
use smallvec::SmallVec;

use crate::error::{Error, Result};

/// Default size of one chain segment.
pub const DEFAULT_SEGMENT_SIZE: usize = 512;

struct PoolInner {
    budget: usize,
    in_use: AtomicUsize,
    segment_size: usize,
}

/// Fixed-budget allocator for [`PacketBuf`]s.
///
/// Models the device's packet memory: the pool never hands out more than
/// `budget` bytes at once. Every buffer returns its bytes when dropped, so
/// a dropped datagram on any early-exit path frees its memory.
///
/// Cloning is cheap and shares the same budget.
///
/// # Example
///
/// ```rust
/// use snmp_bridge::packet::PacketPool;
///
/// let pool = PacketPool::new(1024, 256);
/// let pkt = pool.alloc_from(&[0x30, 0x03, 0x02, 0x01, 0x00]).unwrap();
/// assert_eq!(pkt.len(), 5);
/// assert_eq!(pool.in_use(), 5);
/// drop(pkt);
/// assert_eq!(pool.in_use(), 0);
/// ```
#[derive(Clone)]
pub struct PacketPool {
    inner: Arc<PoolInner>,
}

impl PacketPool {
    /// Create a pool holding at most `budget` bytes, split into segments of
    /// at most `segment_size` bytes.
    pub fn new(budget: usize, segment_size: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                budget,
                in_use: AtomicUsize::new(0),
                segment_size: segment_size.max(1),
            }),
        }
    }

    /// Allocate a zero-filled buffer of exactly `len` bytes.
    ///
    /// The buffer's declared length is `len`; there is no slack capacity to
    /// shrink later. Fails with [`Error::Allocation`] when the budget cannot
    /// cover the request.
    pub fn alloc(&self, len: usize) -> Result<PacketBuf> {
        let reserved = self
            .inner
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(len).filter(|n| *n <= self.inner.budget)
            });

        if let Err(used) = reserved {
            return Err(Error::Allocation {
                requested: len,
                available: self.inner.budget.saturating_sub(used),
            }
            .boxed());
        }

        let seg = self.inner.segment_size;
        let mut segments = SmallVec::new();
        let mut remaining = len;
        while remaining > 0 {
            let n = remaining.min(seg);
            segments.push(BytesMut::zeroed(n));
            remaining -= n;
        }

        Ok(PacketBuf {
            segments,
            len,
            _lease: Lease {
                pool: self.inner.clone(),
                bytes: len,
            },
        })
    }

    /// Allocate a buffer sized to `data` and copy `data` into it.
    pub fn alloc_from(&self, data: &[u8]) -> Result<PacketBuf> {
        let mut pkt = self.alloc(data.len())?;
        pkt.take(data)?;
        Ok(pkt)
    }

    /// Total bytes this pool may hand out.
    pub fn budget(&self) -> usize {
        self.inner.budget
    }

    /// Bytes currently held by live buffers.
    pub fn in_use(&self) -> usize {
        self.inner.in_use.load(Ordering::Acquire)
    }

    /// Bytes still available for allocation.
    pub fn available(&self) -> usize {
        self.inner.budget.saturating_sub(self.in_use())
    }

    /// Maximum size of one chain segment.
    pub fn segment_size(&self) -> usize {
        self.inner.segment_size
    }
}

impl std::fmt::Debug for PacketPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketPool")
            .field("budget", &self.inner.budget)
            .field("in_use", &self.in_use())
            .field("segment_size", &self.inner.segment_size)
            .finish()
    }
}

/// Returns reserved bytes to the pool when the buffer goes away.
struct Lease {
    pool: Arc<PoolInner>,
    bytes: usize,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.pool.in_use.fetch_sub(self.bytes, Ordering::AcqRel);
    }
}

/// Chained packet buffer handed between the transport and the engine.
///
/// The payload is held in one or more segments whose total length is the
/// declared length. Allocation is exact, so `len()` is both the capacity and
/// the payload size.
pub struct PacketBuf {
    segments: SmallVec<[BytesMut; 4]>,
    len: usize,
    _lease: Lease,
}

impl PacketBuf {
    /// Declared total length.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer carries no payload.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of segments in the chain.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Iterate over the chain segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &[u8]> {
        self.segments.iter().map(|s| s.as_ref())
    }

    /// Copy `data` into the chain.
    ///
    /// `data` must be exactly as long as the declared length; anything else
    /// is a [`Error::ShortCopy`].
    pub fn take(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != self.len {
            return Err(Error::ShortCopy {
                expected: self.len,
                copied: data.len(),
            }
            .boxed());
        }

        let mut copied = 0;
        for seg in self.segments.iter_mut() {
            let n = seg.len().min(data.len() - copied);
            seg[..n].copy_from_slice(&data[copied..copied + n]);
            copied += n;
        }

        if copied != self.len {
            return Err(Error::ShortCopy {
                expected: self.len,
                copied,
            }
            .boxed());
        }
        Ok(())
    }

    /// Copy payload bytes starting at `offset` into `dst`.
    ///
    /// Returns the number of bytes copied, which is less than `dst.len()`
    /// when the chain runs out first.
    pub fn copy_to(&self, dst: &mut [u8], offset: usize) -> usize {
        let mut skip = offset;
        let mut copied = 0;

        for seg in &self.segments {
            if copied == dst.len() {
                break;
            }
            if skip >= seg.len() {
                skip -= seg.len();
                continue;
            }
            let src = &seg[skip..];
            skip = 0;
            let n = src.len().min(dst.len() - copied);
            dst[copied..copied + n].copy_from_slice(&src[..n]);
            copied += n;
        }
        copied
    }

    /// Flatten the chain into a contiguous `Bytes`.
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.len);
        for seg in &self.segments {
            out.extend_from_slice(seg);
        }
        out.freeze()
    }

    /// Override the declared length without touching the chain.
    #[cfg(test)]
    pub(crate) fn force_declared_len(&mut self, len: usize) {
        self.len = len;
    }
}

impl std::fmt::Debug for PacketBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketBuf")
            .field("len", &self.len)
            .field("segments", &self.segments.len())
            .finish()
    }
}
