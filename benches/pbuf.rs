//! Packet buffer adapter benchmarks.
//!
//! Chains are built from `SmallVec<[BytesMut; 4]>`, so payloads up to four
//! segments keep the chain inline. These benchmarks measure the inbound copy
//! (scratch to fresh chain) and the outbound flatten (chain to scratch)
//! across that threshold.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use snmp_bridge::packet::{self, DEFAULT_SEGMENT_SIZE, MAX_TRANSPORT_UNIT};
use snmp_bridge::PacketPool;

const SIZES: [usize; 5] = [64, 484, 512, 1024, 1500];

/// Benchmark adapting a received datagram into a chain
fn bench_inbound(c: &mut Criterion) {
    let mut group = c.benchmark_group("pbuf_inbound");
    let pool = PacketPool::new(4 * MAX_TRANSPORT_UNIT, DEFAULT_SEGMENT_SIZE);

    for len in SIZES {
        let data = vec![0x30u8; len];
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::new("copy", len), &data, |b, data| {
            b.iter(|| black_box(packet::inbound(&pool, data, MAX_TRANSPORT_UNIT).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark flattening a chain for transmission
fn bench_outbound(c: &mut Criterion) {
    let mut group = c.benchmark_group("pbuf_outbound");
    let pool = PacketPool::new(4 * MAX_TRANSPORT_UNIT, DEFAULT_SEGMENT_SIZE);
    let mut scratch = vec![0u8; MAX_TRANSPORT_UNIT];

    for len in SIZES {
        let pkt = pool.alloc_from(&vec![0x30u8; len]).unwrap();
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::new("flatten", len), &pkt, |b, pkt| {
            b.iter(|| black_box(packet::outbound(pkt, &mut scratch).unwrap().len()))
        });
    }

    group.finish();
}

/// Benchmark segment size effect on a full-size datagram
fn bench_segment_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("pbuf_segment_size");
    let data = vec![0x30u8; MAX_TRANSPORT_UNIT];

    for seg in [128, 256, 512, 1500] {
        let pool = PacketPool::new(4 * MAX_TRANSPORT_UNIT, seg);
        group.bench_with_input(BenchmarkId::new("inbound", seg), &data, |b, data| {
            b.iter(|| black_box(packet::inbound(&pool, data, MAX_TRANSPORT_UNIT).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_inbound, bench_outbound, bench_segment_size);
criterion_main!(benches);
