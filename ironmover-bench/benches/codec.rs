//! Wire codec benchmarks.
//!
//! Run with: cargo bench -p ironmover-bench --bench codec

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use ironmover_bench::workload::sample_response;
use ironmover_core::{
    OpCode, OrderEntryOperation, READ_ELEMENT_SIZE, Side, WRITE_ELEMENT_SIZE, codec,
};
use std::hint::black_box;

fn sample_operation() -> OrderEntryOperation {
    OrderEntryOperation {
        op_code: OpCode::Add,
        symbol_index: 42,
        order_id: 1_000_001,
        quantity: 800,
        price: 25_100,
        side: Side::Bid,
        timestamp: 0x00AB_CDEF_0123_4567,
    }
}

fn benchmark_response_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("response");
    group.throughput(Throughput::Bytes(READ_ELEMENT_SIZE as u64));

    let response = sample_response();
    let mut raw = [0u8; READ_ELEMENT_SIZE];
    codec::pack_response(&response, &mut raw);

    group.bench_function("unpack", |b| {
        b.iter(|| black_box(codec::unpack_response(black_box(&raw))))
    });

    group.bench_function("pack", |b| {
        let mut out = [0u8; READ_ELEMENT_SIZE];
        b.iter(|| {
            codec::pack_response(black_box(&response), &mut out);
        })
    });

    group.finish();
}

fn benchmark_operation_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("operation");
    group.throughput(Throughput::Bytes(WRITE_ELEMENT_SIZE as u64));

    let operation = sample_operation();
    let mut raw = [0u8; WRITE_ELEMENT_SIZE];
    codec::pack_operation(&operation, &mut raw);

    group.bench_function("pack", |b| {
        let mut out = [0u8; WRITE_ELEMENT_SIZE];
        b.iter(|| {
            codec::pack_operation(black_box(&operation), &mut out);
        })
    });

    group.bench_function("unpack", |b| {
        b.iter(|| black_box(codec::unpack_operation(black_box(&raw))))
    });

    group.finish();
}

fn benchmark_ring_arithmetic(c: &mut Criterion) {
    use ironmover_core::ring;

    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(1));

    group.bench_function("pending_count", |b| {
        b.iter(|| black_box(ring::pending_count(black_box(1020), black_box(4))))
    });

    group.bench_function("element_offset", |b| {
        b.iter(|| {
            black_box(ring::element_offset(
                black_box(1020),
                black_box(7),
                READ_ELEMENT_SIZE,
            ))
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_response_codec,
    benchmark_operation_codec,
    benchmark_ring_arithmetic,
);
criterion_main!(benches);
