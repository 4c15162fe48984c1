//! End-to-end pipeline benchmarks against the simulated device.
//!
//! Measures the pricing engine in isolation, then the full worker-thread
//! path: simulated hardware fills the read ring, the mover drains it through
//! the reference strategy and packs orders into the write ring.
//!
//! Run with: cargo bench -p ironmover-bench --bench pipeline

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use ironmover_bench::latency::LatencyRecorder;
use ironmover_bench::workload::ResponseGenerator;
use ironmover_core::RING_SIZE;
use ironmover_device::{DeviceInterface, SimDevice};
use ironmover_engine::DataMover;
use ironmover_pricing::{HostPricingEngine, PricingStrategy};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Instant;

fn benchmark_pricing_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("pricing");
    group.throughput(Throughput::Elements(1));

    group.bench_function("changed_bid", |b| {
        let mut engine = HostPricingEngine::new();
        let mut generator = ResponseGenerator::new(8);
        b.iter(|| black_box(engine.process(black_box(&generator.next_response()))))
    });

    group.bench_function("unchanged_bid", |b| {
        let mut engine = HostPricingEngine::new();
        let response = ResponseGenerator::new(1).next_response();
        engine.process(&response);
        b.iter(|| black_box(engine.process(black_box(&response))))
    });

    group.finish();
}

fn running_mover(device: &Arc<SimDevice>) -> DataMover {
    let mut mover = DataMover::new(Box::new(HostPricingEngine::new()));
    mover
        .initialise(
            Arc::clone(device) as Arc<dyn DeviceInterface>,
            SimDevice::CU_NAME,
        )
        .unwrap();
    mover.start_processing_thread().unwrap();
    mover
}

fn benchmark_pipeline_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(1));
    group.sample_size(10);

    group.bench_function("sim_end_to_end", |b| {
        let device = Arc::new(SimDevice::new());
        let mover = running_mover(&device);
        let mut generator = ResponseGenerator::new(8);

        b.iter_custom(|iters| {
            let base_rx = mover.thread_stats().rx_responses;
            let begin = Instant::now();
            let mut sent = 0u64;
            while sent < iters {
                // Never lap the worker around the read ring.
                while sent - (mover.thread_stats().rx_responses - base_rx)
                    > u64::from(RING_SIZE) / 2
                {
                    std::hint::spin_loop();
                }
                device.hw_push_response(&generator.next_response()).unwrap();
                sent += 1;
                if sent % 64 == 0 {
                    device.hw_drain_operations().unwrap();
                }
            }
            while mover.thread_stats().rx_responses - base_rx < iters {
                std::hint::spin_loop();
            }
            let elapsed = begin.elapsed();
            device.hw_drain_operations().unwrap();
            elapsed
        })
    });

    group.finish();
}

fn benchmark_round_trip_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(1));
    group.sample_size(10);

    group.bench_function("sim_round_trip", |b| {
        let device = Arc::new(SimDevice::new());
        let mover = running_mover(&device);
        let mut generator = ResponseGenerator::new(8);
        let mut recorder = LatencyRecorder::new();

        b.iter_custom(|iters| {
            let begin = Instant::now();
            for _ in 0..iters {
                let rx_before = mover.thread_stats().rx_responses;
                let push = Instant::now();
                device.hw_push_response(&generator.next_response()).unwrap();
                while mover.thread_stats().rx_responses == rx_before {
                    std::hint::spin_loop();
                }
                recorder.record(push.elapsed());
                device.hw_drain_operations().unwrap();
            }
            begin.elapsed()
        });

        println!("sim_round_trip latency: {}", recorder.summary());
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_pricing_engine,
    benchmark_pipeline_throughput,
    benchmark_round_trip_latency,
);
criterion_main!(benches);
