//! Example driving the full data mover pipeline against the simulated device.
//!
//! Run with: `cargo run --example sim_pipeline`

use ironmover::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Simulated market feed: a random-walk best bid per symbol.
struct Feed {
    bids: Vec<u32>,
    seed: u64,
    timestamp: u64,
}

impl Feed {
    fn new(symbols: usize) -> Self {
        Self {
            bids: (0..symbols).map(|i| 10_000 + i as u32 * 500).collect(),
            seed: 0x5EED_CAFE,
            timestamp: 0,
        }
    }

    fn next_response(&mut self) -> OrderBookResponse {
        // xorshift64 keeps the walk deterministic across runs.
        self.seed ^= self.seed << 13;
        self.seed ^= self.seed >> 7;
        self.seed ^= self.seed << 17;

        let symbol = (self.seed % self.bids.len() as u64) as usize;
        let tick = ((self.seed >> 8) % 5) as u32;
        if self.seed & 0x80 == 0 {
            self.bids[symbol] += tick;
        } else {
            self.bids[symbol] = self.bids[symbol].saturating_sub(tick);
        }
        self.timestamp += 1;

        let bid = self.bids[symbol];
        OrderBookResponse {
            symbol_index: symbol as u8,
            timestamp: self.timestamp,
            bid_count: [3, 2, 2, 1, 1],
            bid_price: [bid, bid - 10, bid - 20, bid - 30, bid - 40],
            bid_quantity: [500, 400, 300, 200, 100],
            ask_count: [3, 2, 2, 1, 1],
            ask_price: [bid + 10, bid + 20, bid + 30, bid + 40, bid + 50],
            ask_quantity: [500, 400, 300, 200, 100],
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let device = Arc::new(SimDevice::new());
    let mut mover = DataMover::new(Box::new(HostPricingEngine::new()));
    mover.initialise(
        Arc::clone(&device) as Arc<dyn DeviceInterface>,
        SimDevice::CU_NAME,
    )?;
    mover.setup_buffers_if_needed()?;

    println!(
        "Data mover bound to CU {} at {:#x}, kernel clock {} MHz",
        mover.cu_index()?,
        mover.cu_address()?,
        mover.clock_frequency_mhz()?
    );

    mover.start_hw_kernel()?;
    mover.start_latency_counters()?;
    mover.start_processing_thread()?;

    // Feed a burst of book updates through the simulated hardware, draining
    // the write ring as a real kernel would.
    let mut feed = Feed::new(8);
    let total = 5_000u64;
    let begin = Instant::now();
    let mut sent = 0u64;
    while sent < total {
        // Pace the producer so it never laps the worker around the ring.
        while sent - mover.thread_stats().rx_responses > u64::from(RING_SIZE) / 2 {
            std::thread::sleep(Duration::from_micros(50));
        }
        device.hw_push_response(&feed.next_response())?;
        sent += 1;
        if sent % 64 == 0 {
            device.hw_drain_operations()?;
        }
    }

    let deadline = Instant::now() + Duration::from_secs(10);
    while mover.thread_stats().rx_responses < total && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
    let elapsed = begin.elapsed();

    mover.stop_processing_thread();
    let drained = device.hw_drain_operations()?;

    let stats = mover.thread_stats();
    let (to_device, from_device) = mover.dma_stats();
    let hw = mover.hw_stats()?;

    println!(
        "Processed {} responses, emitted {} orders in {:.1} ms",
        stats.rx_responses,
        stats.tx_operations,
        elapsed.as_secs_f64() * 1_000.0
    );
    println!(
        "DMA from device: {} syncs, {} bytes, {} wraps",
        from_device.total_sync_operations,
        from_device.total_bytes_transferred,
        from_device.buffer_wrap_arounds
    );
    println!(
        "DMA to device:   {} syncs, {} bytes, {} wraps",
        to_device.total_sync_operations,
        to_device.total_bytes_transferred,
        to_device.buffer_wrap_arounds
    );
    println!(
        "Hardware: {} responses produced, {} operations consumed ({} left in ring)",
        hw.tx_response_count,
        hw.rx_operation_count,
        drained.len()
    );

    if let Some(last) = drained.last() {
        println!(
            "Last order: id={} symbol={} side={:?} price={} qty={}",
            last.order_id, last.symbol_index, last.side, last.price, last.quantity
        );
    }

    Ok(())
}
