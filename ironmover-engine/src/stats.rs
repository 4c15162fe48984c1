//! Instrumentation counters for the data mover.

use std::sync::atomic::{AtomicU64, Ordering};

/// DMA transfer statistics for one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DmaStats {
    /// Number of sync operations issued.
    pub total_sync_operations: u32,
    /// Number of times the transfer range wrapped past the ring boundary.
    pub buffer_wrap_arounds: u32,
    /// Largest number of bytes moved in a single sync.
    pub transfer_high_tide: u32,
    /// Cumulative bytes transferred.
    pub total_bytes_transferred: u64,
}

impl DmaStats {
    pub(crate) fn record_sync(&mut self, bytes: usize) {
        self.total_sync_operations += 1;
        self.total_bytes_transferred += bytes as u64;
        self.transfer_high_tide = self.transfer_high_tide.max(bytes as u32);
    }

    pub(crate) fn record_wrap(&mut self) {
        self.buffer_wrap_arounds += 1;
    }
}

/// Software worker-thread statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThreadStats {
    /// Responses drained from the read ring.
    pub rx_responses: u64,
    /// Operations written to the write ring.
    pub tx_operations: u64,
    /// I/O errors absorbed by the loop.
    pub io_errors: u64,
}

/// Lock-free backing store for [`ThreadStats`], shared between the worker
/// thread and control threads.
#[derive(Debug, Default)]
pub(crate) struct SharedThreadStats {
    rx_responses: AtomicU64,
    tx_operations: AtomicU64,
    io_errors: AtomicU64,
}

impl SharedThreadStats {
    pub(crate) fn record_rx(&self) {
        self.rx_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_tx(&self) {
        self.tx_operations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.io_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        self.rx_responses.store(0, Ordering::Relaxed);
        self.tx_operations.store(0, Ordering::Relaxed);
        self.io_errors.store(0, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ThreadStats {
        ThreadStats {
            rx_responses: self.rx_responses.load(Ordering::Relaxed),
            tx_operations: self.tx_operations.load(Ordering::Relaxed),
            io_errors: self.io_errors.load(Ordering::Relaxed),
        }
    }
}

/// Hardware-side event counters read back from the block's registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HwStats {
    /// Responses the hardware has written to the read ring.
    pub tx_response_count: u32,
    /// Operations the hardware has drained from the write ring.
    pub rx_operation_count: u32,
}

/// Hardware throttle counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThrottleStats {
    /// Current pacing counter value.
    pub throttle_counter: u32,
    /// Number of throttle events.
    pub throttle_events: u32,
}

/// Hardware round-trip latency counters, in clock cycles.
///
/// `cycles_pre` and `cycles_post` are auxiliary window counters passed
/// through from the hardware without interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LatencyStats {
    /// Minimum observed latency.
    pub min_cycles: u32,
    /// Maximum observed latency.
    pub max_cycles: u32,
    /// Sum of observed latencies.
    pub sum_cycles: u32,
    /// Number of observations.
    pub count: u32,
    /// Auxiliary pre-window cycle count.
    pub cycles_pre: u32,
    /// Auxiliary post-window cycle count.
    pub cycles_post: u32,
}

impl LatencyStats {
    /// Returns the mean observed latency in cycles, if any observations
    /// were made.
    #[must_use]
    pub fn mean_cycles(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(f64::from(self.sum_cycles) / f64::from(self.count))
        }
    }
}

/// Converts a clock-cycle count to nanoseconds at the given clock frequency.
#[must_use]
pub fn cycles_to_nanos(cycles: u64, clock_mhz: u32) -> u64 {
    if clock_mhz == 0 {
        return 0;
    }
    cycles * 1_000 / u64::from(clock_mhz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dma_stats_accumulate() {
        let mut stats = DmaStats::default();
        stats.record_sync(128);
        stats.record_sync(512);
        stats.record_sync(64);
        stats.record_wrap();

        assert_eq!(stats.total_sync_operations, 3);
        assert_eq!(stats.total_bytes_transferred, 704);
        assert_eq!(stats.transfer_high_tide, 512);
        assert_eq!(stats.buffer_wrap_arounds, 1);
    }

    #[test]
    fn test_shared_thread_stats_snapshot() {
        let shared = SharedThreadStats::default();
        shared.record_rx();
        shared.record_rx();
        shared.record_tx();
        shared.record_error();

        let snapshot = shared.snapshot();
        assert_eq!(snapshot.rx_responses, 2);
        assert_eq!(snapshot.tx_operations, 1);
        assert_eq!(snapshot.io_errors, 1);

        shared.reset();
        assert_eq!(shared.snapshot(), ThreadStats::default());
    }

    #[test]
    fn test_latency_mean() {
        let stats = LatencyStats {
            min_cycles: 10,
            max_cycles: 30,
            sum_cycles: 60,
            count: 3,
            ..Default::default()
        };
        assert_eq!(stats.mean_cycles(), Some(20.0));
        assert_eq!(LatencyStats::default().mean_cycles(), None);
    }

    #[test]
    fn test_cycles_to_nanos() {
        // 300 cycles at 300 MHz is one microsecond.
        assert_eq!(cycles_to_nanos(300, 300), 1_000);
        assert_eq!(cycles_to_nanos(1, 500), 2);
        assert_eq!(cycles_to_nanos(100, 0), 0);
    }
}
