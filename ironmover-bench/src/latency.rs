//! Latency measurement utilities.

use hdrhistogram::Histogram;
use std::time::{Duration, Instant};

/// Records latency samples into an HDR histogram and reports percentiles.
///
/// Samples are kept in nanoseconds with three significant figures, which is
/// plenty for microsecond-scale round trips and keeps memory bounded no
/// matter how many samples are recorded.
pub struct LatencyRecorder {
    histogram: Histogram<u64>,
}

impl LatencyRecorder {
    /// Creates a recorder covering 1ns to 60s.
    #[must_use]
    pub fn new() -> Self {
        Self {
            // Bounds are compile-time valid, so construction cannot fail.
            histogram: Histogram::new_with_bounds(1, 60_000_000_000, 3)
                .expect("valid histogram bounds"),
        }
    }

    /// Records one latency sample. Values outside the histogram range are
    /// clamped rather than dropped.
    pub fn record(&mut self, latency: Duration) {
        let nanos = latency.as_nanos().min(u128::from(u64::MAX)) as u64;
        self.histogram.saturating_record(nanos.max(1));
    }

    /// Measures the latency of a function and records it.
    pub fn measure<F, T>(&mut self, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let start = Instant::now();
        let result = f();
        self.record(start.elapsed());
        result
    }

    /// Returns the latency at the given percentile.
    #[must_use]
    pub fn percentile(&self, percentile: f64) -> Duration {
        Duration::from_nanos(self.histogram.value_at_quantile(percentile / 100.0))
    }

    /// Returns the maximum recorded latency.
    #[must_use]
    pub fn max(&self) -> Duration {
        Duration::from_nanos(self.histogram.max())
    }

    /// Returns the number of recorded samples.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    /// Returns true if no samples have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    /// Clears all samples.
    pub fn clear(&mut self) {
        self.histogram.reset();
    }

    /// Returns a one-line percentile summary suitable for bench output.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "n={} p50={:?} p99={:?} p99.9={:?} max={:?}",
            self.len(),
            self.percentile(50.0),
            self.percentile(99.0),
            self.percentile(99.9),
            self.max(),
        )
    }
}

impl Default for LatencyRecorder {
    fn default() -> Self {
        Self::new()
    }
}
