//! Deterministic order-book workloads for benchmarks.

use ironmover_core::OrderBookResponse;

/// Deterministic stream of order-book responses driven by a random walk.
///
/// Every generator with the same symbol count produces the same sequence, so
/// bench runs are comparable across machines and commits.
pub struct ResponseGenerator {
    bids: Vec<u32>,
    state: u64,
    timestamp: u64,
}

impl ResponseGenerator {
    /// Creates a generator walking `symbols` independent books.
    ///
    /// # Panics
    /// Panics if `symbols` is zero.
    #[must_use]
    pub fn new(symbols: usize) -> Self {
        Self::with_base_bid(symbols, 20_000)
    }

    /// Creates a generator whose first symbol starts at `base_bid`.
    ///
    /// # Panics
    /// Panics if `symbols` is zero.
    #[must_use]
    pub fn with_base_bid(symbols: usize, base_bid: u32) -> Self {
        assert!(symbols > 0, "generator needs at least one symbol");
        Self {
            bids: (0..symbols).map(|i| base_bid + i as u32 * 1_000).collect(),
            state: 0x9E37_79B9_7F4A_7C15,
            timestamp: 0,
        }
    }

    fn next_u64(&mut self) -> u64 {
        // xorshift64
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    /// Produces the next response in the walk. The best bid moves by up to
    /// four ticks in either direction, so most responses trigger the
    /// reference pricing engine.
    pub fn next_response(&mut self) -> OrderBookResponse {
        let r = self.next_u64();
        let symbol = (r % self.bids.len() as u64) as usize;
        let tick = ((r >> 8) % 5) as u32;
        if r & 0x100 == 0 {
            self.bids[symbol] += tick;
        } else {
            self.bids[symbol] = self.bids[symbol].saturating_sub(tick);
        }
        self.timestamp += 1;

        let bid = self.bids[symbol];
        // Deep bid levels saturate at zero when the walk drives a book low.
        OrderBookResponse {
            symbol_index: symbol as u8,
            timestamp: self.timestamp,
            bid_count: [4, 3, 2, 2, 1],
            bid_price: [
                bid,
                bid.saturating_sub(5),
                bid.saturating_sub(10),
                bid.saturating_sub(15),
                bid.saturating_sub(20),
            ],
            bid_quantity: [600, 500, 400, 300, 200],
            ask_count: [4, 3, 2, 2, 1],
            ask_price: [bid + 5, bid + 10, bid + 15, bid + 20, bid + 25],
            ask_quantity: [600, 500, 400, 300, 200],
        }
    }
}

/// Returns a fixed response, for codec benchmarks where content is
/// irrelevant but should not be all zeros.
#[must_use]
pub fn sample_response() -> OrderBookResponse {
    OrderBookResponse {
        symbol_index: 42,
        timestamp: 0x00AB_CDEF_0123_4567,
        bid_count: [4, 3, 2, 2, 1],
        bid_price: [25_000, 24_995, 24_990, 24_985, 24_980],
        bid_quantity: [600, 500, 400, 300, 200],
        ask_count: [4, 3, 2, 2, 1],
        ask_price: [25_005, 25_010, 25_015, 25_020, 25_025],
        ask_quantity: [600, 500, 400, 300, 200],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_is_deterministic() {
        let mut a = ResponseGenerator::new(8);
        let mut b = ResponseGenerator::new(8);
        for _ in 0..100 {
            assert_eq!(a.next_response(), b.next_response());
        }
    }

    #[test]
    fn test_generator_moves_prices() {
        let mut generator = ResponseGenerator::new(4);
        let first = generator.next_response();
        let moved = (0..1_000)
            .map(|_| generator.next_response())
            .any(|r| r.symbol_index == first.symbol_index && r.best_bid() != first.best_bid());
        assert!(moved);
    }

    #[test]
    #[should_panic(expected = "at least one symbol")]
    fn test_zero_symbols_rejected() {
        let _ = ResponseGenerator::new(0);
    }

    #[test]
    fn test_low_books_saturate_instead_of_underflowing() {
        let mut generator = ResponseGenerator::with_base_bid(1, 2);
        for _ in 0..10_000 {
            let response = generator.next_response();
            // Levels stay ordered best-first all the way down to zero.
            assert!(
                response
                    .bid_price
                    .windows(2)
                    .all(|pair| pair[0] >= pair[1])
            );
        }
    }

    #[test]
    fn test_timestamps_increase() {
        let mut generator = ResponseGenerator::new(4);
        let t1 = generator.next_response().timestamp;
        let t2 = generator.next_response().timestamp;
        assert!(t2 > t1);
    }
}
