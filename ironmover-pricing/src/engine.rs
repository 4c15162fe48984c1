//! Reference host pricing engine.
//!
//! A deterministic, intentionally naive strategy used to exercise the
//! surrounding pipeline: whenever the best bid for a symbol changes, emit an
//! ADD order on the bid side slightly above it. Not a production trading
//! strategy.

use crate::PricingStrategy;
use ironmover_core::{NUM_SYMBOLS, OpCode, OrderBookResponse, OrderEntryOperation, Side};

/// Price increment applied above the observed best bid.
const PRICE_OFFSET: u32 = 100;

/// Fixed quantity of every emitted order.
const ORDER_QUANTITY: u32 = 800;

/// Last observed top-of-book prices for one symbol.
#[derive(Debug, Clone, Copy, Default)]
struct TopOfBook {
    bid_price: u32,
    ask_price: u32,
    valid: bool,
}

/// Reference top-of-book pricing strategy.
///
/// Maintains a per-symbol cache of the last observed best bid and ask. On
/// each response, if the best bid differs from the cached value, emits an
/// ADD on the bid side at `best_bid + 100` with quantity 800 and a
/// monotonically increasing order id starting at 1. The cache is updated
/// unconditionally, whether or not an order was emitted.
pub struct HostPricingEngine {
    cache: Box<[TopOfBook; NUM_SYMBOLS]>,
    next_order_id: u32,
    verbose_tracing: bool,
    require_valid_cache: bool,
}

impl HostPricingEngine {
    /// Creates a new engine with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Box::new([TopOfBook::default(); NUM_SYMBOLS]),
            next_order_id: 1,
            verbose_tracing: false,
            require_valid_cache: false,
        }
    }

    /// Controls whether a cold cache entry suppresses the first order for a
    /// symbol.
    ///
    /// The hardware reference behavior emits an order on the very first
    /// response per symbol (the validity gate exists but is not applied);
    /// enabling this flag applies the gate, so a symbol's first response
    /// only primes the cache.
    pub fn set_require_valid_cache(&mut self, enabled: bool) {
        self.require_valid_cache = enabled;
    }

    /// Returns the order id that will be assigned to the next emitted
    /// operation.
    #[must_use]
    pub fn next_order_id(&self) -> u32 {
        self.next_order_id
    }
}

impl Default for HostPricingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingStrategy for HostPricingEngine {
    fn process(&mut self, response: &OrderBookResponse) -> Option<OrderEntryOperation> {
        let symbol = response.symbol_index as usize;
        let entry = &mut self.cache[symbol];

        if self.verbose_tracing {
            tracing::debug!(
                symbol = response.symbol_index,
                bid_count = response.bid_count[0],
                bid_price = response.bid_price[0],
                bid_quantity = response.bid_quantity[0],
                ask_count = response.ask_count[0],
                ask_price = response.ask_price[0],
                ask_quantity = response.ask_quantity[0],
                "pricing response"
            );
        }

        let mut operation = None;
        let gate_open = entry.valid || !self.require_valid_cache;

        if gate_open && entry.bid_price != response.best_bid() {
            let emitted = OrderEntryOperation {
                op_code: OpCode::Add,
                symbol_index: response.symbol_index,
                order_id: self.next_order_id,
                quantity: ORDER_QUANTITY,
                price: response.best_bid() + PRICE_OFFSET,
                side: Side::Bid,
                timestamp: response.timestamp,
            };
            self.next_order_id += 1;

            if self.verbose_tracing {
                tracing::debug!(
                    op_code = emitted.op_code.as_u8(),
                    symbol = emitted.symbol_index,
                    order_id = emitted.order_id,
                    quantity = emitted.quantity,
                    price = emitted.price,
                    side = emitted.side.as_u8(),
                    "pricing operation"
                );
            }
            operation = Some(emitted);
        }

        // Cache top-of-book prices; used as the trigger on the next delta.
        entry.bid_price = response.best_bid();
        entry.ask_price = response.best_ask();
        entry.valid = true;

        operation
    }

    fn set_verbose_tracing(&mut self, enabled: bool) {
        self.verbose_tracing = enabled;
    }
}
