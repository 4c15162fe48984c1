//! # IronMover Pricing
//!
//! The pluggable pricing strategy interface consumed by the data mover, and
//! the reference top-of-book strategy used to validate the pipeline.

pub mod engine;

pub use engine::HostPricingEngine;

use ironmover_core::{OrderBookResponse, OrderEntryOperation};

/// A pricing strategy: consumes one order-book response and optionally
/// produces one order-entry operation.
///
/// Implementations run on the data mover's worker thread, so they must be
/// `Send`. Absence of an action is `None`, never an error.
pub trait PricingStrategy: Send {
    /// Processes one response, optionally producing an operation to
    /// transmit.
    fn process(&mut self, response: &OrderBookResponse) -> Option<OrderEntryOperation>;

    /// Enables or disables diagnostic tracing of responses and emitted
    /// operations.
    fn set_verbose_tracing(&mut self, enabled: bool);
}
