//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits.
//!
//! ```
//! use ironmover::prelude::*;
//! ```

// Core types
pub use ironmover_core::{
    Error, OpCode, OrderBookResponse, OrderEntryOperation, Result, Side,
    NUM_LEVELS, NUM_SYMBOLS, READ_ELEMENT_SIZE, RING_SIZE, WRITE_ELEMENT_SIZE,
};

// Device types
pub use ironmover_device::{
    BufferHandle, ComputeUnitInfo, DeviceInterface, MemoryBank, SimDevice, SyncDirection,
};

// Pricing types
pub use ironmover_pricing::{HostPricingEngine, PricingStrategy};

// Engine types
pub use ironmover_engine::{
    DataMover, DmaStats, HwStats, LatencyStats, MoverState, ThreadStats, ThrottleStats,
    cycles_to_nanos,
};
