//! # IronMover
//!
//! Host-side driver for an FPGA order-book trading pipeline.
//!
//! The hardware maintains the order book and streams one response record per
//! book-affecting event into a DMA ring buffer. IronMover drains that ring on
//! a dedicated thread, runs each response through a pluggable pricing
//! strategy, and packs any resulting order instruction into the return ring
//! the hardware drains.
//!
//! ## Quick Start
//!
//! ```
//! use ironmover::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> ironmover::core::Result<()> {
//! let device = Arc::new(SimDevice::new());
//! let mut mover = DataMover::new(Box::new(HostPricingEngine::new()));
//! mover.initialise(Arc::clone(&device) as Arc<dyn DeviceInterface>, SimDevice::CU_NAME)?;
//! mover.start_processing_thread()?;
//! // ... hardware fills the read ring, orders appear in the write ring ...
//! mover.stop_processing_thread();
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`] - Event structures, binary codec, ring index arithmetic
//! - [`device`] - Device access trait, register map, software emulation
//! - [`pricing`] - Pricing strategy trait and the reference engine
//! - [`engine`] - The data mover orchestrator and worker thread

pub mod prelude;

/// Event structures, binary codec and ring arithmetic.
pub mod core {
    pub use ironmover_core::*;
}

/// Device access port, register map and software emulation.
pub mod device {
    pub use ironmover_device::*;
}

/// Pricing strategies.
pub mod pricing {
    pub use ironmover_pricing::*;
}

/// The data mover orchestrator.
pub mod engine {
    pub use ironmover_engine::*;
}

// Re-export commonly used items at the crate root
pub use ironmover_core::{
    Error, OpCode, OrderBookResponse, OrderEntryOperation, Result, Side,
};

pub use ironmover_device::{DeviceInterface, MemoryBank, SimDevice};
pub use ironmover_engine::{DataMover, MoverState};
pub use ironmover_pricing::{HostPricingEngine, PricingStrategy};
