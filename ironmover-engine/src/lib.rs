//! # IronMover Engine
//!
//! The data mover orchestrator: owns both ring buffers and the worker
//! thread, and exposes the control, status and instrumentation surface of
//! the order-book data mover hardware block.
//!
//! The worker thread polls the hardware-to-software read ring, runs each
//! order-book response through a pluggable pricing strategy, and packs any
//! resulting order instruction into the software-to-hardware write ring.

pub mod mover;
pub mod stats;

mod worker;

pub use mover::{DataMover, MoverState};
pub use stats::{DmaStats, HwStats, LatencyStats, ThreadStats, ThrottleStats, cycles_to_nanos};
