//! # IronMover Bench
//!
//! Benchmarking utilities for IronMover performance testing.

pub mod latency;
pub mod workload;
