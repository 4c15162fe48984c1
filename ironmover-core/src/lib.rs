//! # IronMover Core
//!
//! Core data-plane types for the IronMover FPGA order-book driver.
//!
//! This crate provides:
//! - Event structures exchanged with the hardware (`OrderBookResponse`,
//!   `OrderEntryOperation`)
//! - A byte-exact wire codec matching the hardware record layouts
//! - Wraparound-safe ring index arithmetic
//! - Error types shared across the driver crates

pub mod codec;
pub mod error;
pub mod ring;
pub mod types;

pub use codec::{pack_operation, pack_response, unpack_operation, unpack_response};
pub use error::{Error, Result};
pub use ring::{element_index, element_offset, pending_count};
pub use types::{
    NUM_LEVELS, NUM_SYMBOLS, OpCode, OrderBookResponse, OrderEntryOperation, READ_ELEMENT_SIZE,
    RING_SIZE, Side, WRITE_ELEMENT_SIZE,
};
