//! Event structures exchanged with the hardware order-book pipeline.
//!
//! The hardware maintains the order book and emits one [`OrderBookResponse`]
//! per book-affecting event into the read ring; the host answers with zero or
//! one [`OrderEntryOperation`] per response into the write ring.

/// Number of elements in each hardware/software ring.
///
/// Not required to be a power of two; all index arithmetic is modulo.
pub const RING_SIZE: u32 = 1024;

/// Size in bytes of one read-ring element (order-book response record).
pub const READ_ELEMENT_SIZE: usize = 128;

/// Size in bytes of one write-ring element (order-entry operation record).
///
/// The packed operation occupies the first 23 bytes; the remainder is zero
/// filler the hardware never reads.
pub const WRITE_ELEMENT_SIZE: usize = 32;

/// Number of price levels carried per side of a response.
pub const NUM_LEVELS: usize = 5;

/// Number of symbols addressable by the 8-bit symbol index.
pub const NUM_SYMBOLS: usize = 256;

/// Order side (direction) of an order-entry operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    /// Bid (buy) side.
    Bid = 0,
    /// Ask (sell) side.
    Ask = 1,
}

impl Side {
    /// Returns the hardware encoding of this side.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parses a side from its hardware encoding.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Bid),
            1 => Some(Self::Ask),
            _ => None,
        }
    }
}

/// Operation code of an order-entry operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Add a new order.
    Add = 0,
    /// Modify an existing order.
    Modify = 1,
    /// Delete an existing order.
    Delete = 2,
}

impl OpCode {
    /// Returns the hardware encoding of this opcode.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parses an opcode from its hardware encoding.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Add),
            1 => Some(Self::Modify),
            2 => Some(Self::Delete),
            _ => None,
        }
    }
}

/// One order-book snapshot element from the read ring.
///
/// Prices are integers with 2 implied decimal places. Level 0 is the best
/// level on each side. The hardware timestamp is 56 bits wide; the top byte
/// of the 64-bit field is always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderBookResponse {
    /// Symbol index (0-255).
    pub symbol_index: u8,
    /// Hardware timestamp (56 significant bits).
    pub timestamp: u64,
    /// Order count per bid level, best level first.
    pub bid_count: [u32; NUM_LEVELS],
    /// Price per bid level, best level first.
    pub bid_price: [u32; NUM_LEVELS],
    /// Quantity per bid level, best level first.
    pub bid_quantity: [u32; NUM_LEVELS],
    /// Order count per ask level, best level first.
    pub ask_count: [u32; NUM_LEVELS],
    /// Price per ask level, best level first.
    pub ask_price: [u32; NUM_LEVELS],
    /// Quantity per ask level, best level first.
    pub ask_quantity: [u32; NUM_LEVELS],
}

impl OrderBookResponse {
    /// Returns the best (highest) bid price.
    #[inline]
    #[must_use]
    pub const fn best_bid(&self) -> u32 {
        self.bid_price[0]
    }

    /// Returns the best (lowest) ask price.
    #[inline]
    #[must_use]
    pub const fn best_ask(&self) -> u32 {
        self.ask_price[0]
    }
}

/// One order instruction element for the write ring.
///
/// Created by a pricing strategy, owned by the orchestrator until packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderEntryOperation {
    /// Operation code.
    pub op_code: OpCode,
    /// Symbol index (0-255).
    pub symbol_index: u8,
    /// Strategy-assigned order identifier, monotonically increasing from 1.
    pub order_id: u32,
    /// Order quantity.
    pub quantity: u32,
    /// Order price (2 implied decimal places).
    pub price: u32,
    /// Order side.
    pub side: Side,
    /// Timestamp copied from the triggering response.
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_round_trip() {
        assert_eq!(Side::from_u8(Side::Bid.as_u8()), Some(Side::Bid));
        assert_eq!(Side::from_u8(Side::Ask.as_u8()), Some(Side::Ask));
        assert_eq!(Side::from_u8(2), None);
    }

    #[test]
    fn test_opcode_round_trip() {
        assert_eq!(OpCode::from_u8(0), Some(OpCode::Add));
        assert_eq!(OpCode::from_u8(1), Some(OpCode::Modify));
        assert_eq!(OpCode::from_u8(2), Some(OpCode::Delete));
        assert_eq!(OpCode::from_u8(3), None);
    }

    #[test]
    fn test_best_levels() {
        let response = OrderBookResponse {
            bid_price: [10000, 9990, 9980, 9970, 9960],
            ask_price: [10010, 10020, 10030, 10040, 10050],
            ..Default::default()
        };
        assert_eq!(response.best_bid(), 10000);
        assert_eq!(response.best_ask(), 10010);
    }

    #[test]
    fn test_write_element_holds_packed_record() {
        // 23 packed bytes must fit with room for filler.
        assert!(WRITE_ELEMENT_SIZE >= 23);
    }
}
