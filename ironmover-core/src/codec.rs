//! Byte-exact wire codec for the hardware record layouts.
//!
//! Both record layouts are fixed and little-endian. The full field tables
//! are kept here, in one place, so the wire format can be reviewed and
//! tested independently of the transport.
//!
//! Order-book response record (128 bytes, read ring):
//!
//! | field           | offset | length |
//! |-----------------|--------|--------|
//! | ask quantity[5] | 0      | 20     |
//! | ask price[5]    | 20     | 20     |
//! | ask count[5]    | 40     | 20     |
//! | bid quantity[5] | 60     | 20     |
//! | bid price[5]    | 80     | 20     |
//! | bid count[5]    | 100    | 20     |
//! | symbol index    | 120    | 1      |
//! | timestamp       | 121    | 7      |
//!
//! Each five-element array is 5 x 4-byte little-endian integers, best level
//! first. The timestamp is the low 7 bytes of a nominal 64-bit value; the
//! top byte is implicitly zero.
//!
//! Order-entry operation record (23 packed bytes, write ring):
//!
//! | field        | offset | length |
//! |--------------|--------|--------|
//! | direction    | 0      | 1      |
//! | price        | 1      | 4      |
//! | quantity     | 5      | 4      |
//! | order id     | 9      | 4      |
//! | symbol index | 13     | 1      |
//! | opcode       | 14     | 1      |
//! | timestamp    | 15     | 8      |
//!
//! The codec cannot fail: out-of-range inputs are the caller's
//! responsibility to validate before packing.

use crate::types::{
    NUM_LEVELS, OpCode, OrderBookResponse, OrderEntryOperation, READ_ELEMENT_SIZE, Side,
    WRITE_ELEMENT_SIZE,
};

// Response record field offsets.
const RESP_ASK_QUANTITY: usize = 0;
const RESP_ASK_PRICE: usize = 20;
const RESP_ASK_COUNT: usize = 40;
const RESP_BID_QUANTITY: usize = 60;
const RESP_BID_PRICE: usize = 80;
const RESP_BID_COUNT: usize = 100;
const RESP_SYMBOL_INDEX: usize = 120;
const RESP_TIMESTAMP: usize = 121;
const RESP_TIMESTAMP_LEN: usize = 7;

// Operation record field offsets.
const OP_DIRECTION: usize = 0;
const OP_PRICE: usize = 1;
const OP_QUANTITY: usize = 5;
const OP_ORDER_ID: usize = 9;
const OP_SYMBOL_INDEX: usize = 13;
const OP_OPCODE: usize = 14;
const OP_TIMESTAMP: usize = 15;

#[inline]
fn get_u32_array(raw: &[u8], offset: usize) -> [u32; NUM_LEVELS] {
    let mut values = [0u32; NUM_LEVELS];
    for (i, value) in values.iter_mut().enumerate() {
        let at = offset + i * 4;
        *value = u32::from_le_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]]);
    }
    values
}

#[inline]
fn put_u32_array(raw: &mut [u8], offset: usize, values: &[u32; NUM_LEVELS]) {
    for (i, value) in values.iter().enumerate() {
        let at = offset + i * 4;
        raw[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }
}

/// Unpacks one raw read-ring element into an [`OrderBookResponse`].
#[must_use]
pub fn unpack_response(raw: &[u8; READ_ELEMENT_SIZE]) -> OrderBookResponse {
    let mut timestamp_bytes = [0u8; 8];
    timestamp_bytes[..RESP_TIMESTAMP_LEN]
        .copy_from_slice(&raw[RESP_TIMESTAMP..RESP_TIMESTAMP + RESP_TIMESTAMP_LEN]);

    OrderBookResponse {
        symbol_index: raw[RESP_SYMBOL_INDEX],
        timestamp: u64::from_le_bytes(timestamp_bytes),
        bid_count: get_u32_array(raw, RESP_BID_COUNT),
        bid_price: get_u32_array(raw, RESP_BID_PRICE),
        bid_quantity: get_u32_array(raw, RESP_BID_QUANTITY),
        ask_count: get_u32_array(raw, RESP_ASK_COUNT),
        ask_price: get_u32_array(raw, RESP_ASK_PRICE),
        ask_quantity: get_u32_array(raw, RESP_ASK_QUANTITY),
    }
}

/// Packs an [`OrderBookResponse`] into the raw read-ring element layout.
///
/// This is the exact inverse of [`unpack_response`]. The hardware is the
/// producer of response records in a live system; this direction exists for
/// the device emulation and codec symmetry tests. The top timestamp byte is
/// dropped, matching the 56-bit hardware field.
pub fn pack_response(response: &OrderBookResponse, raw: &mut [u8; READ_ELEMENT_SIZE]) {
    raw.fill(0);
    put_u32_array(raw, RESP_ASK_QUANTITY, &response.ask_quantity);
    put_u32_array(raw, RESP_ASK_PRICE, &response.ask_price);
    put_u32_array(raw, RESP_ASK_COUNT, &response.ask_count);
    put_u32_array(raw, RESP_BID_QUANTITY, &response.bid_quantity);
    put_u32_array(raw, RESP_BID_PRICE, &response.bid_price);
    put_u32_array(raw, RESP_BID_COUNT, &response.bid_count);
    raw[RESP_SYMBOL_INDEX] = response.symbol_index;
    raw[RESP_TIMESTAMP..RESP_TIMESTAMP + RESP_TIMESTAMP_LEN]
        .copy_from_slice(&response.timestamp.to_le_bytes()[..RESP_TIMESTAMP_LEN]);
}

/// Packs an [`OrderEntryOperation`] into the raw write-ring element layout.
///
/// Bytes beyond the 23-byte packed record are zero filler.
pub fn pack_operation(operation: &OrderEntryOperation, raw: &mut [u8; WRITE_ELEMENT_SIZE]) {
    raw.fill(0);
    raw[OP_DIRECTION] = operation.side.as_u8();
    raw[OP_PRICE..OP_PRICE + 4].copy_from_slice(&operation.price.to_le_bytes());
    raw[OP_QUANTITY..OP_QUANTITY + 4].copy_from_slice(&operation.quantity.to_le_bytes());
    raw[OP_ORDER_ID..OP_ORDER_ID + 4].copy_from_slice(&operation.order_id.to_le_bytes());
    raw[OP_SYMBOL_INDEX] = operation.symbol_index;
    raw[OP_OPCODE] = operation.op_code.as_u8();
    raw[OP_TIMESTAMP..OP_TIMESTAMP + 8].copy_from_slice(&operation.timestamp.to_le_bytes());
}

/// Unpacks a raw write-ring element back into an [`OrderEntryOperation`].
///
/// The hardware order-entry block is the consumer of operation records in a
/// live system; this direction exists for the device emulation and tests.
/// Returns `None` if the side or opcode byte is not a known encoding.
#[must_use]
pub fn unpack_operation(raw: &[u8; WRITE_ELEMENT_SIZE]) -> Option<OrderEntryOperation> {
    let side = Side::from_u8(raw[OP_DIRECTION])?;
    let op_code = OpCode::from_u8(raw[OP_OPCODE])?;

    Some(OrderEntryOperation {
        op_code,
        symbol_index: raw[OP_SYMBOL_INDEX],
        order_id: u32::from_le_bytes(raw[OP_ORDER_ID..OP_ORDER_ID + 4].try_into().ok()?),
        quantity: u32::from_le_bytes(raw[OP_QUANTITY..OP_QUANTITY + 4].try_into().ok()?),
        price: u32::from_le_bytes(raw[OP_PRICE..OP_PRICE + 4].try_into().ok()?),
        side,
        timestamp: u64::from_le_bytes(raw[OP_TIMESTAMP..OP_TIMESTAMP + 8].try_into().ok()?),
    })
}
