//! Wraparound-safe ring index arithmetic.
//!
//! Each ring has [`RING_SIZE`](crate::types::RING_SIZE) elements. The
//! hardware advances one index, software advances the complementary one, and
//! the number of unconsumed elements is always
//! `(hw_tail - sw_cached_tail) mod RING_SIZE`. These are pure integer
//! operations with no I/O and no failure modes.

use crate::types::RING_SIZE;

/// Returns how many new elements are available between a previously observed
/// tail and the current tail, accounting for wraparound.
#[inline]
#[must_use]
pub fn pending_count(previous_tail: u32, current_tail: u32) -> u32 {
    if previous_tail == current_tail {
        0
    } else if previous_tail < current_tail {
        current_tail - previous_tail
    } else {
        // Ring has wrapped around.
        (RING_SIZE - previous_tail) + current_tail
    }
}

/// Returns the ring index of the element `offset` positions after `start`.
#[inline]
#[must_use]
pub fn element_index(start: u32, offset: u32) -> u32 {
    (start + offset) % RING_SIZE
}

/// Returns the byte offset of the element `offset` positions after `start`,
/// for a ring of elements of `element_size` bytes.
#[inline]
#[must_use]
pub fn element_offset(start: u32, offset: u32, element_size: usize) -> usize {
    element_index(start, offset) as usize * element_size
}
