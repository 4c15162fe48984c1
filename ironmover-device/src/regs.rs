//! Register address map of the order-book data mover hardware block.
//!
//! All offsets are relative to the compute unit's base address.

/// Standard kernel control register (ap_ctrl protocol).
pub const KERNEL_CONTROL: u64 = 0x0000_0000;
/// Global interrupt enable.
pub const KERNEL_GLOBAL_INTERRUPT_ENABLE: u64 = 0x0000_0004;
/// IP interrupt enable.
pub const KERNEL_IP_INTERRUPT_ENABLE: u64 = 0x0000_0008;
/// IP interrupt status.
pub const KERNEL_IP_INTERRUPT_STATUS: u64 = 0x0000_000C;

/// Data mover control register.
pub const CTRL: u64 = 0x0000_0010;
/// Read-ring head index (software-consumed position, written by software).
pub const RING_READ_BUFFER_HEAD_INDEX: u64 = 0x0000_0018;
/// Write-ring tail index (next-free position, written by software).
pub const RING_WRITE_BUFFER_TAIL_INDEX: u64 = 0x0000_0020;
/// Hardware throttle rate in clock cycles.
pub const THROTTLE_RATE: u64 = 0x0000_0028;

/// Data mover status register.
pub const STATUS: u64 = 0x0000_0050;
/// Read-ring tail index (newest element, written by hardware).
pub const RING_READ_BUFFER_TAIL_INDEX: u64 = 0x0000_0058;
/// Count of responses the hardware has written to the read ring.
pub const TX_RESPONSE_INDEX: u64 = 0x0000_0068;
/// Write-ring head index (hardware-consumed position, written by hardware).
pub const RING_WRITE_BUFFER_HEAD_INDEX: u64 = 0x0000_0078;
/// Count of operations the hardware has drained from the write ring.
pub const NUM_RX_OP: u64 = 0x0000_0088;

/// Minimum observed round-trip latency in clock cycles.
pub const LATENCY_MIN: u64 = 0x0000_0098;
/// Maximum observed round-trip latency in clock cycles.
pub const LATENCY_MAX: u64 = 0x0000_00A8;
/// Sum of observed round-trip latencies in clock cycles.
pub const LATENCY_SUM: u64 = 0x0000_00B8;
/// Count of observed round-trip latencies.
pub const LATENCY_CNT: u64 = 0x0000_00C8;
/// Auxiliary pre-window cycle count (opaque pass-through).
pub const CYCLES_PRE: u64 = 0x0000_00D8;
/// Auxiliary post-window cycle count (opaque pass-through).
pub const CYCLES_POST: u64 = 0x0000_00E8;

/// Throttle pacing counter.
pub const THROTTLE_COUNT: u64 = 0x0000_00F8;
/// Count of throttle events.
pub const THROTTLE_EVENT: u64 = 0x0000_0108;

/// Read-ring buffer device address, lower 32 bits.
pub const READ_BUFFER_ADDRESS_LOWER: u64 = 0x0000_0130;
/// Read-ring buffer device address, upper 32 bits.
pub const READ_BUFFER_ADDRESS_UPPER: u64 = 0x0000_0134;
/// Write-ring buffer device address, lower 32 bits.
pub const WRITE_BUFFER_ADDRESS_LOWER: u64 = 0x0000_013C;
/// Write-ring buffer device address, upper 32 bits.
pub const WRITE_BUFFER_ADDRESS_UPPER: u64 = 0x0000_0140;

/// ap_ctrl bit: start the kernel.
pub const AP_START: u32 = 1 << 0;
/// ap_ctrl bit: kernel completed one invocation.
pub const AP_DONE: u32 = 1 << 1;
/// ap_ctrl bit: kernel is idle.
pub const AP_IDLE: u32 = 1 << 2;
/// ap_ctrl bit: restart automatically after each invocation (free-run).
pub const AP_AUTO_RESTART: u32 = 1 << 7;

/// CTRL bit: enable the hardware latency counters.
pub const CTRL_LATENCY_COUNTER_ENABLE: u32 = 1 << 0;
