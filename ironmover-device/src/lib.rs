//! # IronMover Device
//!
//! The device access port for the IronMover driver: an opaque capability
//! providing register access, DMA buffer management and directional buffer
//! synchronization, plus a software emulation of the order-book data mover
//! hardware block for tests, demos and benches.

pub mod regs;
pub mod sim;

pub use sim::SimDevice;

use ironmover_core::{Error, Result};

/// Placement hint for a DMA buffer's device-visible side.
///
/// Card-resident buffers need an explicit directional sync before the host
/// or hardware can observe the other side's writes; host-resident banks are
/// written by the hardware directly and need no sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryBank {
    /// Card-resident memory (DDR/HBM) with the given topology index.
    Card(u32),
    /// Host-resident memory bank with the given topology index.
    Host(u32),
}

impl MemoryBank {
    /// Returns true if the bank is host-resident (no sync required).
    #[must_use]
    pub const fn is_host(&self) -> bool {
        matches!(self, Self::Host(_))
    }

    /// Returns the memory topology index of the bank.
    #[must_use]
    pub const fn topology_index(&self) -> u32 {
        match self {
            Self::Card(index) | Self::Host(index) => *index,
        }
    }
}

/// Opaque handle to an allocated buffer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Direction of a buffer synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Host memory to device memory (software-to-hardware ring).
    ToDevice,
    /// Device memory to host memory (hardware-to-software ring).
    FromDevice,
}

/// Identity and topology of a compute unit, discovered at initialise time.
#[derive(Debug, Clone)]
pub struct ComputeUnitInfo {
    /// Compute unit index on the device.
    pub index: u32,
    /// Base address of the compute unit's register block.
    pub base_address: u64,
    /// Memory bank the read ring (hardware-to-software) targets.
    pub read_bank: MemoryBank,
    /// Memory bank the write ring (software-to-hardware) targets.
    pub write_bank: MemoryBank,
}

/// The device access port consumed by the data mover.
///
/// Implementations wrap the real PCIe/MMIO runtime; [`SimDevice`] provides a
/// software stand-in. All methods take `&self` so a device can be shared
/// between the worker thread and control threads.
pub trait DeviceInterface: Send + Sync {
    /// Looks up a compute unit by name.
    ///
    /// # Errors
    /// Returns [`Error::CuNameNotFound`] if no such compute unit exists.
    fn compute_unit(&self, name: &str) -> Result<ComputeUnitInfo>;

    /// Reads a 32-bit register at an absolute device address.
    ///
    /// # Errors
    /// Returns [`Error::IoFailed`] on an MMIO failure.
    fn read_register(&self, address: u64) -> Result<u32>;

    /// Writes a 32-bit register at an absolute device address.
    ///
    /// # Errors
    /// Returns [`Error::IoFailed`] on an MMIO failure.
    fn write_register(&self, address: u64, value: u32) -> Result<()>;

    /// Read-modify-writes a register: bits set in `mask` come from `value`,
    /// the rest keep their current contents.
    ///
    /// # Errors
    /// Returns [`Error::IoFailed`] on an MMIO failure.
    fn write_register_masked(&self, address: u64, value: u32, mask: u32) -> Result<()>;

    /// Reads `count` consecutive 32-bit registers starting at `address`.
    ///
    /// # Errors
    /// Returns [`Error::IoFailed`] on an MMIO failure.
    fn block_read_registers(&self, address: u64, count: usize) -> Result<Vec<u32>>;

    /// Allocates a buffer object targeting the given memory bank, mapped
    /// into host address space. Contents start zeroed.
    ///
    /// # Errors
    /// Returns [`Error::BufferAllocationFailed`] or [`Error::BufferMapFailed`].
    fn allocate_buffer(&self, size_bytes: usize, bank: MemoryBank) -> Result<BufferHandle>;

    /// Releases a buffer object and its host mapping.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] for an unknown handle.
    fn free_buffer(&self, handle: BufferHandle) -> Result<()>;

    /// Returns the device-side address of a buffer, suitable for writing
    /// into the hardware block's address registers.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] for an unknown handle.
    fn device_address(&self, handle: BufferHandle) -> Result<u64>;

    /// Returns the host virtual address of a buffer's mapping (diagnostic).
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] for an unknown handle.
    fn host_address(&self, handle: BufferHandle) -> Result<u64>;

    /// Copies bytes out of a buffer's host mapping.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] for an unknown handle or an
    /// out-of-range window.
    fn read_mapped(&self, handle: BufferHandle, offset: usize, dst: &mut [u8]) -> Result<()>;

    /// Copies bytes into a buffer's host mapping.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] for an unknown handle or an
    /// out-of-range window.
    fn write_mapped(&self, handle: BufferHandle, offset: usize, src: &[u8]) -> Result<()>;

    /// Synchronizes a byte range of a buffer in the given direction.
    ///
    /// For host-resident banks this is a no-op.
    ///
    /// # Errors
    /// Returns [`Error::BufferSyncFailed`] on a DMA failure.
    fn sync_buffer(
        &self,
        handle: BufferHandle,
        direction: SyncDirection,
        offset: usize,
        len: usize,
    ) -> Result<()>;

    /// Returns the device clock frequencies in MHz. The first entry is the
    /// kernel clock used for latency-cycle conversion.
    ///
    /// # Errors
    /// Returns [`Error::IoFailed`] if the query fails.
    fn clock_frequencies(&self) -> Result<Vec<u32>>;
}

pub(crate) fn invalid_handle(handle: BufferHandle) -> Error {
    Error::InvalidParameter {
        message: format!("unknown buffer handle {}", handle.0),
    }
}
