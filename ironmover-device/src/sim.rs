//! Software emulation of the order-book data mover hardware block.
//!
//! `SimDevice` implements [`DeviceInterface`] against plain memory: a
//! register file behind a mutex and per-buffer host/device images that a
//! directional sync copies between, the way a card-resident DMA buffer
//! behaves. The `hw_*` methods play the part of the FPGA: they append
//! response records to the read ring and drain operation records from the
//! write ring, advancing the hardware-owned index registers.
//!
//! Tests, demos and benches drive the full driver stack against this device.

use crate::{
    BufferHandle, ComputeUnitInfo, DeviceInterface, MemoryBank, SyncDirection, invalid_handle, regs,
};
use ironmover_core::{
    Error, OrderBookResponse, OrderEntryOperation, READ_ELEMENT_SIZE, RING_SIZE, Result,
    WRITE_ELEMENT_SIZE, codec,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Base address the simulated compute unit's registers live at.
const CU_BASE_ADDRESS: u64 = 0x0001_0000;

/// First device address handed out to allocated buffers.
const DEVICE_ADDRESS_BASE: u64 = 0x4000_0000;

struct SimBuffer {
    bank: MemoryBank,
    device_address: u64,
    host: Vec<u8>,
    /// Device-side image; empty for host-resident banks, where the hardware
    /// writes the host image directly.
    device: Vec<u8>,
}

#[derive(Default)]
struct BufferTable {
    next_handle: u64,
    next_device_address: u64,
    entries: HashMap<u64, SimBuffer>,
}

/// Software stand-in for the FPGA device and its data mover compute unit.
pub struct SimDevice {
    cu: ComputeUnitInfo,
    registers: Mutex<HashMap<u64, u32>>,
    buffers: Mutex<BufferTable>,
    fail_syncs: AtomicU32,
    fail_to_device_syncs: AtomicU32,
}

impl SimDevice {
    /// Name of the simulated data mover compute unit.
    pub const CU_NAME: &'static str = "order_book_data_mover";

    /// Creates a sim device whose ring buffers target card-resident memory,
    /// so every transfer needs an explicit directional sync.
    #[must_use]
    pub fn new() -> Self {
        Self::with_banks(MemoryBank::Card(0), MemoryBank::Card(1))
    }

    /// Creates a sim device whose ring buffers target a host-resident bank,
    /// where syncs are no-ops and the hardware writes host memory directly.
    #[must_use]
    pub fn with_host_bank() -> Self {
        Self::with_banks(MemoryBank::Host(0), MemoryBank::Host(1))
    }

    fn with_banks(read_bank: MemoryBank, write_bank: MemoryBank) -> Self {
        Self {
            cu: ComputeUnitInfo {
                index: 0,
                base_address: CU_BASE_ADDRESS,
                read_bank,
                write_bank,
            },
            registers: Mutex::new(HashMap::new()),
            buffers: Mutex::new(BufferTable::default()),
            fail_syncs: AtomicU32::new(0),
            fail_to_device_syncs: AtomicU32::new(0),
        }
    }

    /// Makes the next `count` sync operations fail, to exercise the worker
    /// loop's error path.
    pub fn inject_sync_failures(&self, count: u32) {
        self.fail_syncs.store(count, Ordering::Release);
    }

    /// Makes the next `count` to-device syncs fail while from-device syncs
    /// keep working, to exercise the write-ring error path in isolation.
    pub fn inject_to_device_sync_failures(&self, count: u32) {
        self.fail_to_device_syncs.store(count, Ordering::Release);
    }

    fn reg(&self, offset: u64) -> u32 {
        *self
            .registers
            .lock()
            .get(&(self.cu.base_address + offset))
            .unwrap_or(&0)
    }

    fn set_reg(&self, offset: u64, value: u32) {
        self.registers
            .lock()
            .insert(self.cu.base_address + offset, value);
    }

    fn ring_image_handle(&self, address_lower: u64, address_upper: u64) -> Result<BufferHandle> {
        let device_address =
            (u64::from(self.reg(address_upper)) << 32) | u64::from(self.reg(address_lower));
        let table = self.buffers.lock();
        table
            .entries
            .iter()
            .find(|(_, buffer)| buffer.device_address == device_address && device_address != 0)
            .map(|(&id, _)| BufferHandle(id))
            .ok_or_else(|| Error::InvalidParameter {
                message: "ring buffer address registers are not programmed".into(),
            })
    }

    fn hw_side_write(&self, handle: BufferHandle, offset: usize, src: &[u8]) -> Result<()> {
        let mut table = self.buffers.lock();
        let buffer = table.entries.get_mut(&handle.0).ok_or(invalid_handle(handle))?;
        let image = if buffer.bank.is_host() {
            &mut buffer.host
        } else {
            &mut buffer.device
        };
        image[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }

    fn hw_side_read(&self, handle: BufferHandle, offset: usize, dst: &mut [u8]) -> Result<()> {
        let table = self.buffers.lock();
        let buffer = table.entries.get(&handle.0).ok_or(invalid_handle(handle))?;
        let image = if buffer.bank.is_host() {
            &buffer.host
        } else {
            &buffer.device
        };
        dst.copy_from_slice(&image[offset..offset + dst.len()]);
        Ok(())
    }

    /// Hardware side: appends one response record to the read ring and
    /// advances the hardware tail index.
    ///
    /// # Errors
    /// Returns an error if the read-ring address registers have not been
    /// programmed yet (buffers not set up).
    pub fn hw_push_response(&self, response: &OrderBookResponse) -> Result<()> {
        let handle = self.ring_image_handle(
            regs::READ_BUFFER_ADDRESS_LOWER,
            regs::READ_BUFFER_ADDRESS_UPPER,
        )?;

        let tail = self.reg(regs::RING_READ_BUFFER_TAIL_INDEX);
        let mut raw = [0u8; READ_ELEMENT_SIZE];
        codec::pack_response(response, &mut raw);
        self.hw_side_write(handle, tail as usize * READ_ELEMENT_SIZE, &raw)?;

        self.set_reg(regs::RING_READ_BUFFER_TAIL_INDEX, (tail + 1) % RING_SIZE);
        let produced = self.reg(regs::TX_RESPONSE_INDEX);
        self.set_reg(regs::TX_RESPONSE_INDEX, produced.wrapping_add(1));
        Ok(())
    }

    /// Hardware side: drains one operation record from the write ring, if
    /// one is pending, and advances the hardware head index.
    ///
    /// # Errors
    /// Returns an error if the write-ring address registers have not been
    /// programmed, or if a pending record has a malformed side/opcode byte.
    pub fn hw_pop_operation(&self) -> Result<Option<OrderEntryOperation>> {
        let handle = self.ring_image_handle(
            regs::WRITE_BUFFER_ADDRESS_LOWER,
            regs::WRITE_BUFFER_ADDRESS_UPPER,
        )?;

        let head = self.reg(regs::RING_WRITE_BUFFER_HEAD_INDEX);
        let tail = self.reg(regs::RING_WRITE_BUFFER_TAIL_INDEX);
        if head == tail {
            return Ok(None);
        }

        let mut raw = [0u8; WRITE_ELEMENT_SIZE];
        self.hw_side_read(handle, head as usize * WRITE_ELEMENT_SIZE, &mut raw)?;
        let operation = codec::unpack_operation(&raw).ok_or_else(|| Error::InvalidParameter {
            message: format!("malformed operation record at write-ring index {head}"),
        })?;

        self.set_reg(regs::RING_WRITE_BUFFER_HEAD_INDEX, (head + 1) % RING_SIZE);
        let drained = self.reg(regs::NUM_RX_OP);
        self.set_reg(regs::NUM_RX_OP, drained.wrapping_add(1));
        Ok(Some(operation))
    }

    /// Hardware side: drains every pending operation from the write ring.
    ///
    /// # Errors
    /// Propagates any [`Self::hw_pop_operation`] error.
    pub fn hw_drain_operations(&self) -> Result<Vec<OrderEntryOperation>> {
        let mut operations = Vec::new();
        while let Some(operation) = self.hw_pop_operation()? {
            operations.push(operation);
        }
        Ok(operations)
    }

    /// Hardware side: loads the latency counter registers, as the hardware
    /// would after a timing experiment.
    pub fn hw_set_latency_counters(
        &self,
        min: u32,
        max: u32,
        sum: u32,
        count: u32,
        cycles_pre: u32,
        cycles_post: u32,
    ) {
        self.set_reg(regs::LATENCY_MIN, min);
        self.set_reg(regs::LATENCY_MAX, max);
        self.set_reg(regs::LATENCY_SUM, sum);
        self.set_reg(regs::LATENCY_CNT, count);
        self.set_reg(regs::CYCLES_PRE, cycles_pre);
        self.set_reg(regs::CYCLES_POST, cycles_post);
    }

    /// Hardware side: loads the throttle statistics registers.
    pub fn hw_set_throttle_counters(&self, counter: u32, events: u32) {
        self.set_reg(regs::THROTTLE_COUNT, counter);
        self.set_reg(regs::THROTTLE_EVENT, events);
    }
}

impl Default for SimDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceInterface for SimDevice {
    fn compute_unit(&self, name: &str) -> Result<ComputeUnitInfo> {
        if name == Self::CU_NAME {
            Ok(self.cu.clone())
        } else {
            Err(Error::CuNameNotFound { name: name.into() })
        }
    }

    fn read_register(&self, address: u64) -> Result<u32> {
        Ok(*self.registers.lock().get(&address).unwrap_or(&0))
    }

    fn write_register(&self, address: u64, value: u32) -> Result<()> {
        self.registers.lock().insert(address, value);
        Ok(())
    }

    fn write_register_masked(&self, address: u64, value: u32, mask: u32) -> Result<()> {
        let mut registers = self.registers.lock();
        let current = *registers.get(&address).unwrap_or(&0);
        registers.insert(address, (current & !mask) | (value & mask));
        Ok(())
    }

    fn block_read_registers(&self, address: u64, count: usize) -> Result<Vec<u32>> {
        let registers = self.registers.lock();
        Ok((0..count)
            .map(|i| *registers.get(&(address + i as u64 * 4)).unwrap_or(&0))
            .collect())
    }

    fn allocate_buffer(&self, size_bytes: usize, bank: MemoryBank) -> Result<BufferHandle> {
        if size_bytes == 0 {
            return Err(Error::BufferAllocationFailed { size_bytes });
        }

        let mut table = self.buffers.lock();
        table.next_handle += 1;
        let id = table.next_handle;

        let device_address = DEVICE_ADDRESS_BASE + table.next_device_address;
        // Keep allocations 4KiB-aligned like a real buffer object allocator.
        table.next_device_address += (size_bytes as u64).next_multiple_of(4096);

        let device = if bank.is_host() {
            Vec::new()
        } else {
            vec![0u8; size_bytes]
        };
        table.entries.insert(
            id,
            SimBuffer {
                bank,
                device_address,
                host: vec![0u8; size_bytes],
                device,
            },
        );

        tracing::debug!(handle = id, size_bytes, ?bank, "allocated sim buffer");
        Ok(BufferHandle(id))
    }

    fn free_buffer(&self, handle: BufferHandle) -> Result<()> {
        self.buffers
            .lock()
            .entries
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(invalid_handle(handle))
    }

    fn device_address(&self, handle: BufferHandle) -> Result<u64> {
        let table = self.buffers.lock();
        table
            .entries
            .get(&handle.0)
            .map(|buffer| buffer.device_address)
            .ok_or(invalid_handle(handle))
    }

    fn host_address(&self, handle: BufferHandle) -> Result<u64> {
        let table = self.buffers.lock();
        table
            .entries
            .get(&handle.0)
            .map(|buffer| buffer.host.as_ptr() as u64)
            .ok_or(invalid_handle(handle))
    }

    fn read_mapped(&self, handle: BufferHandle, offset: usize, dst: &mut [u8]) -> Result<()> {
        let table = self.buffers.lock();
        let buffer = table.entries.get(&handle.0).ok_or(invalid_handle(handle))?;
        let end = offset + dst.len();
        if end > buffer.host.len() {
            return Err(Error::InvalidParameter {
                message: format!("mapped read [{offset}, {end}) beyond buffer"),
            });
        }
        dst.copy_from_slice(&buffer.host[offset..end]);
        Ok(())
    }

    fn write_mapped(&self, handle: BufferHandle, offset: usize, src: &[u8]) -> Result<()> {
        let mut table = self.buffers.lock();
        let buffer = table.entries.get_mut(&handle.0).ok_or(invalid_handle(handle))?;
        let end = offset + src.len();
        if end > buffer.host.len() {
            return Err(Error::InvalidParameter {
                message: format!("mapped write [{offset}, {end}) beyond buffer"),
            });
        }
        buffer.host[offset..end].copy_from_slice(src);
        Ok(())
    }

    fn sync_buffer(
        &self,
        handle: BufferHandle,
        direction: SyncDirection,
        offset: usize,
        len: usize,
    ) -> Result<()> {
        if self
            .fail_syncs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
        {
            return Err(Error::BufferSyncFailed {
                context: "injected sync failure".into(),
            });
        }
        if direction == SyncDirection::ToDevice
            && self
                .fail_to_device_syncs
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |remaining| {
                    remaining.checked_sub(1)
                })
                .is_ok()
        {
            return Err(Error::BufferSyncFailed {
                context: "injected to-device sync failure".into(),
            });
        }

        let mut table = self.buffers.lock();
        let buffer = table.entries.get_mut(&handle.0).ok_or(invalid_handle(handle))?;
        if buffer.bank.is_host() {
            return Ok(());
        }

        let end = offset + len;
        if end > buffer.host.len() {
            return Err(Error::BufferSyncFailed {
                context: format!("sync range [{offset}, {end}) beyond buffer"),
            });
        }

        let SimBuffer { host, device, .. } = buffer;
        match direction {
            SyncDirection::ToDevice => {
                device[offset..end].copy_from_slice(&host[offset..end]);
            }
            SyncDirection::FromDevice => {
                host[offset..end].copy_from_slice(&device[offset..end]);
            }
        }
        Ok(())
    }

    fn clock_frequencies(&self) -> Result<Vec<u32>> {
        Ok(vec![300, 500])
    }
}
