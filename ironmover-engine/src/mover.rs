//! The data mover orchestrator.
//!
//! Owns the two ring buffers and the worker thread, and exposes the control
//! and instrumentation surface of the order-book data mover block: thread
//! lifecycle, hardware kernel arming, throttle and latency counters, DMA
//! statistics and diagnostics.

use crate::stats::{DmaStats, HwStats, LatencyStats, ThreadStats, ThrottleStats};
use crate::worker::{MoverControl, Worker};
use ironmover_core::{
    Error, READ_ELEMENT_SIZE, RING_SIZE, Result, WRITE_ELEMENT_SIZE, ring,
};
use ironmover_device::{BufferHandle, ComputeUnitInfo, DeviceInterface, SyncDirection, regs};
use ironmover_pricing::PricingStrategy;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;

/// Lifecycle state of a data mover.
///
/// The worker thread's running state is tracked separately; it requires
/// `BuffersReady` and toggles with start/stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoverState {
    /// Not yet bound to a hardware block.
    Uninitialised,
    /// Bound to a compute unit; ring buffers not yet allocated.
    Initialised,
    /// Ring buffers allocated, mapped and programmed into the hardware.
    BuffersReady,
}

struct RingBuffers {
    read: BufferHandle,
    write: BufferHandle,
}

struct Binding {
    device: Arc<dyn DeviceInterface>,
    cu: ComputeUnitInfo,
    clock_mhz: u32,
}

/// Host-side orchestrator for one order-book data mover compute unit.
///
/// Control operations may be invoked from any thread, but callers must
/// serialize their own start/stop/configuration calls; concurrent
/// overlapping start/stop is not supported.
pub struct DataMover {
    state: MoverState,
    binding: Option<Binding>,
    buffers: Option<RingBuffers>,
    control: Arc<MoverControl>,
    strategy: Arc<Mutex<Box<dyn PricingStrategy>>>,
    worker: Option<JoinHandle<()>>,
}

impl DataMover {
    /// Creates an unbound data mover that will feed responses to the given
    /// pricing strategy.
    #[must_use]
    pub fn new(strategy: Box<dyn PricingStrategy>) -> Self {
        Self {
            state: MoverState::Uninitialised,
            binding: None,
            buffers: None,
            control: Arc::new(MoverControl::default()),
            strategy: Arc::new(Mutex::new(strategy)),
            worker: None,
        }
    }

    /// Binds the mover to a named compute unit on the device and records
    /// its memory topology and clock frequency.
    ///
    /// # Errors
    /// Returns [`Error::CuNameNotFound`] if the block is absent, or
    /// [`Error::InvalidParameter`] if already initialised.
    pub fn initialise(&mut self, device: Arc<dyn DeviceInterface>, cu_name: &str) -> Result<()> {
        if self.state != MoverState::Uninitialised {
            return Err(Error::InvalidParameter {
                message: "data mover is already initialised".into(),
            });
        }

        let cu = device.compute_unit(cu_name)?;
        let clock_mhz = device
            .clock_frequencies()?
            .first()
            .copied()
            .ok_or_else(|| Error::IoFailed {
                context: "device reported no clock frequencies".into(),
            })?;

        tracing::info!(
            cu_name,
            cu_index = cu.index,
            base_address = format_args!("{:#x}", cu.base_address),
            clock_mhz,
            read_bank_is_host = cu.read_bank.is_host(),
            "data mover initialised"
        );

        self.binding = Some(Binding {
            device,
            cu,
            clock_mhz,
        });
        self.state = MoverState::Initialised;
        Ok(())
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> MoverState {
        self.state
    }

    /// Returns the kernel clock frequency in MHz recorded at initialise
    /// time.
    ///
    /// # Errors
    /// Returns [`Error::NotInitialised`] if unbound.
    pub fn clock_frequency_mhz(&self) -> Result<u32> {
        Ok(self.binding()?.clock_mhz)
    }

    fn binding(&self) -> Result<&Binding> {
        self.binding.as_ref().ok_or(Error::NotInitialised)
    }

    fn reg_read(&self, offset: u64) -> Result<u32> {
        let binding = self.binding()?;
        binding.device.read_register(binding.cu.base_address + offset)
    }

    fn reg_write(&self, offset: u64, value: u32) -> Result<()> {
        let binding = self.binding()?;
        binding
            .device
            .write_register(binding.cu.base_address + offset, value)
    }

    /// Allocates, maps and programs both ring buffers if not done yet.
    ///
    /// Called lazily from the first start or the first explicit buffer
    /// access. A failure leaves the mover in `Initialised` state and is
    /// surfaced to the caller.
    ///
    /// # Errors
    /// Returns [`Error::NotInitialised`], [`Error::BufferAllocationFailed`]
    /// or [`Error::BufferMapFailed`].
    pub fn setup_buffers_if_needed(&mut self) -> Result<()> {
        match self.state {
            MoverState::Uninitialised => Err(Error::NotInitialised),
            MoverState::BuffersReady => Ok(()),
            MoverState::Initialised => {
                let binding = self.binding()?;
                let device = &binding.device;

                let read = device.allocate_buffer(
                    RING_SIZE as usize * READ_ELEMENT_SIZE,
                    binding.cu.read_bank,
                )?;
                let write = device.allocate_buffer(
                    RING_SIZE as usize * WRITE_ELEMENT_SIZE,
                    binding.cu.write_bank,
                )?;

                let read_address = device.device_address(read)?;
                let write_address = device.device_address(write)?;
                let base = binding.cu.base_address;
                device.write_register(
                    base + regs::READ_BUFFER_ADDRESS_LOWER,
                    read_address as u32,
                )?;
                device.write_register(
                    base + regs::READ_BUFFER_ADDRESS_UPPER,
                    (read_address >> 32) as u32,
                )?;
                device.write_register(
                    base + regs::WRITE_BUFFER_ADDRESS_LOWER,
                    write_address as u32,
                )?;
                device.write_register(
                    base + regs::WRITE_BUFFER_ADDRESS_UPPER,
                    (write_address >> 32) as u32,
                )?;

                tracing::info!(
                    read_address = format_args!("{read_address:#x}"),
                    write_address = format_args!("{write_address:#x}"),
                    "ring buffers allocated and programmed"
                );

                self.buffers = Some(RingBuffers { read, write });
                self.state = MoverState::BuffersReady;
                Ok(())
            }
        }
    }

    /// Starts the worker thread. A no-op if it is already running.
    ///
    /// Clears the previously-consumed read-tail index to 0 before the
    /// thread starts polling.
    ///
    /// # Errors
    /// Propagates buffer setup failures; returns [`Error::IoFailed`] if the
    /// thread cannot be spawned.
    pub fn start_processing_thread(&mut self) -> Result<()> {
        if self.is_processing_thread_running() {
            return Ok(());
        }
        // Reap a previously finished thread before restarting.
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }

        self.setup_buffers_if_needed()?;
        let binding = self.binding()?;
        let buffers = self.buffers.as_ref().ok_or(Error::NotInitialised)?;

        self.reg_write(regs::RING_READ_BUFFER_HEAD_INDEX, 0)?;
        self.control.keep_running.store(true, Ordering::Release);

        let worker = Worker {
            device: Arc::clone(&binding.device),
            base: binding.cu.base_address,
            control: Arc::clone(&self.control),
            strategy: Arc::clone(&self.strategy),
            read_buffer: buffers.read,
            write_buffer: buffers.write,
            read_needs_sync: !binding.cu.read_bank.is_host(),
            write_needs_sync: !binding.cu.write_bank.is_host(),
        };

        let handle = std::thread::Builder::new()
            .name("ironmover-worker".into())
            .spawn(move || worker.run())
            .map_err(|e| Error::IoFailed {
                context: format!("failed to spawn worker thread: {e}"),
            })?;

        self.worker = Some(handle);
        tracing::info!("data mover processing thread started");
        Ok(())
    }

    /// Stops the worker thread and waits for it to exit. A no-op if it is
    /// not running.
    pub fn stop_processing_thread(&mut self) {
        self.control.keep_running.store(false, Ordering::Release);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::warn!("data mover worker thread panicked");
            } else {
                tracing::info!("data mover processing thread stopped");
            }
        }
    }

    /// Returns true if the worker thread is currently running.
    #[must_use]
    pub fn is_processing_thread_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Arms the hardware kernel itself (distinct from the software thread).
    /// The block free-runs once armed; the thread merely drains it.
    ///
    /// # Errors
    /// Returns [`Error::NotInitialised`] or a register write failure.
    pub fn start_hw_kernel(&self) -> Result<()> {
        let binding = self.binding()?;
        binding.device.write_register_masked(
            binding.cu.base_address + regs::KERNEL_CONTROL,
            regs::AP_START | regs::AP_AUTO_RESTART,
            regs::AP_START | regs::AP_AUTO_RESTART,
        )?;
        tracing::info!("hardware kernel armed");
        Ok(())
    }

    /// Returns true if the hardware kernel has been armed.
    ///
    /// # Errors
    /// Returns [`Error::NotInitialised`] or a register read failure.
    pub fn is_hw_kernel_running(&self) -> Result<bool> {
        let control = self.reg_read(regs::KERNEL_CONTROL)?;
        Ok(control & regs::AP_START != 0)
    }

    /// Enables or disables the cooperative yield at the end of each worker
    /// iteration.
    pub fn set_thread_yield(&self, enabled: bool) {
        self.control.yield_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Returns whether cooperative yielding is enabled.
    #[must_use]
    pub fn thread_yield(&self) -> bool {
        self.control.yield_enabled.load(Ordering::Relaxed)
    }

    /// Sets the emulation-mode poll delay in seconds (0 disables it).
    ///
    /// The worker keeps checking the stop flag while waiting, so shutdown
    /// stays prompt even with a large delay.
    pub fn set_hw_emulation_poll_delay(&self, seconds: u32) {
        self.control.poll_delay_secs.store(seconds, Ordering::Relaxed);
    }

    /// Returns the emulation-mode poll delay in seconds.
    #[must_use]
    pub fn hw_emulation_poll_delay(&self) -> u32 {
        self.control.poll_delay_secs.load(Ordering::Relaxed)
    }

    /// Sets the DMA chunk size in elements: 0 transfers the whole pending
    /// range in one sync, a positive value transfers at most that many
    /// elements per sync.
    pub fn set_dma_chunk_size(&self, elements: u32) {
        self.control.chunk_elements.store(elements, Ordering::Relaxed);
    }

    /// Returns the DMA chunk size in elements.
    #[must_use]
    pub fn dma_chunk_size(&self) -> u32 {
        self.control.chunk_elements.load(Ordering::Relaxed)
    }

    /// Forwards verbose tracing on or off to the pricing strategy.
    pub fn set_verbose_tracing(&self, enabled: bool) {
        self.strategy.lock().set_verbose_tracing(enabled);
    }

    /// Sets the hardware throttle rate in clock cycles, pacing how fast the
    /// hardware drains the write ring.
    ///
    /// # Errors
    /// Returns [`Error::NotInitialised`] or a register write failure.
    pub fn set_throttle_rate(&self, clock_cycles: u32) -> Result<()> {
        self.reg_write(regs::THROTTLE_RATE, clock_cycles)
    }

    /// Returns the hardware throttle rate in clock cycles.
    ///
    /// # Errors
    /// Returns [`Error::NotInitialised`] or a register read failure.
    pub fn throttle_rate(&self) -> Result<u32> {
        self.reg_read(regs::THROTTLE_RATE)
    }

    /// Reads the hardware throttle counters.
    ///
    /// # Errors
    /// Returns [`Error::NotInitialised`] or a register read failure.
    pub fn throttle_stats(&self) -> Result<ThrottleStats> {
        Ok(ThrottleStats {
            throttle_counter: self.reg_read(regs::THROTTLE_COUNT)?,
            throttle_events: self.reg_read(regs::THROTTLE_EVENT)?,
        })
    }

    /// Reads the hardware-side event counters.
    ///
    /// # Errors
    /// Returns [`Error::NotInitialised`] or a register read failure.
    pub fn hw_stats(&self) -> Result<HwStats> {
        Ok(HwStats {
            tx_response_count: self.reg_read(regs::TX_RESPONSE_INDEX)?,
            rx_operation_count: self.reg_read(regs::NUM_RX_OP)?,
        })
    }

    /// Starts the hardware round-trip latency counters.
    ///
    /// # Errors
    /// Returns [`Error::NotInitialised`] or a register write failure.
    pub fn start_latency_counters(&self) -> Result<()> {
        let binding = self.binding()?;
        binding.device.write_register_masked(
            binding.cu.base_address + regs::CTRL,
            regs::CTRL_LATENCY_COUNTER_ENABLE,
            regs::CTRL_LATENCY_COUNTER_ENABLE,
        )
    }

    /// Stops the hardware round-trip latency counters.
    ///
    /// # Errors
    /// Returns [`Error::NotInitialised`] or a register write failure.
    pub fn stop_latency_counters(&self) -> Result<()> {
        let binding = self.binding()?;
        binding.device.write_register_masked(
            binding.cu.base_address + regs::CTRL,
            0,
            regs::CTRL_LATENCY_COUNTER_ENABLE,
        )
    }

    /// Reads the hardware round-trip latency counters.
    ///
    /// # Errors
    /// Returns [`Error::NotInitialised`] or a register read failure.
    pub fn latency_stats(&self) -> Result<LatencyStats> {
        let binding = self.binding()?;
        let base = binding.cu.base_address;

        // One block read covering LATENCY_MIN..=CYCLES_POST; the counters
        // sit every fourth word.
        let span = ((regs::CYCLES_POST - regs::LATENCY_MIN) / 4 + 1) as usize;
        let words = binding
            .device
            .block_read_registers(base + regs::LATENCY_MIN, span)?;
        let word_at = |offset: u64| words[((offset - regs::LATENCY_MIN) / 4) as usize];

        Ok(LatencyStats {
            min_cycles: word_at(regs::LATENCY_MIN),
            max_cycles: word_at(regs::LATENCY_MAX),
            sum_cycles: word_at(regs::LATENCY_SUM),
            count: word_at(regs::LATENCY_CNT),
            cycles_pre: word_at(regs::CYCLES_PRE),
            cycles_post: word_at(regs::CYCLES_POST),
        })
    }

    /// Returns the software DMA statistics as `(to_device, from_device)`.
    #[must_use]
    pub fn dma_stats(&self) -> (DmaStats, DmaStats) {
        (
            *self.control.dma_to_device.lock(),
            *self.control.dma_from_device.lock(),
        )
    }

    /// Resets the software DMA statistics for both directions.
    pub fn reset_dma_stats(&self) {
        *self.control.dma_to_device.lock() = DmaStats::default();
        *self.control.dma_from_device.lock() = DmaStats::default();
    }

    /// Returns the worker-thread statistics.
    #[must_use]
    pub fn thread_stats(&self) -> ThreadStats {
        self.control.thread_stats.snapshot()
    }

    /// Returns the read ring's `(head, tail)` indices from the hardware
    /// registers.
    ///
    /// # Errors
    /// Returns [`Error::NotInitialised`] or a register read failure.
    pub fn ring_read_indexes(&self) -> Result<(u32, u32)> {
        Ok((
            self.reg_read(regs::RING_READ_BUFFER_HEAD_INDEX)?,
            self.reg_read(regs::RING_READ_BUFFER_TAIL_INDEX)?,
        ))
    }

    /// Returns the write ring's `(head, tail)` indices from the hardware
    /// registers.
    ///
    /// # Errors
    /// Returns [`Error::NotInitialised`] or a register read failure.
    pub fn ring_write_indexes(&self) -> Result<(u32, u32)> {
        Ok((
            self.reg_read(regs::RING_WRITE_BUFFER_HEAD_INDEX)?,
            self.reg_read(regs::RING_WRITE_BUFFER_TAIL_INDEX)?,
        ))
    }

    /// Returns the compute unit index.
    ///
    /// # Errors
    /// Returns [`Error::NotInitialised`] if unbound.
    pub fn cu_index(&self) -> Result<u32> {
        Ok(self.binding()?.cu.index)
    }

    /// Returns the compute unit base address.
    ///
    /// # Errors
    /// Returns [`Error::NotInitialised`] if unbound.
    pub fn cu_address(&self) -> Result<u64> {
        Ok(self.binding()?.cu.base_address)
    }

    /// Returns the memory topology index the read ring targets.
    ///
    /// # Errors
    /// Returns [`Error::NotInitialised`] if unbound.
    pub fn read_buffer_mem_topology_index(&self) -> Result<u32> {
        Ok(self.binding()?.cu.read_bank.topology_index())
    }

    /// Returns the memory topology index the write ring targets.
    ///
    /// # Errors
    /// Returns [`Error::NotInitialised`] if unbound.
    pub fn write_buffer_mem_topology_index(&self) -> Result<u32> {
        Ok(self.binding()?.cu.write_bank.topology_index())
    }

    /// Returns the read ring's host virtual address, allocating the buffers
    /// if needed.
    ///
    /// # Errors
    /// Propagates buffer setup failures.
    pub fn read_buffer_host_address(&mut self) -> Result<u64> {
        self.setup_buffers_if_needed()?;
        let buffers = self.buffers.as_ref().ok_or(Error::NotInitialised)?;
        self.binding()?.device.host_address(buffers.read)
    }

    /// Returns the read ring's device address, allocating the buffers if
    /// needed.
    ///
    /// # Errors
    /// Propagates buffer setup failures.
    pub fn read_buffer_device_address(&mut self) -> Result<u64> {
        self.setup_buffers_if_needed()?;
        let buffers = self.buffers.as_ref().ok_or(Error::NotInitialised)?;
        self.binding()?.device.device_address(buffers.read)
    }

    /// Returns the write ring's host virtual address, allocating the
    /// buffers if needed.
    ///
    /// # Errors
    /// Propagates buffer setup failures.
    pub fn write_buffer_host_address(&mut self) -> Result<u64> {
        self.setup_buffers_if_needed()?;
        let buffers = self.buffers.as_ref().ok_or(Error::NotInitialised)?;
        self.binding()?.device.host_address(buffers.write)
    }

    /// Returns the write ring's device address, allocating the buffers if
    /// needed.
    ///
    /// # Errors
    /// Propagates buffer setup failures.
    pub fn write_buffer_device_address(&mut self) -> Result<u64> {
        self.setup_buffers_if_needed()?;
        let buffers = self.buffers.as_ref().ok_or(Error::NotInitialised)?;
        self.binding()?.device.device_address(buffers.write)
    }

    /// Reads one raw read-ring element for diagnostics, as 32-bit words.
    ///
    /// `elements_back` counts backwards from the newest hardware-written
    /// element: 0 is the newest, 1 the one before it, and so on.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] if `elements_back` exceeds the
    /// ring, or propagates buffer/register failures.
    pub fn read_raw_element(&mut self, elements_back: u32) -> Result<Vec<u32>> {
        if elements_back >= RING_SIZE {
            return Err(Error::InvalidParameter {
                message: format!("elements_back {elements_back} exceeds ring size {RING_SIZE}"),
            });
        }
        self.setup_buffers_if_needed()?;

        let tail = self.reg_read(regs::RING_READ_BUFFER_TAIL_INDEX)?;
        let newest = ring::element_index(tail, RING_SIZE - 1);
        let index = ring::element_index(newest, RING_SIZE - elements_back);

        let binding = self.binding()?;
        let buffers = self.buffers.as_ref().ok_or(Error::NotInitialised)?;
        let offset = index as usize * READ_ELEMENT_SIZE;

        if !binding.cu.read_bank.is_host() {
            binding.device.sync_buffer(
                buffers.read,
                SyncDirection::FromDevice,
                offset,
                READ_ELEMENT_SIZE,
            )?;
        }

        let mut raw = [0u8; READ_ELEMENT_SIZE];
        binding.device.read_mapped(buffers.read, offset, &mut raw)?;
        Ok(raw
            .chunks_exact(4)
            .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
            .collect())
    }
}

impl Drop for DataMover {
    fn drop(&mut self) {
        self.stop_processing_thread();
        if let (Some(binding), Some(buffers)) = (self.binding.as_ref(), self.buffers.take()) {
            let _ = binding.device.free_buffer(buffers.read);
            let _ = binding.device.free_buffer(buffers.write);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironmover_core::OrderBookResponse;
    use ironmover_device::SimDevice;
    use ironmover_pricing::HostPricingEngine;
    use std::time::{Duration, Instant};

    fn response(symbol: u8, best_bid: u32, timestamp: u64) -> OrderBookResponse {
        OrderBookResponse {
            symbol_index: symbol,
            timestamp,
            bid_price: [best_bid, 0, 0, 0, 0],
            ask_price: [best_bid + 10, 0, 0, 0, 0],
            ..Default::default()
        }
    }

    fn bound_mover(device: &Arc<SimDevice>) -> DataMover {
        let mut mover = DataMover::new(Box::new(HostPricingEngine::new()));
        mover
            .initialise(Arc::clone(device) as Arc<dyn DeviceInterface>, SimDevice::CU_NAME)
            .unwrap();
        mover
    }

    fn wait_until(what: &str, condition: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !condition() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_initialise_unknown_cu() {
        let device = Arc::new(SimDevice::new());
        let mut mover = DataMover::new(Box::new(HostPricingEngine::new()));
        assert!(matches!(
            mover.initialise(device, "no_such_block"),
            Err(Error::CuNameNotFound { .. })
        ));
        assert_eq!(mover.state(), MoverState::Uninitialised);
    }

    #[test]
    fn test_double_initialise_rejected() {
        let device = Arc::new(SimDevice::new());
        let mut mover = bound_mover(&device);
        assert!(matches!(
            mover.initialise(device, SimDevice::CU_NAME),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_operations_before_initialise() {
        let mut mover = DataMover::new(Box::new(HostPricingEngine::new()));
        assert!(matches!(
            mover.clock_frequency_mhz(),
            Err(Error::NotInitialised)
        ));
        assert!(matches!(
            mover.setup_buffers_if_needed(),
            Err(Error::NotInitialised)
        ));
        assert!(matches!(
            mover.start_processing_thread(),
            Err(Error::NotInitialised)
        ));
        // Stop is always safe.
        mover.stop_processing_thread();
        assert!(!mover.is_processing_thread_running());
    }

    #[test]
    fn test_start_stop_idempotent() {
        let device = Arc::new(SimDevice::new());
        let mut mover = bound_mover(&device);

        mover.start_processing_thread().unwrap();
        mover.start_processing_thread().unwrap();
        assert!(mover.is_processing_thread_running());

        mover.stop_processing_thread();
        mover.stop_processing_thread();
        assert!(!mover.is_processing_thread_running());

        // Restart after a clean stop.
        mover.start_processing_thread().unwrap();
        assert!(mover.is_processing_thread_running());
    }

    #[test]
    fn test_pipeline_preserves_fifo_order() {
        let device = Arc::new(SimDevice::new());
        let mut mover = bound_mover(&device);
        mover.setup_buffers_if_needed().unwrap();

        for i in 0..20u32 {
            device.hw_push_response(&response(1, 10_000 + i * 10, u64::from(i))).unwrap();
        }

        mover.start_processing_thread().unwrap();
        wait_until("20 responses drained", || {
            mover.thread_stats().rx_responses == 20
        });
        mover.stop_processing_thread();

        let operations = device.hw_drain_operations().unwrap();
        assert_eq!(operations.len(), 20);
        for (i, operation) in operations.iter().enumerate() {
            assert_eq!(operation.order_id, i as u32 + 1);
            assert_eq!(operation.price, 10_100 + i as u32 * 10);
            assert_eq!(operation.timestamp, i as u64);
        }

        let stats = mover.thread_stats();
        assert_eq!(stats.rx_responses, 20);
        assert_eq!(stats.tx_operations, 20);
        assert_eq!(stats.io_errors, 0);

        let (read_head, read_tail) = mover.ring_read_indexes().unwrap();
        assert_eq!((read_head, read_tail), (20, 20));
        let (write_head, write_tail) = mover.ring_write_indexes().unwrap();
        assert_eq!((write_head, write_tail), (20, 20));

        let hw = mover.hw_stats().unwrap();
        assert_eq!(hw.tx_response_count, 20);
        assert_eq!(hw.rx_operation_count, 20);
    }

    #[test]
    fn test_read_ring_wraparound_and_dma_stats() {
        let device = Arc::new(SimDevice::new());
        let mut mover = bound_mover(&device);
        mover.setup_buffers_if_needed().unwrap();

        // A constant bid emits one order total, so the write ring stays
        // almost empty while the read ring wraps.
        for i in 0..u64::from(RING_SIZE - 2) {
            device.hw_push_response(&response(2, 5_000, i)).unwrap();
        }

        mover.start_processing_thread().unwrap();
        wait_until("first batch drained", || {
            mover.thread_stats().rx_responses == u64::from(RING_SIZE - 2)
        });

        // Push past the ring boundary while the thread is live.
        for i in 0..8u64 {
            device.hw_push_response(&response(2, 5_000, 2_000 + i)).unwrap();
        }
        wait_until("wrapped batch drained", || {
            mover.thread_stats().rx_responses == u64::from(RING_SIZE + 6)
        });
        mover.stop_processing_thread();

        let (_, from_device) = mover.dma_stats();
        assert_eq!(
            from_device.total_bytes_transferred,
            u64::from(RING_SIZE + 6) * READ_ELEMENT_SIZE as u64
        );
        assert_eq!(from_device.buffer_wrap_arounds, 1);

        assert_eq!(device.hw_drain_operations().unwrap().len(), 1);
    }

    #[test]
    fn test_chunked_dma_sync() {
        let device = Arc::new(SimDevice::new());
        let mut mover = bound_mover(&device);
        mover.setup_buffers_if_needed().unwrap();
        mover.set_dma_chunk_size(1);
        assert_eq!(mover.dma_chunk_size(), 1);

        for i in 0..5u64 {
            device.hw_push_response(&response(4, 7_000 + i as u32, i)).unwrap();
        }

        mover.start_processing_thread().unwrap();
        wait_until("chunked batch drained", || {
            mover.thread_stats().rx_responses == 5
        });
        mover.stop_processing_thread();

        // One element per sync.
        let (_, from_device) = mover.dma_stats();
        assert_eq!(from_device.total_sync_operations, 5);
        assert_eq!(from_device.transfer_high_tide, READ_ELEMENT_SIZE as u32);

        mover.reset_dma_stats();
        assert_eq!(mover.dma_stats(), (DmaStats::default(), DmaStats::default()));
    }

    #[test]
    fn test_stop_is_prompt_under_poll_delay() {
        let device = Arc::new(SimDevice::new());
        let mut mover = bound_mover(&device);
        mover.set_hw_emulation_poll_delay(30);
        assert_eq!(mover.hw_emulation_poll_delay(), 30);

        mover.start_processing_thread().unwrap();
        std::thread::sleep(Duration::from_millis(50));

        let begin = Instant::now();
        mover.stop_processing_thread();
        assert!(begin.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_worker_survives_sync_failures() {
        let device = Arc::new(SimDevice::new());
        let mut mover = bound_mover(&device);
        mover.setup_buffers_if_needed().unwrap();

        device.hw_push_response(&response(6, 9_000, 1)).unwrap();
        device.inject_sync_failures(2);

        mover.start_processing_thread().unwrap();
        wait_until("response drained after failures", || {
            mover.thread_stats().rx_responses == 1
        });
        mover.stop_processing_thread();

        let stats = mover.thread_stats();
        assert_eq!(stats.io_errors, 2);
        assert_eq!(device.hw_drain_operations().unwrap().len(), 1);
    }

    #[test]
    fn test_write_sync_failure_never_publishes_the_element() {
        let device = Arc::new(SimDevice::new());
        let mut mover = bound_mover(&device);
        mover.setup_buffers_if_needed().unwrap();

        // Two bid changes, so the strategy emits two orders. The first
        // order's to-device sync fails; read-path syncs are unaffected.
        device.hw_push_response(&response(5, 9_000, 1)).unwrap();
        device.hw_push_response(&response(5, 9_050, 2)).unwrap();
        device.inject_to_device_sync_failures(1);

        mover.start_processing_thread().unwrap();
        wait_until("both responses drained", || {
            mover.thread_stats().rx_responses == 2
        });
        mover.stop_processing_thread();

        // The abandoned order's slot is reused, so the hardware only ever
        // sees the second order; nothing stale or zeroed is drained.
        let operations = device.hw_drain_operations().unwrap();
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].order_id, 2);
        assert_eq!(operations[0].price, 9_150);

        let stats = mover.thread_stats();
        assert_eq!(stats.tx_operations, 1);
        assert_eq!(stats.io_errors, 1);

        let (_, write_tail) = mover.ring_write_indexes().unwrap();
        assert_eq!(write_tail, 1);
    }

    #[test]
    fn test_host_bank_needs_no_sync() {
        let device = Arc::new(SimDevice::with_host_bank());
        let mut mover = bound_mover(&device);
        mover.setup_buffers_if_needed().unwrap();

        for i in 0..3u32 {
            device.hw_push_response(&response(8, 6_000 + i * 5, u64::from(i))).unwrap();
        }

        mover.start_processing_thread().unwrap();
        wait_until("host-bank batch drained", || {
            mover.thread_stats().rx_responses == 3
        });
        mover.stop_processing_thread();

        let (to_device, from_device) = mover.dma_stats();
        assert_eq!(to_device.total_sync_operations, 0);
        assert_eq!(from_device.total_sync_operations, 0);
        assert_eq!(device.hw_drain_operations().unwrap().len(), 3);
    }

    #[test]
    fn test_hw_kernel_arming() {
        let device = Arc::new(SimDevice::new());
        let mover = bound_mover(&device);

        assert!(!mover.is_hw_kernel_running().unwrap());
        mover.start_hw_kernel().unwrap();
        assert!(mover.is_hw_kernel_running().unwrap());
    }

    #[test]
    fn test_latency_counters() {
        let device = Arc::new(SimDevice::new());
        let mover = bound_mover(&device);

        mover.start_latency_counters().unwrap();
        let base = mover.cu_address().unwrap();
        assert_eq!(
            device.read_register(base + regs::CTRL).unwrap() & regs::CTRL_LATENCY_COUNTER_ENABLE,
            regs::CTRL_LATENCY_COUNTER_ENABLE
        );
        mover.stop_latency_counters().unwrap();
        assert_eq!(
            device.read_register(base + regs::CTRL).unwrap() & regs::CTRL_LATENCY_COUNTER_ENABLE,
            0
        );

        device.hw_set_latency_counters(10, 50, 120, 4, 7, 9);
        let stats = mover.latency_stats().unwrap();
        assert_eq!(stats.min_cycles, 10);
        assert_eq!(stats.max_cycles, 50);
        assert_eq!(stats.sum_cycles, 120);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.cycles_pre, 7);
        assert_eq!(stats.cycles_post, 9);
        assert_eq!(stats.mean_cycles(), Some(30.0));
    }

    #[test]
    fn test_throttle_rate_and_stats() {
        let device = Arc::new(SimDevice::new());
        let mover = bound_mover(&device);

        mover.set_throttle_rate(250).unwrap();
        assert_eq!(mover.throttle_rate().unwrap(), 250);

        device.hw_set_throttle_counters(5, 2);
        let stats = mover.throttle_stats().unwrap();
        assert_eq!(stats.throttle_counter, 5);
        assert_eq!(stats.throttle_events, 2);
    }

    #[test]
    fn test_identity_and_address_accessors() {
        let device = Arc::new(SimDevice::new());
        let mut mover = bound_mover(&device);

        assert_eq!(mover.cu_index().unwrap(), 0);
        assert_ne!(mover.cu_address().unwrap(), 0);
        assert_eq!(mover.clock_frequency_mhz().unwrap(), 300);
        assert_eq!(mover.read_buffer_mem_topology_index().unwrap(), 0);
        assert_eq!(mover.write_buffer_mem_topology_index().unwrap(), 1);

        // Address accessors allocate the buffers lazily.
        assert_eq!(mover.state(), MoverState::Initialised);
        let read_device = mover.read_buffer_device_address().unwrap();
        assert_eq!(mover.state(), MoverState::BuffersReady);
        let write_device = mover.write_buffer_device_address().unwrap();
        assert_ne!(read_device, 0);
        assert_ne!(write_device, 0);
        assert_ne!(read_device, write_device);
        assert_ne!(mover.read_buffer_host_address().unwrap(), 0);
        assert_ne!(mover.write_buffer_host_address().unwrap(), 0);
    }

    #[test]
    fn test_raw_element_readback() {
        let device = Arc::new(SimDevice::new());
        let mut mover = bound_mover(&device);
        mover.setup_buffers_if_needed().unwrap();

        device.hw_push_response(&response(3, 1_111, 1)).unwrap();
        device.hw_push_response(&response(3, 2_222, 2)).unwrap();
        device.hw_push_response(&response(3, 3_333, 3)).unwrap();

        // Best bid sits in the word at byte offset 80.
        let newest = mover.read_raw_element(0).unwrap();
        assert_eq!(newest.len(), READ_ELEMENT_SIZE / 4);
        assert_eq!(newest[20], 3_333);

        let older = mover.read_raw_element(2).unwrap();
        assert_eq!(older[20], 1_111);

        assert!(matches!(
            mover.read_raw_element(RING_SIZE),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_thread_yield_toggle() {
        let device = Arc::new(SimDevice::new());
        let mover = bound_mover(&device);

        assert!(mover.thread_yield());
        mover.set_thread_yield(false);
        assert!(!mover.thread_yield());
    }
}
