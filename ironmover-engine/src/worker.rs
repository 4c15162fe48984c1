//! The data mover worker thread.
//!
//! One iteration of the loop: check the emulation poll delay, read the
//! hardware tail index of the read ring, sync and drain any pending
//! elements through the pricing strategy (packing any resulting operations
//! into the write ring), then cooperatively yield. The loop re-checks the
//! keep-running flag every iteration and never blocks, which bounds
//! shutdown latency to roughly one iteration.

use crate::stats::{DmaStats, SharedThreadStats};
use ironmover_core::{
    OrderEntryOperation, READ_ELEMENT_SIZE, RING_SIZE, Result, WRITE_ELEMENT_SIZE, codec, ring,
};
use ironmover_device::{BufferHandle, DeviceInterface, SyncDirection, regs};
use ironmover_pricing::PricingStrategy;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Control flags and counters shared between the orchestrator and the
/// worker thread.
///
/// The cached write-ring tail lives here so it survives thread restarts;
/// only the worker mutates it while running.
#[derive(Debug)]
pub(crate) struct MoverControl {
    pub(crate) keep_running: AtomicBool,
    pub(crate) yield_enabled: AtomicBool,
    pub(crate) poll_delay_secs: AtomicU32,
    pub(crate) chunk_elements: AtomicU32,
    pub(crate) write_tail: AtomicU32,
    pub(crate) thread_stats: SharedThreadStats,
    pub(crate) dma_to_device: Mutex<DmaStats>,
    pub(crate) dma_from_device: Mutex<DmaStats>,
}

impl Default for MoverControl {
    fn default() -> Self {
        Self {
            keep_running: AtomicBool::new(false),
            yield_enabled: AtomicBool::new(true),
            poll_delay_secs: AtomicU32::new(0),
            chunk_elements: AtomicU32::new(0),
            write_tail: AtomicU32::new(0),
            thread_stats: SharedThreadStats::default(),
            dma_to_device: Mutex::new(DmaStats::default()),
            dma_from_device: Mutex::new(DmaStats::default()),
        }
    }
}

pub(crate) struct Worker {
    pub(crate) device: Arc<dyn DeviceInterface>,
    pub(crate) base: u64,
    pub(crate) control: Arc<MoverControl>,
    pub(crate) strategy: Arc<Mutex<Box<dyn PricingStrategy>>>,
    pub(crate) read_buffer: BufferHandle,
    pub(crate) write_buffer: BufferHandle,
    pub(crate) read_needs_sync: bool,
    pub(crate) write_needs_sync: bool,
}

impl Worker {
    pub(crate) fn run(self) {
        tracing::debug!("data mover worker thread started");
        self.control.thread_stats.reset();

        // Cached consumed position of the read ring; cleared on every start.
        let mut previous_tail = 0u32;
        let mut last_poll = Instant::now();

        while self.control.keep_running.load(Ordering::Acquire) {
            // Emulation-mode rate limiting: a non-blocking elapsed-time
            // check, so a stop request is honored promptly even with a poll
            // delay of tens of seconds.
            let delay_secs = self.control.poll_delay_secs.load(Ordering::Relaxed);
            if delay_secs > 0 {
                if last_poll.elapsed() < Duration::from_secs(u64::from(delay_secs)) {
                    continue;
                }
                last_poll = Instant::now();
            }

            if let Err(error) = self.poll_once(&mut previous_tail) {
                self.control.thread_stats.record_error();
                tracing::warn!(%error, "data mover poll failed");
            }

            if self.control.yield_enabled.load(Ordering::Relaxed) {
                thread::yield_now();
            }
        }

        tracing::debug!("data mover worker thread exiting");
    }

    /// Drains all elements the hardware has produced since the last poll.
    fn poll_once(&self, previous_tail: &mut u32) -> Result<()> {
        let current_tail = self
            .device
            .read_register(self.base + regs::RING_READ_BUFFER_TAIL_INDEX)?;

        let pending = ring::pending_count(*previous_tail, current_tail);
        if pending == 0 {
            return Ok(());
        }

        self.sync_read_range(*previous_tail, pending)?;

        for offset in 0..pending {
            let index = ring::element_index(*previous_tail, offset);
            if let Err(error) = self.process_element(index) {
                // Abandon this element and keep draining.
                self.control.thread_stats.record_error();
                tracing::warn!(%error, index, "failed to process read-ring element");
            }
        }

        *previous_tail = current_tail;
        self.device
            .write_register(self.base + regs::RING_READ_BUFFER_HEAD_INDEX, current_tail)?;
        Ok(())
    }

    fn process_element(&self, index: u32) -> Result<()> {
        let mut raw = [0u8; READ_ELEMENT_SIZE];
        self.device.read_mapped(
            self.read_buffer,
            index as usize * READ_ELEMENT_SIZE,
            &mut raw,
        )?;

        let response = codec::unpack_response(&raw);
        self.control.thread_stats.record_rx();

        let operation = self.strategy.lock().process(&response);
        if let Some(operation) = operation {
            self.write_operation(&operation)?;
            self.control.thread_stats.record_tx();
        }
        Ok(())
    }

    /// Syncs the pending element range of the read ring from the device,
    /// splitting at the ring boundary and honoring the DMA chunk size.
    fn sync_read_range(&self, start: u32, count: u32) -> Result<()> {
        if !self.read_needs_sync {
            return Ok(());
        }

        let first_len = count.min(RING_SIZE - start);
        self.sync_read_segment(start, first_len)?;
        if first_len < count {
            self.sync_read_segment(0, count - first_len)?;
        }
        if start + count >= RING_SIZE {
            self.control.dma_from_device.lock().record_wrap();
        }
        Ok(())
    }

    fn sync_read_segment(&self, start: u32, len_elements: u32) -> Result<()> {
        let chunk = self.control.chunk_elements.load(Ordering::Relaxed);
        let step = if chunk == 0 { len_elements } else { chunk };

        let mut done = 0;
        while done < len_elements {
            let elements = step.min(len_elements - done);
            let offset = ring::element_offset(start, done, READ_ELEMENT_SIZE);
            let bytes = elements as usize * READ_ELEMENT_SIZE;

            self.device
                .sync_buffer(self.read_buffer, SyncDirection::FromDevice, offset, bytes)?;
            self.control.dma_from_device.lock().record_sync(bytes);
            done += elements;
        }
        Ok(())
    }

    /// Packs one operation into the next free write-ring slot, syncs it to
    /// the device, then advances the cached tail and publishes the new tail
    /// index.
    ///
    /// The tail only moves once the slot is device-visible: an element whose
    /// write or sync fails stays unpublished and its slot is reused by the
    /// next operation.
    fn write_operation(&self, operation: &OrderEntryOperation) -> Result<()> {
        let mut raw = [0u8; WRITE_ELEMENT_SIZE];
        codec::pack_operation(operation, &mut raw);

        let tail = self.control.write_tail.load(Ordering::Relaxed);
        let offset = tail as usize * WRITE_ELEMENT_SIZE;
        self.device.write_mapped(self.write_buffer, offset, &raw)?;

        if self.write_needs_sync {
            self.device.sync_buffer(
                self.write_buffer,
                SyncDirection::ToDevice,
                offset,
                WRITE_ELEMENT_SIZE,
            )?;
            self.control
                .dma_to_device
                .lock()
                .record_sync(WRITE_ELEMENT_SIZE);
        }

        let next_tail = ring::element_index(tail, 1);
        self.control.write_tail.store(next_tail, Ordering::Relaxed);
        if next_tail == 0 {
            self.control.dma_to_device.lock().record_wrap();
        }

        self.device
            .write_register(self.base + regs::RING_WRITE_BUFFER_TAIL_INDEX, next_tail)?;
        Ok(())
    }
}
