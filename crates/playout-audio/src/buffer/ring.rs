//! Lock-free ring buffer of PCM samples.
//!
//! Single-producer, single-consumer: a sink's `write` pushes interleaved
//! `i16` samples and the device callback drains them.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Lock-free single-producer, single-consumer ring buffer.
///
/// Allocation happens once in `new`; `write` and `read` never allocate.
pub struct RingBuffer {
    /// Sample storage. Slots are only touched by the side that owns them.
    buffer: Box<[UnsafeCell<i16>]>,
    /// Current read position.
    read_pos: AtomicUsize,
    /// Current write position.
    write_pos: AtomicUsize,
    /// Buffer capacity (power of 2 for efficient modulo).
    capacity: usize,
    /// Mask for efficient modulo (capacity - 1).
    mask: usize,
}

impl RingBuffer {
    /// Create a new ring buffer with the specified capacity in samples.
    ///
    /// The capacity will be rounded up to the next power of 2.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        let buffer = (0..capacity).map(|_| UnsafeCell::new(0i16)).collect();

        Self {
            buffer,
            read_pos: AtomicUsize::new(0),
            write_pos: AtomicUsize::new(0),
            capacity,
            mask: capacity - 1,
        }
    }

    /// Get the buffer capacity.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the number of samples available for reading.
    pub fn available(&self) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }

    /// Get the number of free slots for writing.
    pub fn free(&self) -> usize {
        self.capacity - self.available()
    }

    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    pub fn is_full(&self) -> bool {
        self.free() == 0
    }

    fn slots(&self) -> *mut i16 {
        // UnsafeCell<i16> has the same layout as i16.
        UnsafeCell::raw_get(self.buffer.as_ptr())
    }

    /// Write samples to the buffer.
    ///
    /// Returns the number of samples actually written. Producer side only.
    pub fn write(&self, samples: &[i16]) -> usize {
        let write_pos = self.write_pos.load(Ordering::Relaxed);
        let read_pos = self.read_pos.load(Ordering::Acquire);

        let available_space = self.capacity - write_pos.wrapping_sub(read_pos);
        let to_write = samples.len().min(available_space);

        if to_write == 0 {
            return 0;
        }

        let start_idx = write_pos & self.mask;
        let first_chunk = to_write.min(self.capacity - start_idx);
        let slots = self.slots();

        // SAFETY: only the producer writes, and the slots in
        // [write_pos, write_pos + to_write) are not visible to the consumer
        // until write_pos is published below.
        #[allow(unsafe_code)]
        unsafe {
            std::ptr::copy_nonoverlapping(samples.as_ptr(), slots.add(start_idx), first_chunk);
            if first_chunk < to_write {
                std::ptr::copy_nonoverlapping(
                    samples.as_ptr().add(first_chunk),
                    slots,
                    to_write - first_chunk,
                );
            }
        }

        self.write_pos
            .store(write_pos.wrapping_add(to_write), Ordering::Release);

        to_write
    }

    /// Read samples from the buffer.
    ///
    /// Returns the number of samples actually read. Consumer side only.
    pub fn read(&self, output: &mut [i16]) -> usize {
        let read_pos = self.read_pos.load(Ordering::Relaxed);
        let write_pos = self.write_pos.load(Ordering::Acquire);

        let available = write_pos.wrapping_sub(read_pos);
        let to_read = output.len().min(available);

        if to_read == 0 {
            return 0;
        }

        let start_idx = read_pos & self.mask;
        let first_chunk = to_read.min(self.capacity - start_idx);
        let slots = self.slots();

        // SAFETY: only the consumer reads, and the producer does not touch
        // [read_pos, read_pos + to_read) until read_pos is published below.
        #[allow(unsafe_code)]
        unsafe {
            std::ptr::copy_nonoverlapping(slots.add(start_idx), output.as_mut_ptr(), first_chunk);
            if first_chunk < to_read {
                std::ptr::copy_nonoverlapping(
                    slots,
                    output.as_mut_ptr().add(first_chunk),
                    to_read - first_chunk,
                );
            }
        }

        self.read_pos
            .store(read_pos.wrapping_add(to_read), Ordering::Release);

        to_read
    }
}

// SAFETY: producer and consumer operate on disjoint slot ranges coordinated
// by the atomic positions, so sharing across threads is sound.
#[allow(unsafe_code)]
unsafe impl Sync for RingBuffer {}

/// Thread-safe reference to a ring buffer.
pub type SharedRingBuffer = Arc<RingBuffer>;

/// Create a new shared ring buffer.
pub fn shared_ring_buffer(capacity: usize) -> SharedRingBuffer {
    Arc::new(RingBuffer::new(capacity))
}
