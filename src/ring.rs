// Lock-free bounded MPMC ring buffer
//
// Each cell carries a monotonic sequence counter that coordinates producers
// and consumers without locks; the write and read indices advance by
// compare-and-swap and live on separate cache lines.

use crate::error::Error;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Cache-aligned wrapper to prevent false sharing
#[repr(align(64))]
struct CacheAligned<T>(T);

/// One slot of the ring.
///
/// At rest, cell `i` holds `sequence ∈ {i + k·capacity, i + k·capacity + 1}`
/// where `k` counts the full laps the slot has seen.
struct Cell<T> {
    sequence: AtomicUsize,
    payload: UnsafeCell<MaybeUninit<T>>,
}

/// Bounded multi-producer/multi-consumer FIFO of owned values.
///
/// `push` never blocks: a full buffer rejects the value and hands it back.
/// `pop` never blocks: an empty buffer reports `None`.
pub struct RingBuffer<T> {
    cells: Box<[Cell<T>]>,
    mask: usize,
    enqueue_pos: CacheAligned<AtomicUsize>,
    dequeue_pos: CacheAligned<AtomicUsize>,
}

// SAFETY: RingBuffer is Sync because:
// - A slot is written only by the producer that won the CAS on enqueue_pos
//   and read only by the consumer that won the CAS on dequeue_pos.
// - The per-cell sequence (release store after write, acquire load before
//   read) publishes the payload before any other thread can touch the slot.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Create a buffer holding at least `requested` values.
    ///
    /// The actual length is the next power of two >= max(requested, 2).
    /// Fails with `InvalidCapacity` only when the rounded length, or the
    /// byte size of the cell array, overflows the address space.
    pub fn with_capacity(requested: usize) -> Result<Self, Error> {
        let len = requested
            .max(2)
            .checked_next_power_of_two()
            .ok_or(Error::InvalidCapacity(requested))?;
        len.checked_mul(std::mem::size_of::<Cell<T>>())
            .ok_or(Error::InvalidCapacity(requested))?;

        let cells: Box<[Cell<T>]> = (0..len)
            .map(|i| Cell {
                sequence: AtomicUsize::new(i),
                payload: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect();

        Ok(Self {
            cells,
            mask: len - 1,
            enqueue_pos: CacheAligned(AtomicUsize::new(0)),
            dequeue_pos: CacheAligned(AtomicUsize::new(0)),
        })
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Move `value` into the buffer.
    ///
    /// Returns `Err(value)` when the buffer is full; the caller decides
    /// whether that is a drop.
    pub fn push(&self, value: T) -> Result<(), T> {
        // Only writers advance enqueue_pos, so the initial load is relaxed
        let mut pos = self.enqueue_pos.0.load(Ordering::Relaxed);
        loop {
            let cell = &self.cells[pos & self.mask];
            let seq = cell.sequence.load(Ordering::Acquire);
            let diff = seq.wrapping_sub(pos) as isize;

            if diff == 0 {
                // Slot is writable; claim it by advancing the index
                match self.enqueue_pos.0.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: the CAS gave this thread exclusive
                        // ownership of the slot until the release store
                        // below publishes it to consumers.
                        unsafe { (*cell.payload.get()).write(value) };
                        cell.sequence.store(pos.wrapping_add(1), Ordering::Release);
                        return Ok(());
                    }
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                // The consumer has not freed this slot yet: full
                return Err(value);
            } else {
                // Another writer claimed the slot first; catch up
                pos = self.enqueue_pos.0.load(Ordering::Relaxed);
            }
        }
    }

    /// Take the oldest value out of the buffer, or `None` when empty.
    pub fn pop(&self) -> Option<T> {
        let mut pos = self.dequeue_pos.0.load(Ordering::Relaxed);
        loop {
            let cell = &self.cells[pos & self.mask];
            let seq = cell.sequence.load(Ordering::Acquire);
            let diff = seq.wrapping_sub(pos.wrapping_add(1)) as isize;

            if diff == 0 {
                match self.dequeue_pos.0.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: the CAS gave this thread exclusive
                        // ownership of a slot whose payload the producer
                        // published with the release store in `push`.
                        let value = unsafe { (*cell.payload.get()).assume_init_read() };
                        // Free the slot for the producer one lap ahead
                        cell.sequence
                            .store(pos.wrapping_add(self.cells.len()), Ordering::Release);
                        return Some(value);
                    }
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                // Nothing published at this position yet: empty
                return None;
            } else {
                // A writer is mid-publish or another reader advanced
                pos = self.dequeue_pos.0.load(Ordering::Relaxed);
            }
        }
    }

    /// Estimated number of queued values.
    ///
    /// Exact only without concurrent mutation; always <= capacity.
    pub fn len(&self) -> usize {
        let write = self.enqueue_pos.0.load(Ordering::Acquire);
        let read = self.dequeue_pos.0.load(Ordering::Acquire);
        let diff = write.wrapping_sub(read) as isize;
        if diff <= 0 {
            0
        } else {
            (diff as usize).min(self.cells.len())
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        // Release payloads that were published but never consumed
        while self.pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_capacity_rounds_up_to_power_of_two() {
        assert_eq!(RingBuffer::<u32>::with_capacity(0).unwrap().capacity(), 2);
        assert_eq!(RingBuffer::<u32>::with_capacity(1).unwrap().capacity(), 2);
        assert_eq!(RingBuffer::<u32>::with_capacity(3).unwrap().capacity(), 4);
        assert_eq!(RingBuffer::<u32>::with_capacity(4).unwrap().capacity(), 4);
        assert_eq!(RingBuffer::<u32>::with_capacity(5).unwrap().capacity(), 8);
        assert_eq!(
            RingBuffer::<u32>::with_capacity(1000).unwrap().capacity(),
            1024
        );
    }

    #[test]
    fn test_capacity_overflow_is_rejected() {
        assert!(matches!(
            RingBuffer::<u64>::with_capacity(usize::MAX),
            Err(Error::InvalidCapacity(_))
        ));
    }

    #[test]
    fn test_push_pop_basic() {
        let buffer = RingBuffer::with_capacity(4).unwrap();

        buffer.push(1u32).unwrap();
        buffer.push(2).unwrap();
        assert_eq!(buffer.len(), 2);

        assert_eq!(buffer.pop(), Some(1));
        assert_eq!(buffer.pop(), Some(2));
        assert_eq!(buffer.pop(), None);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_wraparound() {
        let buffer = RingBuffer::with_capacity(4).unwrap();

        for lap in 0..5u32 {
            for i in 0..4 {
                buffer.push(lap * 4 + i).unwrap();
            }
            for i in 0..4 {
                assert_eq!(buffer.pop(), Some(lap * 4 + i));
            }
        }
    }

    #[test]
    fn test_push_full_returns_value() {
        let buffer = RingBuffer::with_capacity(4).unwrap();

        for i in 0..4u32 {
            buffer.push(i).unwrap();
        }
        assert_eq!(buffer.push(99), Err(99));
        assert_eq!(buffer.len(), 4);

        // The rejected value is never observed by a pop
        for i in 0..4u32 {
            assert_eq!(buffer.pop(), Some(i));
        }
        assert_eq!(buffer.pop(), None);
    }

    #[test]
    fn test_no_loss_when_not_full() {
        let buffer = RingBuffer::with_capacity(8).unwrap();

        for i in 0..8u32 {
            buffer.push(i).unwrap();
        }
        let mut seen = Vec::new();
        while let Some(v) = buffer.pop() {
            seen.push(v);
        }
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_len_is_bounded_by_capacity() {
        let buffer = RingBuffer::with_capacity(2).unwrap();
        buffer.push(1u8).unwrap();
        buffer.push(2).unwrap();
        let _ = buffer.push(3);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_drop_releases_pending_values() {
        let marker = Arc::new(());
        {
            let buffer = RingBuffer::with_capacity(4).unwrap();
            buffer.push(Arc::clone(&marker)).unwrap();
            buffer.push(Arc::clone(&marker)).unwrap();
            assert_eq!(Arc::strong_count(&marker), 3);
        }
        assert_eq!(Arc::strong_count(&marker), 1);
    }

    #[test]
    fn test_concurrent_producers_single_consumer() {
        const PRODUCERS: u64 = 4;
        const PER_PRODUCER: u64 = 10_000;

        let buffer = Arc::new(RingBuffer::with_capacity(1024).unwrap());
        let mut handles = Vec::new();

        for p in 0..PRODUCERS {
            let buffer = Arc::clone(&buffer);
            handles.push(thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let mut value = p * PER_PRODUCER + i;
                    // Spin until accepted; the consumer is draining
                    loop {
                        match buffer.push(value) {
                            Ok(()) => break,
                            Err(v) => {
                                value = v;
                                thread::yield_now();
                            }
                        }
                    }
                }
            }));
        }

        let consumer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                let mut seen = Vec::with_capacity((PRODUCERS * PER_PRODUCER) as usize);
                while seen.len() < (PRODUCERS * PER_PRODUCER) as usize {
                    match buffer.pop() {
                        Some(v) => seen.push(v),
                        None => thread::yield_now(),
                    }
                }
                seen
            })
        };

        for handle in handles {
            handle.join().unwrap();
        }
        let seen = consumer.join().unwrap();

        // Every push is popped exactly once
        assert_eq!(seen.len(), (PRODUCERS * PER_PRODUCER) as usize);
        let mut sorted = seen.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), seen.len());

        // Within each producer's subsequence, pop order equals push order
        let mut last: HashMap<u64, u64> = HashMap::new();
        for v in seen {
            let producer = v / PER_PRODUCER;
            if let Some(prev) = last.insert(producer, v) {
                assert!(prev < v, "producer {producer} reordered: {prev} after {v}");
            }
        }
    }

    #[test]
    fn test_concurrent_producers_and_consumers() {
        const PRODUCERS: u64 = 2;
        const CONSUMERS: usize = 2;
        const PER_PRODUCER: u64 = 5_000;

        let buffer = Arc::new(RingBuffer::with_capacity(256).unwrap());
        let mut producers = Vec::new();
        for p in 0..PRODUCERS {
            let buffer = Arc::clone(&buffer);
            producers.push(thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let mut value = p * PER_PRODUCER + i;
                    loop {
                        match buffer.push(value) {
                            Ok(()) => break,
                            Err(v) => {
                                value = v;
                                thread::yield_now();
                            }
                        }
                    }
                }
            }));
        }

        let total = (PRODUCERS * PER_PRODUCER) as usize;
        let popped = Arc::new(AtomicUsize::new(0));
        let mut consumers = Vec::new();
        for _ in 0..CONSUMERS {
            let buffer = Arc::clone(&buffer);
            let popped = Arc::clone(&popped);
            consumers.push(thread::spawn(move || {
                let mut seen = Vec::new();
                while popped.load(Ordering::Relaxed) < total {
                    match buffer.pop() {
                        Some(v) => {
                            popped.fetch_add(1, Ordering::Relaxed);
                            seen.push(v);
                        }
                        None => thread::yield_now(),
                    }
                }
                seen
            }));
        }

        for handle in producers {
            handle.join().unwrap();
        }
        let mut all = Vec::new();
        for handle in consumers {
            all.extend(handle.join().unwrap());
        }

        assert_eq!(all.len(), total);
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
    }
}
