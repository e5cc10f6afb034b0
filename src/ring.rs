//! Ring controller: the three metadata counters and the finalize /
//! consume index arithmetic for multi-slot regions.
//!
//! Present only when `slot_count > 1`. The staging map that `publish`
//! accumulates into lives on the handle, not here or in shared memory.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metadata header: three little-endian u64 counters at the start of the
/// region, in order: write_index, read_index, count.
pub(crate) struct RingMetadata {
    base: *mut u8,
}

impl RingMetadata {
    /// # Safety
    /// `base` must point to at least 24 writable/readable bytes.
    pub(crate) unsafe fn at(base: *mut u8) -> Self {
        Self { base }
    }

    unsafe fn counter(&self, index: usize) -> &AtomicU64 {
        &*(self.base.add(index * 8) as *const AtomicU64)
    }

    pub(crate) fn init(&self) {
        unsafe {
            self.counter(0).store(0, Ordering::Relaxed);
            self.counter(1).store(0, Ordering::Relaxed);
            self.counter(2).store(0, Ordering::Relaxed);
        }
    }

    pub(crate) fn write_index(&self) -> u64 {
        unsafe { self.counter(0).load(Ordering::Acquire) }
    }

    pub(crate) fn read_index(&self) -> u64 {
        unsafe { self.counter(1).load(Ordering::Acquire) }
    }

    pub(crate) fn count(&self) -> u64 {
        unsafe { self.counter(2).load(Ordering::Acquire) }
    }

    fn set(&self, write_index: u64, read_index: u64, count: u64) {
        unsafe {
            self.counter(0).store(write_index, Ordering::Release);
            self.counter(1).store(read_index, Ordering::Release);
            self.counter(2).store(count, Ordering::Release);
        }
    }

    /// Commit a finalize: returns the slot index to write into, and advances
    /// the counters per the overwrite-oldest policy.
    pub(crate) fn commit_write(&self, slot_count: u64) -> u64 {
        let write_index = self.write_index();
        let mut read_index = self.read_index();
        let mut count = self.count();

        let target = write_index % slot_count;
        let new_write_index = write_index + 1;
        if count < slot_count {
            count += 1;
        } else {
            read_index += 1;
        }

        self.set(new_write_index, read_index, count);
        target
    }

    /// Resolve the slot to consume next. `latest` discards the backlog by
    /// jumping `read_index` to `write_index - 1` first. Returns `None` if
    /// the ring is empty.
    pub(crate) fn prepare_read(&self, slot_count: u64, latest: bool) -> Option<u64> {
        let write_index = self.write_index();
        let mut read_index = self.read_index();
        let mut count = self.count();

        if count == 0 {
            return None;
        }

        if latest && count > 1 {
            read_index = write_index - 1;
            count = 1;
            self.set(write_index, read_index, count);
        }

        Some(read_index % slot_count)
    }

    /// Advance past a successfully consumed slot.
    pub(crate) fn advance_read(&self) {
        let write_index = self.write_index();
        let read_index = self.read_index();
        let count = self.count();
        self.set(write_index, read_index + 1, count.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s4_ring_fifo_with_overrun() {
        let mut buf = vec![0u8; 24];
        let meta = unsafe { RingMetadata::at(buf.as_mut_ptr()) };
        meta.init();

        let slot_count = 3;
        for _ in 0..5u64 {
            meta.commit_write(slot_count);
        }
        assert_eq!(meta.write_index(), 5);
        assert_eq!(meta.count(), 3);
        assert_eq!(meta.read_index(), 2);

        let mut consumed = Vec::new();
        while let Some(slot) = meta.prepare_read(slot_count, false) {
            consumed.push(slot);
            meta.advance_read();
        }
        assert_eq!(consumed, vec![2, 0, 1]);
        assert_eq!(meta.prepare_read(slot_count, false), None);
    }

    #[test]
    fn s5_latest_skip() {
        let mut buf = vec![0u8; 24];
        let meta = unsafe { RingMetadata::at(buf.as_mut_ptr()) };
        meta.init();

        let slot_count = 5;
        for _ in 0..5u64 {
            meta.commit_write(slot_count);
        }

        let slot = meta.prepare_read(slot_count, true).unwrap();
        assert_eq!(slot, (meta.write_index() - 1) % slot_count);
        assert_eq!(meta.count(), 1);
    }
}
