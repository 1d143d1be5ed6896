//! # Physical frame map
//!
//! One [`FrameSlot`] per frame of the managed range, indexed by frame number
//! relative to the first managed frame. An allocated run of `n` frames is one
//! [`FrameSlot::RunStart`] carrying `n`, followed by `n - 1`
//! [`FrameSlot::RunContinuation`] slots, so releasing a run only needs its
//! first frame.
//!
//! ```text
//!  index:  0      1      2      3      4      5
//!        ┌──────┬──────┬──────┬──────┬──────┬──────┐
//!        │ Free │ S(3) │  C   │  C   │ Free │ S(1) │
//!        └──────┴──────┴──────┴──────┴──────┴──────┘
//! ```
//!
//! The map never allocates after construction; it is meant to live behind a
//! spin lock.

use alloc::collections::TryReserveError;
use alloc::vec::Vec;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage};

/// State of a single frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameSlot {
    Free,
    /// First frame of an allocated run of the given length.
    RunStart(u32),
    /// Any later frame of an allocated run.
    RunContinuation,
}

/// Occupancy of every managed frame.
#[derive(Debug)]
pub struct FrameMap {
    base: PhysicalPage,
    slots: Vec<FrameSlot>,
    free: usize,
}

impl FrameMap {
    /// Build a map of `frames` free slots starting at `base`.
    ///
    /// # Errors
    /// Fails if the slot storage cannot be allocated.
    pub fn try_new(base: PhysicalPage, frames: usize) -> Result<Self, TryReserveError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(frames)?;
        Ok(Self::from_storage(slots, base, frames))
    }

    /// Build a map in pre-reserved storage.
    ///
    /// `storage` is cleared; slots beyond its capacity are dropped so the call
    /// never allocates.
    #[must_use]
    pub fn from_storage(mut storage: Vec<FrameSlot>, base: PhysicalPage, frames: usize) -> Self {
        storage.clear();
        let frames = frames.min(storage.capacity());
        storage.resize(frames, FrameSlot::Free);
        Self {
            base,
            slots: storage,
            free: frames,
        }
    }

    /// First managed frame.
    #[must_use]
    pub const fn base(&self) -> PhysicalPage {
        self.base
    }

    /// Number of managed frames.
    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub const fn free_frames(&self) -> usize {
        self.free
    }

    #[must_use]
    pub fn slot(&self, index: usize) -> Option<FrameSlot> {
        self.slots.get(index).copied()
    }

    /// Slot index of the frame containing `pa`, if it is managed here.
    #[must_use]
    pub fn index_of(&self, pa: PhysicalAddress) -> Option<usize> {
        let index = pa.page().number().checked_sub(self.base.number())? as usize;
        (index < self.slots.len()).then_some(index)
    }

    /// Physical address of slot `index`.
    ///
    /// # Panics
    /// If `index` lies outside the map.
    #[must_use]
    pub fn address_of(&self, index: usize) -> PhysicalAddress {
        assert!(index < self.slots.len(), "frame index {index} out of range");
        let Some(page) = u32::try_from(index)
            .ok()
            .and_then(|i| self.base.number().checked_add(i))
        else {
            panic!("frame index {index} overflows the physical address space");
        };
        PhysicalPage::from_number(page).base()
    }

    /// Reserve `frames` contiguous frames, first fit from index 0.
    ///
    /// Returns the index of the run's first slot, or `None` (map unchanged)
    /// if `frames` is zero or no run of free slots is long enough.
    pub fn reserve(&mut self, frames: u32) -> Option<usize> {
        let wanted = frames as usize;
        if wanted == 0 || wanted > self.free {
            return None;
        }

        let mut run = 0;
        let mut index = 0;
        while index < self.slots.len() {
            match self.slots[index] {
                FrameSlot::Free => {
                    run += 1;
                    if run == wanted {
                        let start = index + 1 - wanted;
                        self.mark(start, frames);
                        return Some(start);
                    }
                    index += 1;
                }
                FrameSlot::RunStart(len) => {
                    // Skip the whole run at once.
                    run = 0;
                    index += (len as usize).max(1);
                }
                FrameSlot::RunContinuation => {
                    run = 0;
                    index += 1;
                }
            }
        }
        None
    }

    /// Release the run starting at `index`.
    ///
    /// Returns the run length, or `None` (map unchanged) if `index` is not the
    /// first slot of an allocated run.
    pub fn release(&mut self, index: usize) -> Option<u32> {
        let FrameSlot::RunStart(len) = self.slot(index)? else {
            return None;
        };
        let run = &mut self.slots[index..index + len as usize];
        run.fill(FrameSlot::Free);
        self.free += run.len();
        Some(len)
    }

    fn mark(&mut self, start: usize, frames: u32) {
        let run = &mut self.slots[start..start + frames as usize];
        run[0] = FrameSlot::RunStart(frames);
        run[1..].fill(FrameSlot::RunContinuation);
        self.free -= run.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(frames: usize) -> FrameMap {
        FrameMap::try_new(PhysicalPage::from_number(0x10), frames).unwrap()
    }

    #[test]
    fn starts_all_free() {
        let m = map(8);
        assert_eq!(m.total_frames(), 8);
        assert_eq!(m.free_frames(), 8);
        assert!((0..8).all(|i| m.slot(i) == Some(FrameSlot::Free)));
        assert_eq!(m.slot(8), None);
    }

    #[test]
    fn reserve_marks_run_encoding() {
        let mut m = map(8);
        assert_eq!(m.reserve(3), Some(0));
        assert_eq!(m.slot(0), Some(FrameSlot::RunStart(3)));
        assert_eq!(m.slot(1), Some(FrameSlot::RunContinuation));
        assert_eq!(m.slot(2), Some(FrameSlot::RunContinuation));
        assert_eq!(m.slot(3), Some(FrameSlot::Free));
        assert_eq!(m.free_frames(), 5);
    }

    #[test]
    fn single_frame_run_has_no_continuations() {
        let mut m = map(2);
        assert_eq!(m.reserve(1), Some(0));
        assert_eq!(m.slot(0), Some(FrameSlot::RunStart(1)));
        assert_eq!(m.slot(1), Some(FrameSlot::Free));
    }

    #[test]
    fn first_fit_skips_runs_that_are_too_short() {
        // Free runs of 2, 5 and 3 separated by single allocated frames:
        // [F F A F F F F F A F F F]
        let mut m = map(12);
        assert_eq!(m.reserve(2), Some(0));
        assert_eq!(m.reserve(1), Some(2));
        assert_eq!(m.reserve(5), Some(3));
        assert_eq!(m.reserve(1), Some(8));
        assert_eq!(m.reserve(3), Some(9));
        assert_eq!(m.release(0), Some(2));
        assert_eq!(m.release(3), Some(5));
        assert_eq!(m.release(9), Some(3));
        assert_eq!(m.free_frames(), 10);

        assert_eq!(m.reserve(3), Some(3), "the 5-run is the first that fits");
        assert_eq!(m.reserve(2), Some(0), "the 2-run is first for 2 frames");
    }

    #[test]
    fn exhaustion_leaves_map_unchanged() {
        let mut m = map(4);
        assert_eq!(m.reserve(3), Some(0));
        let before: Vec<_> = (0..4).filter_map(|i| m.slot(i)).collect();
        assert_eq!(m.reserve(2), None);
        let after: Vec<_> = (0..4).filter_map(|i| m.slot(i)).collect();
        assert_eq!(before, after);
        assert_eq!(m.reserve(1), Some(3), "smaller requests still succeed");
    }

    #[test]
    fn fragmented_space_is_not_enough() {
        let mut m = map(5);
        let a = m.reserve(1).unwrap();
        m.reserve(1).unwrap();
        let c = m.reserve(1).unwrap();
        m.reserve(1).unwrap();
        m.release(a);
        m.release(c);
        // three free frames, but no two adjacent
        assert_eq!(m.free_frames(), 3);
        assert_eq!(m.reserve(2), None);
    }

    #[test]
    fn zero_frame_request_is_rejected() {
        let mut m = map(4);
        assert_eq!(m.reserve(0), None);
        assert_eq!(m.free_frames(), 4);
    }

    #[test]
    fn release_requires_run_start() {
        let mut m = map(4);
        m.reserve(3).unwrap();
        assert_eq!(m.release(1), None, "continuation");
        assert_eq!(m.release(3), None, "free");
        assert_eq!(m.release(99), None, "outside");
        assert_eq!(m.free_frames(), 1);
        assert_eq!(m.release(0), Some(3));
        assert_eq!(m.free_frames(), 4);
    }

    #[test]
    fn addresses_and_indices_round_trip() {
        let m = map(4);
        assert_eq!(m.address_of(0), PhysicalAddress::new(0x10_000));
        assert_eq!(m.address_of(3), PhysicalAddress::new(0x13_000));
        assert_eq!(m.index_of(PhysicalAddress::new(0x12_345)), Some(2));
        assert_eq!(m.index_of(PhysicalAddress::new(0xF_000)), None);
        assert_eq!(m.index_of(PhysicalAddress::new(0x14_000)), None);
    }

    #[test]
    fn from_storage_never_grows() {
        let storage: Vec<FrameSlot> = Vec::with_capacity(3);
        let m = FrameMap::from_storage(storage, PhysicalPage::from_number(0), 10);
        assert_eq!(m.total_frames(), 3);
    }
}
