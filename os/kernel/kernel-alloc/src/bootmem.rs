//! Boot-time RAM accounting.
//!
//! Until the frame map exists, memory is handed out by bumping a cursor over
//! the RAM that follows the kernel image. Nothing handed out here is ever
//! returned. Once the frame map is built the remaining range is handed off
//! and the bump allocator goes dry.

use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, pages_for};

/// Monotonic bump allocator over `[next, end)`.
#[derive(Debug)]
pub struct BootMemory {
    /// First physical byte not yet handed out (frame aligned).
    next: PhysicalAddress,
    /// Exclusive end of RAM.
    end: PhysicalAddress,
    /// Frames handed out through [`steal`](Self::steal).
    stolen: u32,
    /// Set once the remaining range was given to the frame map.
    handed_off: bool,
}

impl BootMemory {
    /// Manage RAM from `first_free` (the first byte after the kernel image)
    /// up to `ram_size`.
    ///
    /// `first_free` is rounded up to a frame boundary; a `first_free` past the
    /// end leaves nothing to hand out.
    #[must_use]
    pub fn new(first_free: PhysicalAddress, ram_size: u32) -> Self {
        let end = PhysicalAddress::new(ram_size & !(PAGE_SIZE - 1));
        let next = match first_free.align_up() {
            Some(next) if next <= end => next,
            _ => end,
        };
        Self {
            next,
            end,
            stolen: 0,
            handed_off: false,
        }
    }

    /// Take `npages` contiguous frames off the front of the free range.
    ///
    /// Returns `None` for a zero-page request, on exhaustion, or after the
    /// range was handed off.
    pub fn steal(&mut self, npages: u32) -> Option<PhysicalAddress> {
        if npages == 0 || self.handed_off {
            return None;
        }
        let bytes = npages.checked_mul(PAGE_SIZE)?;
        let new_next = self.next.as_u32().checked_add(bytes)?;
        if new_next > self.end.as_u32() {
            return None;
        }
        let pa = self.next;
        self.next = PhysicalAddress::new(new_next);
        self.stolen += npages;
        Some(pa)
    }

    /// The range not yet handed out, without consuming it.
    #[must_use]
    pub const fn remaining(&self) -> (PhysicalAddress, PhysicalAddress) {
        (self.next, self.end)
    }

    /// Number of whole frames left.
    #[must_use]
    pub const fn remaining_frames(&self) -> u32 {
        if self.handed_off {
            return 0;
        }
        (self.end.as_u32() - self.next.as_u32()) / PAGE_SIZE
    }

    /// Frames handed out so far.
    #[must_use]
    pub const fn stolen_frames(&self) -> u32 {
        self.stolen
    }

    /// Hand the remaining range over for good.
    ///
    /// Returns `None` if it was already taken. Afterwards [`steal`](Self::steal)
    /// always fails.
    pub const fn take_remaining(&mut self) -> Option<(PhysicalAddress, PhysicalAddress)> {
        if self.handed_off {
            return None;
        }
        self.handed_off = true;
        Some((self.next, self.end))
    }

    #[must_use]
    pub const fn is_handed_off(&self) -> bool {
        self.handed_off
    }
}

/// Frames covering `[lo, hi)`; zero for an empty or inverted range.
#[inline]
#[must_use]
pub(crate) const fn frames_between(lo: PhysicalAddress, hi: PhysicalAddress) -> u32 {
    if hi.as_u32() <= lo.as_u32() {
        return 0;
    }
    pages_for(hi.as_u32() - lo.as_u32())
}
