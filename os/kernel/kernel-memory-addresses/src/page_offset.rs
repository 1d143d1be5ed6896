use crate::{MemoryAddress, PAGE_FRAME, PAGE_SIZE};
use core::fmt;

/// The offset within a page (`0..PAGE_SIZE`).
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PageOffset {
    value: u32,
}

impl PageOffset {
    /// Create from a raw value, asserting it is < `PAGE_SIZE` in debug.
    #[inline]
    #[must_use]
    pub const fn new(value: u32) -> Self {
        debug_assert!(value < PAGE_SIZE, "offset must be < page size");
        Self {
            value: value & !PAGE_FRAME,
        }
    }

    /// Construct from a full address's offset bits.
    #[inline]
    #[must_use]
    pub const fn from_addr(addr: MemoryAddress) -> Self {
        Self {
            value: addr.as_u32() & !PAGE_FRAME,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.value
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.value as usize
    }

    /// Bytes left in the page from this offset to its end.
    #[inline]
    #[must_use]
    pub const fn remaining(self) -> u32 {
        PAGE_SIZE - self.value
    }
}

impl fmt::Debug for PageOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageOffset({:#X})", self.value)
    }
}
