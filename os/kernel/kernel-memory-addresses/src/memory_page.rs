use crate::{MemoryAddress, PAGE_FRAME, PAGE_SHIFT, PageOffset};
use core::fmt;

/// A page base address (lower `PAGE_SHIFT` bits are zero).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MemoryPage {
    value: u32,
}

impl MemoryPage {
    /// Create from a raw address, aligning down to the page boundary.
    #[inline]
    #[must_use]
    pub const fn from_addr(addr: MemoryAddress) -> Self {
        Self {
            value: addr.as_u32() & PAGE_FRAME,
        }
    }

    /// Page that contains `addr` (aligns down).
    #[inline]
    #[must_use]
    pub const fn containing(addr: u32) -> Self {
        Self::from_addr(MemoryAddress::new(addr))
    }

    /// Create from a raw value that must already be aligned.
    /// Panics in debug if unaligned (no runtime cost in release).
    #[inline]
    #[must_use]
    pub fn new_aligned(addr: MemoryAddress) -> Self {
        debug_assert!(addr.is_page_aligned(), "unaligned page address");
        Self {
            value: addr.as_u32(),
        }
    }

    /// Page with the given page number.
    #[inline]
    #[must_use]
    pub const fn from_number(number: u32) -> Self {
        Self {
            value: number << PAGE_SHIFT,
        }
    }

    /// Return the base as `MemoryAddress`.
    #[inline]
    #[must_use]
    pub const fn base(self) -> MemoryAddress {
        MemoryAddress::new(self.value)
    }

    /// The page number (base address shifted down by `PAGE_SHIFT`).
    #[inline]
    #[must_use]
    pub const fn number(self) -> u32 {
        self.value >> PAGE_SHIFT
    }

    /// Combine with an offset to form a full address.
    #[inline]
    #[must_use]
    pub const fn join(self, off: PageOffset) -> MemoryAddress {
        MemoryAddress::new(self.value | off.as_u32())
    }

    /// The page `count` pages above this one, or `None` past the 32-bit space.
    #[inline]
    #[must_use]
    pub const fn checked_add_pages(self, count: u32) -> Option<Self> {
        match self.number().checked_add(count) {
            Some(n) if n <= (u32::MAX >> PAGE_SHIFT) => Some(Self::from_number(n)),
            _ => None,
        }
    }

    /// Number of pages from `earlier` up to this page, or `None` if `earlier` lies above.
    #[inline]
    #[must_use]
    pub const fn pages_since(self, earlier: Self) -> Option<u32> {
        self.number().checked_sub(earlier.number())
    }
}

impl fmt::Display for MemoryPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}/4K", self.value)
    }
}

impl fmt::Debug for MemoryPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryPage(0x{:08X})", self.value)
    }
}

impl From<MemoryAddress> for MemoryPage {
    #[inline]
    fn from(addr: MemoryAddress) -> Self {
        Self::from_addr(addr)
    }
}
