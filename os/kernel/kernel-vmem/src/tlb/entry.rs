//! # MIPS R3000 TLB entry
//!
//! Each TLB slot is a pair of 32-bit registers.
//!
//! ```text
//! EntryHi:  | 31 ........... 12 | 11 ... 6 | 5 .. 0 |
//!           |        VPN        |   ASID   |   0    |
//!
//! EntryLo:  | 31 ........... 12 | 11 | 10 | 9 | 8 | 7 .. 0 |
//!           |        PFN        | N  | D  | V | G |   0    |
//! ```
//!
//! - `V` (valid): the slot translates; a miss is raised otherwise.
//! - `D` (dirty): writes are allowed. A write through a slot with `D=0`
//!   raises a read-only fault.
//! - `N` (no cache) and `G` (global, ignore ASID) are never set by this VM.

use bitfield_struct::bitfield;
use kernel_info::memory::{MIPS_KSEG0, PAGE_SHIFT};
use kernel_memory_addresses::{PhysicalPage, VirtualPage};

/// The EntryHi half of a TLB slot: which virtual page it matches.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct EntryHi {
    #[bits(6)]
    __: u8,

    /// Address space id (bits 6..=11). Unused; always zero here.
    #[bits(6)]
    pub asid: u8,

    /// Virtual page number (bits 12..=31).
    #[bits(20)]
    vpn: u32,
}

/// The EntryLo half of a TLB slot: where the page lives and how it may be used.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct EntryLo {
    #[bits(8)]
    __: u8,

    /// Global (G, bit 8): match regardless of ASID.
    pub global: bool,

    /// Valid (V, bit 9).
    pub valid: bool,

    /// Dirty (D, bit 10): the page is writable.
    pub dirty: bool,

    /// No cache (N, bit 11).
    pub nocache: bool,

    /// Physical frame number (bits 12..=31).
    #[bits(20)]
    pfn: u32,
}

impl EntryHi {
    /// EntryHi matching `page` with ASID 0.
    #[inline]
    #[must_use]
    pub const fn for_page(page: VirtualPage) -> Self {
        Self::new().with_vpn(page.number())
    }

    #[inline]
    #[must_use]
    pub const fn page(self) -> VirtualPage {
        VirtualPage::from_number(self.vpn())
    }
}

impl EntryLo {
    /// A valid EntryLo for `frame`, writable if `writable`.
    #[inline]
    #[must_use]
    pub const fn for_frame(frame: PhysicalPage, writable: bool) -> Self {
        Self::new()
            .with_pfn(frame.number())
            .with_valid(true)
            .with_dirty(writable)
    }

    #[inline]
    #[must_use]
    pub const fn frame(self) -> PhysicalPage {
        PhysicalPage::from_number(self.pfn())
    }
}

/// One TLB slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TlbEntry {
    pub hi: EntryHi,
    pub lo: EntryLo,
}

impl TlbEntry {
    /// A translation of `page` to `frame`.
    #[inline]
    #[must_use]
    pub const fn mapping(page: VirtualPage, frame: PhysicalPage, writable: bool) -> Self {
        Self {
            hi: EntryHi::for_page(page),
            lo: EntryLo::for_frame(frame, writable),
        }
    }

    /// The canonical invalid entry for `slot`.
    ///
    /// Each slot gets a distinct kseg0 page number so no two slots ever match
    /// the same address, and kseg0 is never translated through the TLB anyway.
    #[inline]
    #[must_use]
    pub const fn invalid(slot: usize) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let vpn = (MIPS_KSEG0 >> PAGE_SHIFT) + slot as u32;
        Self {
            hi: EntryHi::new().with_vpn(vpn),
            lo: EntryLo::new(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.lo.valid()
    }

    #[inline]
    #[must_use]
    pub const fn is_writable(self) -> bool {
        self.lo.dirty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_hi_layout() {
        let hi = EntryHi::for_page(VirtualPage::from_number(0x400));
        assert_eq!(u32::from(hi), 0x0040_0000);
        assert_eq!(hi.page().number(), 0x400);

        let hi = EntryHi::new().with_asid(0x3F).with_vpn(0xF_FFFF);
        assert_eq!(u32::from(hi), 0xFFFF_FFC0);
    }

    #[test]
    fn entry_lo_layout() {
        let lo = EntryLo::for_frame(PhysicalPage::from_number(0x123), true);
        assert_eq!(u32::from(lo), 0x0012_3000 | 1 << 9 | 1 << 10);
        assert!(lo.valid());
        assert!(lo.dirty());
        assert!(!lo.global());
        assert!(!lo.nocache());
        assert_eq!(lo.frame().number(), 0x123);

        let ro = EntryLo::for_frame(PhysicalPage::from_number(0x123), false);
        assert_eq!(u32::from(ro), 0x0012_3000 | 1 << 9);
    }

    #[test]
    fn invalid_entries_use_distinct_kseg0_pages() {
        let e0 = TlbEntry::invalid(0);
        let e5 = TlbEntry::invalid(5);
        assert_eq!(u32::from(e0.hi), 0x8000_0000);
        assert_eq!(u32::from(e5.hi), 0x8000_5000);
        assert_eq!(u32::from(e0.lo), 0);
        assert!(!e5.is_valid());
    }
}
