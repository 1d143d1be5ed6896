//! # Memory Layout

/// Size of a page and of a physical frame, in bytes.
pub const PAGE_SIZE: u32 = 4096;

/// log2 of [`PAGE_SIZE`].
pub const PAGE_SHIFT: u32 = 12;

/// Mask selecting the page-frame bits of an address.
pub const PAGE_FRAME: u32 = !(PAGE_SIZE - 1);

/// Base of kseg0, the unmapped cached kernel segment.
///
/// Physical memory is reachable from the kernel at `MIPS_KSEG0 + pa`.
pub const MIPS_KSEG0: u32 = 0x8000_0000;

/// Base of kseg1 (unmapped, uncached). Ends the direct-mapped kseg0 window.
pub const MIPS_KSEG1: u32 = 0xa000_0000;

/// Top of the user stack; the first address above user space.
pub const USERSTACK: u32 = MIPS_KSEG0;

/// Number of pages in every user stack (48 KiB).
pub const STACK_PAGES: u32 = 12;

/// Lowest address of the fixed user stack window.
pub const USERSTACK_BASE: u32 = USERSTACK - STACK_PAGES * PAGE_SIZE;

/// Number of slots in the hardware TLB.
pub const NUM_TLB: usize = 64;

const _: () = {
    assert!(PAGE_SIZE == 1 << PAGE_SHIFT);
    assert!(USERSTACK % PAGE_SIZE == 0);
    assert!(USERSTACK_BASE < USERSTACK);
    assert!(MIPS_KSEG1 > MIPS_KSEG0);
    // Invalid EntryHi values are built from kseg0 page numbers, one per slot.
    assert!(NUM_TLB <= ((MIPS_KSEG1 - MIPS_KSEG0) >> PAGE_SHIFT) as usize);
};
