//! # Software-managed TLB
//!
//! There is no page-table walker: every translation the CPU uses was written
//! into a TLB slot by the kernel. The TLB is a cache of the address space and
//! can always be rebuilt from it, so invalidating everything is always safe.
//!
//! [`Tlb`] is the hardware interface (read/write a slot, write a random slot);
//! [`SoftTlb`] implements it in memory for hosted builds and tests.

mod entry;
mod soft;

pub use entry::{EntryHi, EntryLo, TlbEntry};
pub use soft::SoftTlb;

use kernel_sync::{InterruptMask, IrqGuard};

/// Access to the translation lookaside buffer.
///
/// Callers mask interrupts around every sequence of operations; a slot that is
/// read and then written must not change in between.
pub trait Tlb {
    /// Number of slots (64 on the target).
    fn slots(&self) -> usize;

    /// Read slot `slot`.
    fn read(&self, slot: usize) -> TlbEntry;

    /// Overwrite slot `slot`.
    fn write(&self, slot: usize, entry: TlbEntry);

    /// Overwrite a slot chosen by the hardware's random register.
    fn write_random(&self, entry: TlbEntry);

    /// Slot whose EntryHi matches `hi`, if any.
    fn probe(&self, hi: EntryHi) -> Option<usize> {
        (0..self.slots()).find(|&slot| self.read(slot).hi == hi)
    }
}

impl<T: Tlb + ?Sized> Tlb for &T {
    fn slots(&self) -> usize {
        (**self).slots()
    }

    fn read(&self, slot: usize) -> TlbEntry {
        (**self).read(slot)
    }

    fn write(&self, slot: usize, entry: TlbEntry) {
        (**self).write(slot, entry);
    }

    fn write_random(&self, entry: TlbEntry) {
        (**self).write_random(entry);
    }
}

/// Invalidate every slot with interrupts masked.
pub fn flush_all<T: Tlb + ?Sized, I: InterruptMask + ?Sized>(tlb: &T, irq: &I) {
    let _irq = IrqGuard::new(irq);
    for slot in 0..tlb.slots() {
        tlb.write(slot, TlbEntry::invalid(slot));
    }
}

/// Install `entry` in the first invalid slot, or a random slot if every slot
/// is valid. Interrupts are masked for the whole scan-and-write.
///
/// Returns the slot used, or `None` when a random slot was overwritten.
#[must_use = "`None` means a random slot was overwritten"]
pub fn install<T: Tlb + ?Sized, I: InterruptMask + ?Sized>(
    tlb: &T,
    irq: &I,
    entry: TlbEntry,
) -> Option<usize> {
    let _irq = IrqGuard::new(irq);
    let free = (0..tlb.slots()).find(|&slot| !tlb.read(slot).is_valid());
    match free {
        Some(slot) => tlb.write(slot, entry),
        None => tlb.write_random(entry),
    }
    free
}
