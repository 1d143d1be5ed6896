//! Kernel page backing for the kernel heap.
//!
//! Pages are physically contiguous frames addressed through kseg0, so no TLB
//! entry is ever needed to reach them.

use crate::frame_alloc::FrameAlloc;
use crate::phys_mapper::{kvaddr, kvaddr_to_paddr};
use kernel_memory_addresses::VirtualAddress;
use log::warn;

/// Reserve `npages` contiguous kernel pages.
///
/// Returns the kseg0 address of the first page, or `None` if the frames
/// cannot be reserved (including a zero-page request).
#[must_use]
pub fn alloc_kpages<A: FrameAlloc + ?Sized>(alloc: &A, npages: u32) -> Option<VirtualAddress> {
    let pa = alloc.reserve(npages).ok()?;
    let Some(va) = kvaddr(pa) else {
        // kseg0 cannot reach it; hand it straight back.
        alloc.release(pa);
        return None;
    };
    Some(va)
}

/// Release pages obtained from [`alloc_kpages`].
///
/// Addresses outside kseg0 are not kernel pages; they are logged and ignored.
///
/// # Panics
/// If `va` is a kernel page that does not start an allocated run.
pub fn free_kpages<A: FrameAlloc + ?Sized>(alloc: &A, va: VirtualAddress) {
    match kvaddr_to_paddr(va) {
        Some(pa) => alloc.release(pa),
        None => warn!("free_kpages({va}): not a kseg0 address; ignored"),
    }
}
