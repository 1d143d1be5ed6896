//! # Reaching physical memory from the kernel
//!
//! On MIPS every physical address below 512 MiB is visible in kseg0, an
//! unmapped, cached window starting at `0x8000_0000`. The kernel never goes
//! through the TLB to touch a frame; it adds the kseg0 base and dereferences.
//!
//! [`PhysMapper`] abstracts that step so the allocator and the address spaces
//! can run against simulated RAM in tests. [`Kseg0PhysMapper`] is the real
//! thing.
//!
//! ## Example
//! ```rust
//! use kernel_alloc::phys_mapper::{kvaddr, kvaddr_to_paddr};
//! use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
//!
//! let pa = PhysicalAddress::new(0x0004_2000);
//! let va = kvaddr(pa).unwrap();
//! assert_eq!(va, VirtualAddress::new(0x8004_2000));
//! assert_eq!(kvaddr_to_paddr(va), Some(pa));
//! ```

use kernel_info::memory::{MIPS_KSEG0, MIPS_KSEG1, PAGE_SIZE};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, VirtualAddress};

/// Bytes in one frame, as a `usize` for slicing.
pub const FRAME_BYTES: usize = PAGE_SIZE as usize;

/// The contents of one physical frame.
#[repr(C, align(4096))]
pub struct Frame(pub [u8; FRAME_BYTES]);

impl Frame {
    #[must_use]
    pub const fn zeroed() -> Self {
        Self([0; FRAME_BYTES])
    }
}

/// Converts physical addresses to usable references in the kernel's address
/// space.
///
/// # Safety
/// - `pa` must be backed by RAM that the mapper can reach.
/// - Lifetime `'a` is purely borrow-checked; the caller must not create two
///   live `&mut` to the same frame.
/// - Type `T` must match the bytes at `pa`.
pub trait PhysMapper {
    /// Convert a *physical* address to a mutable reference.
    ///
    /// # Safety
    /// See the trait documentation.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;

    /// The bytes of the frame `page`.
    ///
    /// # Safety
    /// Same contract as [`phys_to_mut`](Self::phys_to_mut).
    #[inline]
    unsafe fn frame_mut<'a>(&self, page: PhysicalPage) -> &'a mut [u8; FRAME_BYTES] {
        // SAFETY: forwarded to the caller; a frame base is always Frame-aligned.
        let frame: &mut Frame = unsafe { self.phys_to_mut(page.base()) };
        &mut frame.0
    }
}

impl<M: PhysMapper + ?Sized> PhysMapper for &M {
    #[inline]
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        unsafe { (**self).phys_to_mut(pa) }
    }
}

/// [`PhysMapper`] for kernels running out of kseg0.
///
/// Only meaningful on the target: the returned references point at
/// `MIPS_KSEG0 + pa`.
#[derive(Debug, Default, Copy, Clone)]
pub struct Kseg0PhysMapper;

impl PhysMapper for Kseg0PhysMapper {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        let Some(va) = kvaddr(pa) else {
            panic!("BUG: physical address {pa} is outside kseg0");
        };
        let ptr = va.as_u32() as usize as *mut T;
        // SAFETY: Caller must ensure the physical address is valid RAM.
        unsafe { &mut *ptr }
    }
}

/// Kernel virtual address of `pa` in kseg0, or `None` if kseg0 cannot reach it.
#[inline]
#[must_use]
pub const fn kvaddr(pa: PhysicalAddress) -> Option<VirtualAddress> {
    if pa.as_u32() >= MIPS_KSEG1 - MIPS_KSEG0 {
        return None;
    }
    Some(VirtualAddress::new(pa.as_u32() + MIPS_KSEG0))
}

/// Physical address behind a kseg0 address, or `None` outside kseg0.
#[inline]
#[must_use]
pub const fn kvaddr_to_paddr(va: VirtualAddress) -> Option<PhysicalAddress> {
    let v = va.as_u32();
    if v < MIPS_KSEG0 || v >= MIPS_KSEG1 {
        return None;
    }
    Some(PhysicalAddress::new(v - MIPS_KSEG0))
}
