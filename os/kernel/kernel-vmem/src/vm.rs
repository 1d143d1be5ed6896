//! The VM entry points the rest of the kernel calls.

use crate::address_space::AddressSpace;
use crate::fault::{self, FaultError};
use crate::tlb::{self, Tlb};
use alloc::sync::Arc;
use kernel_alloc::{FrameAllocError, PhysFrameAllocator, PhysMapper};
use kernel_memory_addresses::VirtualAddress;
use kernel_sync::InterruptMask;
use log::debug;

/// An address space drawing from the kernel's frame allocator.
pub type UserSpace<M> = AddressSpace<PhysFrameAllocator<M>>;

/// A request to invalidate one translation on this CPU.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TlbShootdown {
    pub addr: VirtualAddress,
}

/// The virtual memory system: one frame allocator shared with every address
/// space, the TLB, and the interrupt mask guarding it.
pub struct Vm<M, T, I> {
    frames: Arc<PhysFrameAllocator<M>>,
    tlb: T,
    irq: I,
}

impl<M, T, I> Vm<M, T, I>
where
    M: PhysMapper,
    T: Tlb,
    I: InterruptMask,
{
    #[must_use]
    pub fn new(frames: PhysFrameAllocator<M>, tlb: T, irq: I) -> Self {
        Self {
            frames: Arc::new(frames),
            tlb,
            irq,
        }
    }

    /// Switch the frame allocator to normal mode.
    ///
    /// # Errors
    /// See [`PhysFrameAllocator::bootstrap`].
    pub fn bootstrap(&self) -> Result<usize, FrameAllocError> {
        self.frames.bootstrap()
    }

    #[must_use]
    pub const fn frames(&self) -> &Arc<PhysFrameAllocator<M>> {
        &self.frames
    }

    #[must_use]
    pub const fn tlb(&self) -> &T {
        &self.tlb
    }

    #[must_use]
    pub const fn irq(&self) -> &I {
        &self.irq
    }

    /// Backing pages for the kernel heap; see [`kernel_alloc::alloc_kpages`].
    #[must_use]
    pub fn alloc_kpages(&self, npages: u32) -> Option<VirtualAddress> {
        kernel_alloc::alloc_kpages(&*self.frames, npages)
    }

    pub fn free_kpages(&self, va: VirtualAddress) {
        kernel_alloc::free_kpages(&*self.frames, va);
    }

    /// A new, empty address space.
    #[must_use]
    pub fn create_address_space(&self) -> UserSpace<M> {
        AddressSpace::new(Arc::clone(&self.frames))
    }

    /// Handle a TLB fault against the current process's address space.
    ///
    /// `space` is `None` for a kernel thread or a process without one.
    ///
    /// # Errors
    /// See [`fault::handle_fault`]; [`FaultError::errno`] gives the number
    /// to return to the trap layer.
    pub fn vm_fault(
        &self,
        kind: u32,
        addr: VirtualAddress,
        space: Option<&UserSpace<M>>,
    ) -> Result<(), FaultError> {
        fault::handle_fault(kind, addr, space, &self.tlb, &self.irq)
    }

    /// Make `space` current. A kernel thread (`None`) keeps whatever the TLB
    /// holds.
    pub fn activate(&self, space: Option<&UserSpace<M>>) {
        if let Some(space) = space {
            space.activate(&self.tlb, &self.irq);
        }
    }

    /// Finish loading `space`: text pages become read-only and any writable
    /// text translation left over from the load is flushed.
    pub fn complete_load(&self, space: &mut UserSpace<M>) {
        space.complete_load();
        tlb::flush_all(&self.tlb, &self.irq);
        debug!("load complete; TLB flushed");
    }

    /// Remote TLB invalidation. There is only one CPU.
    ///
    /// # Panics
    /// Always.
    #[allow(clippy::unused_self)]
    pub fn tlb_shootdown(&self, shootdown: &TlbShootdown) {
        panic!("BUG: TLB shootdown of {} is not supported", shootdown.addr);
    }

    /// Remote invalidation of the whole TLB. There is only one CPU.
    ///
    /// # Panics
    /// Always.
    #[allow(clippy::unused_self)]
    pub fn tlb_shootdown_all(&self) {
        panic!("BUG: TLB shootdown is not supported");
    }
}

impl<M, T, I> core::fmt::Debug for Vm<M, T, I>
where
    M: PhysMapper,
    T: Tlb,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Vm")
            .field("free_frames", &self.frames.free_frames())
            .field("tlb_slots", &self.tlb.slots())
            .finish_non_exhaustive()
    }
}
