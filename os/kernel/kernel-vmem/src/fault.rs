//! # TLB Refill
//!
//! Every user-space TLB miss lands in [`handle_fault`]. The faulting page is
//! resolved against the current address space and the translation written
//! into the TLB; the CPU then retries the access.
//!
//! A write to a page whose entry has the dirty bit clear raises a read-only
//! fault. Only text pages of a loaded program are mapped that way, so such a
//! fault is never retried.

use crate::address_space::AddressSpace;
use crate::errno::Errno;
use crate::tlb::{self, Tlb, TlbEntry};
use kernel_alloc::FrameAlloc;
use kernel_memory_addresses::VirtualAddress;
use kernel_sync::InterruptMask;
use log::debug;

/// Why the CPU trapped.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum FaultKind {
    /// TLB miss on a load or instruction fetch.
    Read = 0,
    /// TLB miss on a store.
    Write = 1,
    /// Store to a valid entry whose dirty bit is clear.
    ReadOnly = 2,
}

impl TryFrom<u32> for FaultKind {
    type Error = FaultError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::Read),
            1 => Ok(Self::Write),
            2 => Ok(Self::ReadOnly),
            other => Err(FaultError::InvalidKind(other)),
        }
    }
}

/// A fault that could not be satisfied.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FaultError {
    #[error("unknown fault kind {0}")]
    InvalidKind(u32),
    #[error("fault at {0} with no address space")]
    NoAddressSpace(VirtualAddress),
    #[error("write to read-only page at {0}")]
    ReadOnly(VirtualAddress),
    #[error("fault at {0} outside every region")]
    OutsideRegions(VirtualAddress),
}

impl FaultError {
    #[must_use]
    pub const fn errno(self) -> Errno {
        match self {
            Self::InvalidKind(_) => Errno::EINVAL,
            Self::NoAddressSpace(_) | Self::OutsideRegions(_) => Errno::EFAULT,
            Self::ReadOnly(_) => Errno::EROFS,
        }
    }
}

/// Satisfy a TLB fault of raw kind `kind` at `addr`.
///
/// On success the translation for the page containing `addr` has been written
/// into `tlb`: into the first invalid slot if there is one, otherwise into a
/// random slot. Interrupts are masked while the TLB is scanned and written.
///
/// # Errors
/// - [`FaultError::InvalidKind`] for a kind other than 0, 1 or 2.
/// - [`FaultError::NoAddressSpace`] if `space` is `None`.
/// - [`FaultError::ReadOnly`] for a read-only fault.
/// - [`FaultError::OutsideRegions`] if `addr` is in no region and not in the
///   stack.
///
/// # Panics
/// If `addr` resolves to a page the address space has no frame for.
pub fn handle_fault<A, T, I>(
    kind: u32,
    addr: VirtualAddress,
    space: Option<&AddressSpace<A>>,
    tlb: &T,
    irq: &I,
) -> Result<(), FaultError>
where
    A: FrameAlloc,
    T: Tlb + ?Sized,
    I: InterruptMask + ?Sized,
{
    let kind = FaultKind::try_from(kind)?;
    let space = space.ok_or(FaultError::NoAddressSpace(addr))?;
    if kind == FaultKind::ReadOnly {
        return Err(FaultError::ReadOnly(addr));
    }

    let resolved = space
        .resolve(addr)
        .ok_or(FaultError::OutsideRegions(addr))?;
    let Some(frame) = space.frame(resolved) else {
        panic!(
            "BUG: {addr} resolves to {:?} page {} but has no frame",
            resolved.segment, resolved.index
        );
    };

    let writable = space.is_writable(resolved.segment);
    let entry = TlbEntry::mapping(addr.page(), frame, writable);
    let slot = tlb::install(tlb, irq, entry);

    debug!(
        "{kind:?} fault at {addr}: {} -> {frame} writable={writable} slot={slot:?}",
        addr.page()
    );
    Ok(())
}
