//! # Address Space
//!
//! A user process sees a flat, fixed layout:
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────┐
//!             │ text (first defined region) │
//!             ├─────────────────────────────┤
//!             │ data (second region)        │
//!             │            ...              │
//! USERSTACK - ├─────────────────────────────┤
//!   12 pages  │ stack (12 pages, 48 KiB)    │
//! USERSTACK   └─────────────────────────────┘ 0x8000_0000 (kseg0)
//! ```
//!
//! Every virtual page is backed by exactly one frame for the whole life of the
//! address space. Frames are reserved one at a time, so a region's frames are
//! generally not contiguous; each region keeps its own ordered frame list.
//!
//! ## Lifecycle
//!
//! 1. [`AddressSpace::new`]: empty, not loaded.
//! 2. [`AddressSpace::define_region`]: at most two regions.
//! 3. [`AddressSpace::prepare_load`]: reserve and zero every frame.
//! 4. The loader fills the regions ([`AddressSpace::copy_out`]).
//! 5. [`AddressSpace::complete_load`]: the text region becomes read-only.
//! 6. Drop (or [`AddressSpace::destroy`]): every frame goes back.

mod region;

pub use region::{Region, RegionPermissions};

use crate::errno::Errno;
use crate::tlb::{self, Tlb};
use alloc::sync::Arc;
use alloc::vec::Vec;
use kernel_alloc::{FrameAlloc, PhysMapper};
use kernel_info::memory::{STACK_PAGES, USERSTACK, USERSTACK_BASE};
use kernel_memory_addresses::{PhysicalPage, VirtualAddress, VirtualPage, pages_for};
use kernel_sync::InterruptMask;
use log::{debug, trace, warn};

/// Errors from address-space operations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    #[error("out of memory")]
    OutOfMemory,
    #[error("an address space holds at most two regions")]
    TooManyRegions,
    #[error("{0} is outside every region")]
    BadAddress(VirtualAddress),
}

impl VmError {
    #[must_use]
    pub const fn errno(self) -> Errno {
        match self {
            Self::OutOfMemory => Errno::ENOMEM,
            Self::TooManyRegions => Errno::EUNIMP,
            Self::BadAddress(_) => Errno::EFAULT,
        }
    }
}

/// Which part of the address space a page belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Segment {
    /// The first defined region.
    Text,
    /// The second defined region.
    Data,
    Stack,
}

/// A virtual page resolved against the layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub segment: Segment,
    /// Page index within the segment.
    pub index: u32,
}

/// The memory of one user process.
pub struct AddressSpace<A: FrameAlloc> {
    frames: Arc<A>,
    text: Option<Region>,
    data: Option<Region>,
    /// Stack frames from the lowest page up; empty before `prepare_load`.
    stack: Vec<PhysicalPage>,
    loaded: bool,
}

impl<A: FrameAlloc> AddressSpace<A> {
    /// An empty address space drawing frames from `frames`.
    #[must_use]
    pub const fn new(frames: Arc<A>) -> Self {
        Self {
            frames,
            text: None,
            data: None,
            stack: Vec::new(),
            loaded: false,
        }
    }

    /// Declare a region of `size` bytes at `vaddr`.
    ///
    /// The base is rounded down to a page and the length extended to a page
    /// boundary. The first call defines the text region, the second the data
    /// region. Only the frame list's storage is allocated here.
    ///
    /// # Errors
    /// - [`VmError::TooManyRegions`] for a third region.
    /// - [`VmError::BadAddress`] if the region would reach past user space.
    /// - [`VmError::OutOfMemory`] if the frame list cannot be allocated.
    ///
    /// # Panics
    /// If the address space is already prepared.
    pub fn define_region(
        &mut self,
        vaddr: VirtualAddress,
        size: u32,
        permissions: RegionPermissions,
    ) -> Result<(), VmError> {
        assert!(
            !self.is_prepared(),
            "BUG: region at {vaddr} defined after prepare_load"
        );

        let base = vaddr.page();
        let pages = size
            .checked_add(vaddr.offset().as_u32())
            .map(pages_for)
            .ok_or(VmError::BadAddress(vaddr))?;
        let end = base
            .checked_add_pages(pages)
            .map(VirtualPage::base)
            .filter(|end| end.as_u32() <= USERSTACK)
            .ok_or(VmError::BadAddress(vaddr))?;

        let slot = if self.text.is_none() {
            &mut self.text
        } else if self.data.is_none() {
            &mut self.data
        } else {
            warn!("third region at {vaddr} rejected");
            return Err(VmError::TooManyRegions);
        };

        *slot = Some(Region::new(base, pages, permissions)?);

        debug!(
            "region {}..{end}: {pages} page(s), {permissions:?}",
            base.base()
        );
        Ok(())
    }

    /// Reserve and zero one frame for every page of every region and the
    /// stack.
    ///
    /// On failure every frame reserved by this call is released again and the
    /// address space is left as it was.
    ///
    /// # Errors
    /// [`VmError::OutOfMemory`] if any frame (or the stack's frame list)
    /// cannot be allocated.
    ///
    /// # Panics
    /// If the address space is already prepared.
    pub fn prepare_load(&mut self) -> Result<(), VmError> {
        assert!(
            !self.is_prepared(),
            "BUG: prepare_load on an address space that already has frames"
        );

        if let Err(e) = self.populate() {
            let released = self.release_frames();
            warn!("prepare_load ran out of memory; released {released} frame(s)");
            return Err(e);
        }

        debug!("prepared {} frame(s)", self.frame_count());
        Ok(())
    }

    fn populate(&mut self) -> Result<(), VmError> {
        self.stack
            .try_reserve_exact(STACK_PAGES as usize)
            .map_err(|_| VmError::OutOfMemory)?;

        let alloc = &*self.frames;
        for region in [&mut self.text, &mut self.data].into_iter().flatten() {
            let pages = region.pages();
            fill(alloc, &mut region.frames, pages)?;
        }
        fill(alloc, &mut self.stack, STACK_PAGES)
    }

    /// Mark the address space loaded; from now on text pages are mapped
    /// read-only.
    ///
    /// Translations installed while loading are still writable; flush the TLB
    /// afterwards (see `Vm::complete_load`).
    pub const fn complete_load(&mut self) {
        self.loaded = true;
    }

    /// The initial user stack pointer.
    #[must_use]
    pub fn define_stack(&self) -> VirtualAddress {
        debug_assert!(self.is_prepared(), "stack requested before prepare_load");
        VirtualAddress::new(USERSTACK)
    }

    /// A new address space with the same layout and a private copy of every
    /// page.
    ///
    /// An address space that was never prepared yields an unprepared copy.
    ///
    /// # Errors
    /// [`VmError::OutOfMemory`]; nothing is leaked.
    pub fn try_clone(&self) -> Result<Self, VmError> {
        let mut copy = Self::new(Arc::clone(&self.frames));
        copy.text = self.text.as_ref().map(Region::empty_like).transpose()?;
        copy.data = self.data.as_ref().map(Region::empty_like).transpose()?;
        copy.loaded = self.loaded;

        if self.is_prepared() {
            copy.prepare_load()?;
            for (src, dst) in self.segments().into_iter().zip(copy.segments()) {
                debug_assert_eq!(src.len(), dst.len());
                for (src, dst) in src.iter().zip(dst) {
                    // SAFETY: both frames belong to address spaces we hold; a
                    // fresh copy never shares a frame with its source.
                    unsafe { self.frames.copy_frame(src.base(), dst.base()) };
                }
            }
        }

        debug!("copied address space ({} frame(s))", copy.frame_count());
        Ok(copy)
    }

    /// Release every frame and the address space itself.
    pub fn destroy(self) {
        drop(self);
    }

    /// Make this the address space the TLB translates for.
    ///
    /// Nothing in the TLB is tagged, so every slot is invalidated.
    #[allow(clippy::unused_self)]
    pub fn activate<T, I>(&self, tlb: &T, irq: &I)
    where
        T: Tlb + ?Sized,
        I: InterruptMask + ?Sized,
    {
        tlb::flush_all(tlb, irq);
    }

    /// Counterpart of [`activate`](Self::activate); nothing to do.
    #[allow(clippy::unused_self)]
    pub const fn deactivate(&self) {}

    /// Resolve `va` against text, data and the stack, in that order.
    #[must_use]
    pub fn resolve(&self, va: VirtualAddress) -> Option<Resolved> {
        let page = va.page();
        if let Some(index) = self.text.as_ref().and_then(|r| r.index_of(page)) {
            return Some(Resolved {
                segment: Segment::Text,
                index,
            });
        }
        if let Some(index) = self.data.as_ref().and_then(|r| r.index_of(page)) {
            return Some(Resolved {
                segment: Segment::Data,
                index,
            });
        }
        let stack_base = VirtualPage::containing_address(VirtualAddress::new(USERSTACK_BASE));
        page
            .pages_since(stack_base)
            .filter(|&index| index < STACK_PAGES)
            .map(|index| Resolved {
                segment: Segment::Stack,
                index,
            })
    }

    /// The frame behind a resolved page, if populated.
    #[must_use]
    pub fn frame(&self, resolved: Resolved) -> Option<PhysicalPage> {
        let frames: &[PhysicalPage] = match resolved.segment {
            Segment::Text => self.text.as_ref()?.frames(),
            Segment::Data => self.data.as_ref()?.frames(),
            Segment::Stack => &self.stack,
        };
        frames.get(resolved.index as usize).copied()
    }

    /// Whether pages of `segment` are mapped writable.
    #[must_use]
    pub const fn is_writable(&self, segment: Segment) -> bool {
        !(self.loaded && matches!(segment, Segment::Text))
    }

    /// Copy `bytes` into user memory at `va`.
    ///
    /// The whole range is checked before anything is written.
    ///
    /// # Errors
    /// [`VmError::BadAddress`] if any byte of the range is outside every
    /// populated page.
    pub fn copy_out(&mut self, va: VirtualAddress, bytes: &[u8]) -> Result<(), VmError> {
        let chunks = self.checked_chunks(va, bytes.len())?;
        let mut done = 0;
        for (frame, offset, len) in chunks {
            // SAFETY: the frame belongs to this address space, which we hold
            // exclusively.
            let dst = unsafe { self.frames.mapper().frame_mut(frame) };
            dst[offset..offset + len].copy_from_slice(&bytes[done..done + len]);
            done += len;
        }
        trace!("copied {} byte(s) out to {va}", bytes.len());
        Ok(())
    }

    /// Copy user memory at `va` into `buf`.
    ///
    /// # Errors
    /// [`VmError::BadAddress`] if any byte of the range is outside every
    /// populated page.
    pub fn copy_in(&self, va: VirtualAddress, buf: &mut [u8]) -> Result<(), VmError> {
        let chunks = self.checked_chunks(va, buf.len())?;
        let mut done = 0;
        for (frame, offset, len) in chunks {
            // SAFETY: the frame belongs to this address space; nothing writes
            // to it while we hold `&self`.
            let src = unsafe { self.frames.mapper().frame_mut(frame) };
            buf[done..done + len].copy_from_slice(&src[offset..offset + len]);
            done += len;
        }
        Ok(())
    }

    /// Page-sized pieces of `[va, va + len)` with the frame behind each, or
    /// the first address that has none.
    fn checked_chunks(
        &self,
        va: VirtualAddress,
        len: usize,
    ) -> Result<Vec<(PhysicalPage, usize, usize)>, VmError> {
        let len = u32::try_from(len).map_err(|_| VmError::BadAddress(va))?;
        if va.checked_add(len).is_none() {
            return Err(VmError::BadAddress(va));
        }

        let chunks = PageChunks {
            next: va,
            remaining: len,
        };
        let mut resolved = Vec::new();
        for (at, chunk) in chunks {
            let frame = self
                .resolve(at)
                .and_then(|r| self.frame(r))
                .ok_or(VmError::BadAddress(at))?;
            resolved.push((frame, at.offset().as_usize(), chunk as usize));
        }
        Ok(resolved)
    }

    #[inline]
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Whether [`prepare_load`](Self::prepare_load) has populated the frames.
    #[inline]
    #[must_use]
    pub fn is_prepared(&self) -> bool {
        !self.stack.is_empty()
    }

    #[must_use]
    pub const fn text(&self) -> Option<&Region> {
        self.text.as_ref()
    }

    #[must_use]
    pub const fn data(&self) -> Option<&Region> {
        self.data.as_ref()
    }

    #[must_use]
    pub fn stack_frames(&self) -> &[PhysicalPage] {
        &self.stack
    }

    /// Frames currently owned.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.owned_frames().count()
    }

    /// Every owned frame: text, then data, then stack.
    pub fn owned_frames(&self) -> impl Iterator<Item = PhysicalPage> + '_ {
        self.segments().into_iter().flatten().copied()
    }

    /// Frame lists of text, data and stack, in that order.
    fn segments(&self) -> [&[PhysicalPage]; 3] {
        [
            self.text.as_ref().map_or(&[][..], Region::frames),
            self.data.as_ref().map_or(&[][..], Region::frames),
            &self.stack,
        ]
    }

    /// Release every owned frame, keeping the layout. Returns how many.
    fn release_frames(&mut self) -> usize {
        let mut released = 0;
        let alloc = &*self.frames;
        let lists = [&mut self.text, &mut self.data]
            .into_iter()
            .flatten()
            .map(|r| &mut r.frames)
            .chain(core::iter::once(&mut self.stack));
        for list in lists {
            for frame in list.drain(..) {
                alloc.release(frame.base());
                released += 1;
            }
        }
        released
    }
}

impl<A: FrameAlloc> Drop for AddressSpace<A> {
    fn drop(&mut self) {
        let released = self.release_frames();
        trace!("address space destroyed; released {released} frame(s)");
    }
}

impl<A: FrameAlloc> core::fmt::Debug for AddressSpace<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AddressSpace")
            .field("text", &self.text)
            .field("data", &self.data)
            .field("stack_frames", &self.stack.len())
            .field("loaded", &self.loaded)
            .finish_non_exhaustive()
    }
}

/// Reserve and zero frames until `frames` holds `pages` of them.
fn fill<A: FrameAlloc + ?Sized>(
    alloc: &A,
    frames: &mut Vec<PhysicalPage>,
    pages: u32,
) -> Result<(), VmError> {
    while frames.len() < pages as usize {
        let pa = alloc.reserve(1).map_err(|_| VmError::OutOfMemory)?;
        // SAFETY: freshly reserved, nobody else refers to it.
        unsafe { alloc.zero_frame(pa) };
        frames.push(pa.page());
    }
    Ok(())
}

/// Splits `[next, next + remaining)` at page boundaries.
struct PageChunks {
    next: VirtualAddress,
    remaining: u32,
}

impl Iterator for PageChunks {
    /// Start of the piece and its length.
    type Item = (VirtualAddress, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let at = self.next;
        let len = at.offset().remaining().min(self.remaining);
        self.remaining -= len;
        if self.remaining > 0 {
            self.next = at + len;
        }
        Some((at, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_chunks_split_at_boundaries() {
        let chunks: Vec<_> = PageChunks {
            next: VirtualAddress::new(0x1FF0),
            remaining: 0x1020,
        }
        .collect();
        assert_eq!(
            chunks,
            [
                (VirtualAddress::new(0x1FF0), 0x10),
                (VirtualAddress::new(0x2000), 0x1000),
                (VirtualAddress::new(0x3000), 0x10),
            ]
        );
    }

    #[test]
    fn page_chunks_of_nothing() {
        let mut chunks = PageChunks {
            next: VirtualAddress::new(0x1000),
            remaining: 0,
        };
        assert_eq!(chunks.next(), None);
    }

    #[test]
    fn vm_error_errno() {
        assert_eq!(VmError::OutOfMemory.errno(), Errno::ENOMEM);
        assert_eq!(VmError::TooManyRegions.errno(), Errno::EUNIMP);
        assert_eq!(
            VmError::BadAddress(VirtualAddress::zero()).errno(),
            Errno::EFAULT
        );
    }
}
