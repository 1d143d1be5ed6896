//! # Physical frame allocator
//!
//! Two modes, switched exactly once by [`PhysFrameAllocator::bootstrap`]:
//!
//! - **Pre-bootstrap**: frames come from the [`BootMemory`] bump allocator and
//!   are never returned.
//! - **Normal**: frames come from the [`FrameMap`], first fit, and whole runs
//!   can be released again.
//!
//! The ready flag is the frame map's [`SyncOnceCell`]: once set it stays set
//! and is read without taking any lock.

use crate::bootmem::{BootMemory, frames_between};
use crate::frame_map::{FrameMap, FrameSlot};
use crate::phys_mapper::PhysMapper;
use alloc::vec::Vec;
use kernel_memory_addresses::PhysicalAddress;
use kernel_sync::{SpinLock, SyncOnceCell};
use log::{info, trace, warn};

/// Errors from the physical frame allocator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameAllocError {
    #[error("out of physical memory")]
    OutOfMemory,
    #[error("a request for zero frames is invalid")]
    ZeroFrames,
    #[error("the frame map is already initialized")]
    AlreadyBootstrapped,
}

/// Source of contiguous physical frames.
///
/// Returned addresses are always frame aligned.
pub trait FrameAlloc {
    type Mapper: PhysMapper;

    /// Access to the memory behind the frames handed out.
    fn mapper(&self) -> &Self::Mapper;

    /// Reserve `frames` physically contiguous frames.
    ///
    /// # Errors
    /// [`FrameAllocError::ZeroFrames`] for an empty request,
    /// [`FrameAllocError::OutOfMemory`] if no run fits.
    fn reserve(&self, frames: u32) -> Result<PhysicalAddress, FrameAllocError>;

    /// Release the run that starts at `pa`.
    ///
    /// # Panics
    /// If `pa` is managed but is not the first frame of an allocated run.
    fn release(&self, pa: PhysicalAddress);

    /// Fill the frame at `pa` with zeroes.
    ///
    /// # Safety
    /// `pa` must be a frame owned by the caller with no live references into it.
    unsafe fn zero_frame(&self, pa: PhysicalAddress) {
        // SAFETY: forwarded to the caller.
        unsafe { self.mapper().frame_mut(pa.page()) }.fill(0);
    }

    /// Copy the frame at `src` into the frame at `dst`.
    ///
    /// # Safety
    /// Both frames must be owned by the caller with no live references into
    /// them.
    unsafe fn copy_frame(&self, src: PhysicalAddress, dst: PhysicalAddress) {
        if src.page() == dst.page() {
            return;
        }
        // SAFETY: forwarded to the caller; distinct frames never alias.
        let (from, to) = unsafe {
            (
                self.mapper().frame_mut(src.page()),
                self.mapper().frame_mut(dst.page()),
            )
        };
        to.copy_from_slice(from);
    }
}

/// The kernel's physical frame allocator.
pub struct PhysFrameAllocator<M> {
    mapper: M,
    bootmem: SpinLock<BootMemory>,
    frame_map: SyncOnceCell<SpinLock<FrameMap>>,
}

/// What a release under the lock found; logged after the lock is gone.
enum Released {
    Run(u32),
    Unmanaged,
    NotRunStart(Option<FrameSlot>),
}

impl<M: PhysMapper> PhysFrameAllocator<M> {
    /// An allocator in pre-bootstrap mode over `bootmem`.
    #[must_use]
    pub const fn new(mapper: M, bootmem: BootMemory) -> Self {
        Self {
            mapper,
            bootmem: SpinLock::new(bootmem),
            frame_map: SyncOnceCell::new(),
        }
    }

    /// Build the frame map over all RAM the boot allocator has not handed out
    /// and switch to normal mode.
    ///
    /// The map's storage is allocated before the range is taken, so whatever
    /// it consumes stays outside the managed range. Returns the number of
    /// managed frames.
    ///
    /// # Errors
    /// [`FrameAllocError::AlreadyBootstrapped`] on a second call,
    /// [`FrameAllocError::OutOfMemory`] if the map's storage cannot be
    /// allocated.
    pub fn bootstrap(&self) -> Result<usize, FrameAllocError> {
        if self.is_ready() {
            return Err(FrameAllocError::AlreadyBootstrapped);
        }

        let (lo, hi) = self.bootmem.with_lock(|b| b.remaining());
        let upper_bound = frames_between(lo, hi) as usize;
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(upper_bound)
            .map_err(|_| FrameAllocError::OutOfMemory)?;

        let (lo, hi) = self
            .bootmem
            .with_lock(BootMemory::take_remaining)
            .ok_or(FrameAllocError::AlreadyBootstrapped)?;
        let frames = frames_between(lo, hi) as usize;
        let map = FrameMap::from_storage(storage, lo.page(), frames);
        let managed = map.total_frames();

        self.frame_map
            .set(SpinLock::new(map))
            .map_err(|_| FrameAllocError::AlreadyBootstrapped)?;

        info!("frame map ready: {managed} frames from {lo} to {hi}");
        Ok(managed)
    }

    /// Whether [`bootstrap`](Self::bootstrap) completed.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.frame_map.is_ready()
    }

    /// Frames under frame-map management, or `None` before bootstrap.
    #[must_use]
    pub fn total_frames(&self) -> Option<usize> {
        self.frame_map
            .get()
            .map(|m| m.with_lock(|m| m.total_frames()))
    }

    /// Free managed frames, or `None` before bootstrap.
    #[must_use]
    pub fn free_frames(&self) -> Option<usize> {
        self.frame_map
            .get()
            .map(|m| m.with_lock(|m| m.free_frames()))
    }

    /// State of the managed frame containing `pa`.
    #[must_use]
    pub fn frame_state(&self, pa: PhysicalAddress) -> Option<FrameSlot> {
        self.frame_map
            .get()?
            .with_lock(|m| m.index_of(pa).and_then(|i| m.slot(i)))
    }

    /// Whether the frame containing `pa` is managed and free.
    #[must_use]
    pub fn is_free(&self, pa: PhysicalAddress) -> bool {
        self.frame_state(pa) == Some(FrameSlot::Free)
    }

    /// Frames handed out by the boot allocator.
    #[must_use]
    pub fn boot_frames(&self) -> u32 {
        self.bootmem.with_lock(|b| b.stolen_frames())
    }
}

impl<M: PhysMapper> FrameAlloc for PhysFrameAllocator<M> {
    type Mapper = M;

    fn mapper(&self) -> &M {
        &self.mapper
    }

    fn reserve(&self, frames: u32) -> Result<PhysicalAddress, FrameAllocError> {
        if frames == 0 {
            return Err(FrameAllocError::ZeroFrames);
        }

        let Some(map) = self.frame_map.get() else {
            let pa = self
                .bootmem
                .with_lock(|b| b.steal(frames))
                .ok_or(FrameAllocError::OutOfMemory)?;
            trace!("boot memory: {frames} frame(s) at {pa}");
            return Ok(pa);
        };

        let pa = map
            .with_lock(|m| m.reserve(frames).map(|i| m.address_of(i)))
            .ok_or(FrameAllocError::OutOfMemory)?;
        trace!("reserved {frames} frame(s) at {pa}");
        Ok(pa)
    }

    fn release(&self, pa: PhysicalAddress) {
        let Some(map) = self.frame_map.get() else {
            warn!("release of {pa} before the frame map exists; leaking it");
            return;
        };

        let outcome = map.with_lock(|m| {
            let Some(index) = m.index_of(pa) else {
                return Released::Unmanaged;
            };
            if !pa.is_page_aligned() {
                return Released::NotRunStart(m.slot(index));
            }
            m.release(index)
                .map_or_else(|| Released::NotRunStart(m.slot(index)), Released::Run)
        });

        match outcome {
            Released::Run(frames) => trace!("released {frames} frame(s) at {pa}"),
            Released::Unmanaged => warn!("release of unmanaged frame {pa} ignored"),
            Released::NotRunStart(state) => {
                panic!("BUG: release of {pa}, which does not start an allocated run ({state:?})");
            }
        }
    }
}

impl<M: PhysMapper> core::fmt::Debug for PhysFrameAllocator<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PhysFrameAllocator")
            .field("ready", &self.is_ready())
            .field("total_frames", &self.total_frames())
            .field("free_frames", &self.free_frames())
            .finish_non_exhaustive()
    }
}
