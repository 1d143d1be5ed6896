//! Simulated physical RAM for hosted tests.

#![allow(dead_code)]

use kernel_alloc::{BootMemory, FRAME_BYTES, Frame, PhysFrameAllocator, PhysMapper};
use kernel_memory_addresses::PhysicalAddress;
use std::cell::UnsafeCell;

/// A vector of 4 KiB-aligned frames standing in for RAM.
///
/// Physical addresses are byte offsets from 0, so frame `n` lives at `n * 4096`.
pub struct TestPhys {
    frames: Box<[UnsafeCell<Frame>]>,
}

impl TestPhys {
    pub fn with_frames(n: usize) -> Self {
        Self {
            frames: (0..n).map(|_| UnsafeCell::new(Frame::zeroed())).collect(),
        }
    }

    pub fn size(&self) -> u32 {
        u32::try_from(self.frames.len() * FRAME_BYTES).unwrap()
    }

    /// Copy of the bytes of the frame at `pa`.
    pub fn frame_bytes(&self, pa: PhysicalAddress) -> Vec<u8> {
        unsafe { (*self.frames[Self::index(pa)].get()).0.to_vec() }
    }

    /// Fill the frame at `pa` with `byte`.
    pub fn fill(&self, pa: PhysicalAddress, byte: u8) {
        unsafe { (*self.frames[Self::index(pa)].get()).0.fill(byte) }
    }

    fn index(pa: PhysicalAddress) -> usize {
        pa.page().number() as usize
    }
}

impl PhysMapper for TestPhys {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        let idx = Self::index(pa);
        let off = pa.offset().as_usize();
        assert!(idx < self.frames.len(), "{pa:?} is outside simulated RAM");
        // SAFETY: the caller promises `T` matches the bytes at `pa`.
        unsafe { &mut *self.frames[idx].get().cast::<u8>().add(off).cast::<T>() }
    }
}

/// An allocator over `total` simulated frames whose first `kernel` frames
/// hold the "kernel image".
pub fn allocator(total: usize, kernel: u32) -> PhysFrameAllocator<TestPhys> {
    let ram = TestPhys::with_frames(total);
    let size = ram.size();
    let bootmem = BootMemory::new(PhysicalAddress::new(kernel * 4096), size);
    PhysFrameAllocator::new(ram, bootmem)
}

/// Like [`allocator`], bootstrapped.
pub fn ready_allocator(total: usize, kernel: u32) -> PhysFrameAllocator<TestPhys> {
    let a = allocator(total, kernel);
    a.bootstrap().unwrap();
    a
}
