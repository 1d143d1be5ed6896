//! Simulated RAM and TLB for hosted tests.

#![allow(dead_code)]

use kernel_alloc::{BootMemory, FRAME_BYTES, Frame, PhysFrameAllocator, PhysMapper};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, VirtualAddress};
use kernel_sync::SoftInterrupts;
use kernel_vmem::{RegionPermissions, SoftTlb, Tlb, TlbEntry, UserSpace, Vm};
use std::cell::UnsafeCell;

pub const TEXT: u32 = 0x1000;
pub const TEXT_SIZE: u32 = 0x2000;
pub const DATA: u32 = 0x3000;
pub const DATA_SIZE: u32 = 0x1000;

/// Frames a [`program`] owns once prepared: 2 text, 1 data, 12 stack.
pub const PROGRAM_FRAMES: usize = 15;

/// Frames below the managed range.
pub const KERNEL_FRAMES: u32 = 2;

/// A vector of 4 KiB-aligned frames standing in for RAM.
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

    pub fn frame_bytes(&self, page: PhysicalPage) -> Vec<u8> {
        unsafe { (*self.frames[page.number() as usize].get()).0.to_vec() }
    }

    pub fn fill(&self, page: PhysicalPage, byte: u8) {
        unsafe { (*self.frames[page.number() as usize].get()).0.fill(byte) }
    }
}

impl PhysMapper for TestPhys {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        let idx = pa.page().number() as usize;
        let off = pa.offset().as_usize();
        assert!(idx < self.frames.len(), "{pa:?} is outside simulated RAM");
        // SAFETY: the caller promises `T` matches the bytes at `pa`.
        unsafe { &mut *self.frames[idx].get().cast::<u8>().add(off).cast::<T>() }
    }
}

/// A TLB that refuses to be touched with interrupts enabled.
pub struct CheckedTlb {
    pub inner: SoftTlb,
    irq: &'static SoftInterrupts,
}

impl CheckedTlb {
    fn check(&self) {
        assert!(!self.irq.are_enabled(), "TLB accessed with interrupts enabled");
    }

    /// The entry translating `va`, if any.
    pub fn lookup(&self, va: VirtualAddress) -> Option<TlbEntry> {
        let hi = kernel_vmem::EntryHi::for_page(va.page());
        self.inner.probe(hi).map(|slot| self.inner.read(slot))
    }
}

impl Tlb for CheckedTlb {
    fn slots(&self) -> usize {
        self.inner.slots()
    }

    fn read(&self, slot: usize) -> TlbEntry {
        self.check();
        self.inner.read(slot)
    }

    fn write(&self, slot: usize, entry: TlbEntry) {
        self.check();
        self.inner.write(slot, entry);
    }

    fn write_random(&self, entry: TlbEntry) {
        self.check();
        self.inner.write_random(entry);
    }
}

pub type TestVm = Vm<TestPhys, CheckedTlb, &'static SoftInterrupts>;
pub type TestSpace = UserSpace<TestPhys>;

/// A bootstrapped VM over `total` simulated frames with a TLB of `slots`.
pub fn vm_with_tlb(total: usize, slots: usize) -> TestVm {
    let irq: &'static SoftInterrupts = Box::leak(Box::new(SoftInterrupts::new()));
    let ram = TestPhys::with_frames(total);
    let size = ram.size();
    let bootmem = BootMemory::new(PhysicalAddress::new(KERNEL_FRAMES * 4096), size);
    let tlb = CheckedTlb {
        inner: SoftTlb::new(slots, SoftTlb::DEFAULT_SEED),
        irq,
    };
    let vm = Vm::new(PhysFrameAllocator::new(ram, bootmem), tlb, irq);
    vm.bootstrap().unwrap();
    vm
}

pub fn vm(total: usize) -> TestVm {
    vm_with_tlb(total, 64)
}

pub fn free_frames(vm: &TestVm) -> usize {
    vm.frames().free_frames().unwrap()
}

/// Text `[0x1000, 0x3000)` and data `[0x3000, 0x4000)`, not yet prepared.
pub fn layout(vm: &TestVm) -> TestSpace {
    let mut space = vm.create_address_space();
    space
        .define_region(
            VirtualAddress::new(TEXT),
            TEXT_SIZE,
            RegionPermissions::READ | RegionPermissions::EXECUTE,
        )
        .unwrap();
    space
        .define_region(
            VirtualAddress::new(DATA),
            DATA_SIZE,
            RegionPermissions::READ | RegionPermissions::WRITE,
        )
        .unwrap();
    space
}

/// [`layout`], prepared.
pub fn program(vm: &TestVm) -> TestSpace {
    let mut space = layout(vm);
    space.prepare_load().unwrap();
    space
}
