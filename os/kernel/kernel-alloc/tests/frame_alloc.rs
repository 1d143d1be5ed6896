mod common;

use common::{TestPhys, allocator, ready_allocator};
use kernel_alloc::{
    BootMemory, FrameAlloc, FrameAllocError, FrameSlot, Kseg0PhysMapper, PhysFrameAllocator,
    alloc_kpages, free_kpages,
};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::{panic, thread};

fn frames_of(a: &PhysFrameAllocator<TestPhys>, start: PhysicalAddress, n: u32) -> Vec<u32> {
    let first = start.page().number();
    let pages: Vec<u32> = (first..first + n).collect();
    for &p in &pages {
        assert!(!a.is_free(PhysicalAddress::new(p * 4096)));
    }
    pages
}

#[test]
fn pre_bootstrap_bumps_from_first_free() {
    let a = allocator(16, 2);
    assert!(!a.is_ready());
    assert_eq!(a.free_frames(), None);
    assert_eq!(a.reserve(1), Ok(PhysicalAddress::new(0x2000)));
    assert_eq!(a.reserve(2), Ok(PhysicalAddress::new(0x3000)));
    assert_eq!(a.boot_frames(), 3);
}

#[test]
fn pre_bootstrap_release_is_ignored() {
    let a = allocator(16, 2);
    let pa = a.reserve(1).unwrap();
    a.release(pa);
    // bump memory never comes back
    assert_eq!(a.reserve(1), Ok(PhysicalAddress::new(0x3000)));
}

#[test]
fn bootstrap_manages_everything_not_yet_stolen() {
    let a = allocator(16, 2);
    a.reserve(3).unwrap();
    let managed = a.bootstrap().unwrap();
    assert_eq!(managed, 16 - 2 - 3);
    assert!(a.is_ready());
    assert_eq!(a.total_frames(), Some(managed));
    assert_eq!(a.free_frames(), Some(managed));

    // frames stolen before bootstrap are outside the map
    assert_eq!(a.frame_state(PhysicalAddress::new(0x4000)), None);
    assert_eq!(
        a.frame_state(PhysicalAddress::new(0x5000)),
        Some(FrameSlot::Free)
    );
}

#[test]
fn bootstrap_twice_is_an_error() {
    let a = ready_allocator(8, 1);
    assert_eq!(a.bootstrap(), Err(FrameAllocError::AlreadyBootstrapped));
    assert_eq!(a.total_frames(), Some(7));
}

#[test]
fn zero_frame_request_is_rejected_in_both_modes() {
    let a = allocator(8, 1);
    assert_eq!(a.reserve(0), Err(FrameAllocError::ZeroFrames));
    a.bootstrap().unwrap();
    assert_eq!(a.reserve(0), Err(FrameAllocError::ZeroFrames));
}

#[test]
fn reserved_runs_never_overlap() {
    let a = ready_allocator(64, 0);
    let mut owned = HashSet::new();
    let mut runs = Vec::new();

    // A deterministic mix of reservations and releases.
    for step in 0u32..40 {
        let n = step % 4 + 1;
        if let Ok(pa) = a.reserve(n) {
            for f in frames_of(&a, pa, n) {
                assert!(owned.insert(f), "frame {f:#x} handed out twice");
            }
            runs.push((pa, n));
        }
        if step % 3 == 2 {
            let (pa, n) = runs.remove(runs.len() / 2);
            a.release(pa);
            for f in pa.page().number()..pa.page().number() + n {
                owned.remove(&f);
            }
        }
    }

    let held: u32 = runs.iter().map(|(_, n)| n).sum();
    assert_eq!(a.free_frames(), Some(64 - held as usize));
}

#[test]
fn release_then_rereserve_same_total() {
    let a = ready_allocator(16, 0);
    let x = a.reserve(6).unwrap();
    let y = a.reserve(4).unwrap();
    a.release(x);
    a.release(y);
    assert_eq!(a.free_frames(), Some(16));
    let z = a.reserve(10).unwrap();
    assert_eq!(z, PhysicalAddress::zero());
}

#[test]
fn exhaustion_fails_cleanly() {
    let a = ready_allocator(8, 0);
    a.reserve(6).unwrap();
    assert_eq!(a.reserve(3), Err(FrameAllocError::OutOfMemory));
    assert_eq!(a.free_frames(), Some(2));
    assert!(a.reserve(2).is_ok());
    assert_eq!(a.reserve(1), Err(FrameAllocError::OutOfMemory));
}

#[test]
fn release_of_continuation_is_fatal() {
    let a = ready_allocator(8, 0);
    let pa = a.reserve(3).unwrap();
    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        a.release(pa + 4096);
    }));
    assert!(res.is_err());
    // lock was released by unwinding and the run is intact
    assert_eq!(a.frame_state(pa), Some(FrameSlot::RunStart(3)));
    a.release(pa);
    assert_eq!(a.free_frames(), Some(8));
}

#[test]
fn release_of_free_frame_is_fatal() {
    let a = ready_allocator(8, 0);
    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        a.release(PhysicalAddress::new(0x3000));
    }));
    assert!(res.is_err());
}

#[test]
fn release_outside_managed_range_is_ignored() {
    let a = ready_allocator(8, 2);
    a.release(PhysicalAddress::new(0x1000));
    a.release(PhysicalAddress::new(0x10_0000));
    assert_eq!(a.free_frames(), Some(6));
}

#[test]
fn zero_and_copy_frames() {
    let a = ready_allocator(8, 0);
    let src = a.reserve(1).unwrap();
    let dst = a.reserve(1).unwrap();
    a.mapper().fill(src, 0xAB);
    a.mapper().fill(dst, 0x11);

    unsafe { a.copy_frame(src, dst) };
    assert!(a.mapper().frame_bytes(dst).iter().all(|&b| b == 0xAB));

    unsafe { a.zero_frame(src) };
    assert!(a.mapper().frame_bytes(src).iter().all(|&b| b == 0));
    assert!(a.mapper().frame_bytes(dst).iter().all(|&b| b == 0xAB));
}

#[test]
fn kpages_are_kseg0_addresses() {
    let a = ready_allocator(8, 1);
    let va = alloc_kpages(&a, 2).unwrap();
    assert_eq!(va, VirtualAddress::new(0x8000_1000));
    assert_eq!(a.free_frames(), Some(5));

    free_kpages(&a, va);
    assert_eq!(a.free_frames(), Some(7));

    assert_eq!(alloc_kpages(&a, 0), None);
    assert_eq!(alloc_kpages(&a, 8), None);
}

#[test]
fn free_kpages_ignores_user_addresses() {
    let a = ready_allocator(8, 0);
    alloc_kpages(&a, 1).unwrap();
    free_kpages(&a, VirtualAddress::new(0x0000_0000));
    assert_eq!(a.free_frames(), Some(7));
}

/// Mark a reserved run as owned; `owners` has one flag per frame.
fn claim(owners: &[AtomicBool], start: PhysicalAddress, n: u32) {
    let first = start.page().number() as usize;
    for (i, owned) in owners[first..first + n as usize].iter().enumerate() {
        assert!(
            !owned.swap(true, Ordering::SeqCst),
            "frame {} handed out twice",
            first + i
        );
    }
}

fn unclaim(owners: &[AtomicBool], start: PhysicalAddress, n: u32) {
    let first = start.page().number() as usize;
    for owned in &owners[first..first + n as usize] {
        owned.store(false, Ordering::SeqCst);
    }
}

// Neither bootstrap nor reserve/release touch frame contents, so the kseg0
// mapper is never dereferenced here.
fn shared_allocator() -> PhysFrameAllocator<Kseg0PhysMapper> {
    PhysFrameAllocator::new(
        Kseg0PhysMapper,
        BootMemory::new(PhysicalAddress::new(2 * 4096), 64 * 4096),
    )
}

#[test]
fn concurrent_boot_steals_are_disjoint() {
    let a = shared_allocator();
    let owners: Vec<AtomicBool> = (0..64).map(|_| AtomicBool::new(false)).collect();

    thread::scope(|s| {
        for n in 1..=4 {
            let (a, owners) = (&a, &owners);
            s.spawn(move || {
                for _ in 0..3 {
                    let pa = a.reserve(n).unwrap();
                    claim(owners, pa, n);
                }
            });
        }
    });

    assert_eq!(a.boot_frames(), 3 * (1 + 2 + 3 + 4));
}

#[test]
fn concurrent_reserve_and_release_never_double_allocate() {
    let a = shared_allocator();
    assert_eq!(a.bootstrap(), Ok(62));
    let owners: Vec<AtomicBool> = (0..64).map(|_| AtomicBool::new(false)).collect();

    thread::scope(|s| {
        for worker in 0..4_u32 {
            let (a, owners) = (&a, &owners);
            s.spawn(move || {
                let mut held = Vec::new();
                for step in 0..400_u32 {
                    let n = (worker + step) % 5 + 1;
                    if let Ok(pa) = a.reserve(n) {
                        claim(owners, pa, n);
                        held.push((pa, n));
                    }
                    if (held.len() > 2 || step % 7 == 0)
                        && let Some((pa, n)) = held.pop()
                    {
                        unclaim(owners, pa, n);
                        a.release(pa);
                    }
                }
                for (pa, n) in held {
                    unclaim(owners, pa, n);
                    a.release(pa);
                }
            });
        }
    });

    assert_eq!(a.free_frames(), Some(62));
    assert!(owners.iter().all(|o| !o.load(Ordering::SeqCst)));
}
