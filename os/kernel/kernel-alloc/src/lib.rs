//! # Physical Memory Allocation
//!
//! The bottom layer of the VM subsystem: it hands out physically contiguous
//! 4 KiB frames to the kernel heap and to user address spaces, and takes them
//! back.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │        Kernel pages (alloc_kpages / free_kpages)    │
//! │    • kseg0 addresses for the kernel heap            │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │          PhysFrameAllocator (FrameAlloc)            │
//! │    • pre-bootstrap: BootMemory bump allocator       │
//! │    • after bootstrap: first-fit over the FrameMap   │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                 PhysMapper                          │
//! │    • physical frame → kernel reference (kseg0)      │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! 1. Boot creates a [`BootMemory`] from the first free physical address and
//!    the RAM size, and wraps it in a [`PhysFrameAllocator`]. Early kernel
//!    allocations bump through it and are never freed.
//! 2. [`PhysFrameAllocator::bootstrap`] builds the [`FrameMap`] over what is
//!    left and publishes it exactly once.
//! 3. From then on [`FrameAlloc::reserve`] and [`FrameAlloc::release`] work on
//!    the map under its spin lock.
//!
//! ## Usage
//!
//! ```rust
//! use kernel_alloc::{BootMemory, FrameAlloc, PhysFrameAllocator, Kseg0PhysMapper};
//! use kernel_memory_addresses::PhysicalAddress;
//!
//! let ram = BootMemory::new(PhysicalAddress::new(0x2_0000), 0x40_0000);
//! let frames = PhysFrameAllocator::new(Kseg0PhysMapper, ram);
//!
//! let early = frames.reserve(1).unwrap(); // bump allocated, never freed
//! assert_eq!(early, PhysicalAddress::new(0x2_0000));
//!
//! let managed = frames.bootstrap().unwrap();
//! assert_eq!(frames.free_frames(), Some(managed));
//!
//! let run = frames.reserve(4).unwrap();
//! frames.release(run);
//! assert_eq!(frames.free_frames(), Some(managed));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

pub mod bootmem;
pub mod frame_alloc;
pub mod frame_map;
pub mod kpages;
pub mod phys_mapper;

pub use bootmem::BootMemory;
pub use frame_alloc::{FrameAlloc, FrameAllocError, PhysFrameAllocator};
pub use frame_map::{FrameMap, FrameSlot};
pub use kpages::{alloc_kpages, free_kpages};
pub use phys_mapper::{FRAME_BYTES, Frame, Kseg0PhysMapper, PhysMapper};
