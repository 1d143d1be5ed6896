//! # Virtual Memory Support
//!
//! The "dumb VM" for a MIPS R3000-class machine: no page tables, no paging to
//! disk, no sharing. Every user page is backed by a frame from the moment the
//! program is loaded until the address space is destroyed.
//!
//! ## MIPS Address Map
//!
//! ```text
//! 0x0000_0000 ┌──────────────┐
//!             │    kuseg     │ user, translated by the TLB
//! 0x8000_0000 ├──────────────┤
//!             │    kseg0     │ kernel, physical + 0x8000_0000, cached
//! 0xA000_0000 ├──────────────┤
//!             │    kseg1     │ kernel, physical + 0xA000_0000, uncached
//! 0xC000_0000 ├──────────────┤
//!             │    kseg2     │ kernel, translated (unused)
//! 0xFFFF_FFFF └──────────────┘
//! ```
//!
//! Only kuseg goes through the TLB. The kernel reaches every frame through
//! kseg0, which is how the allocator zeroes and copies user frames.
//!
//! ## Translation
//!
//! The TLB is refilled entirely in software. A user access to a page with no
//! TLB entry traps, [`fault::handle_fault`] looks the page up in the current
//! [`AddressSpace`], and writes one [`TlbEntry`]:
//!
//! ```text
//! EntryHi  | 31 ............. 12 | 11 .. 6 | 5 .. 0 |
//!          |        VPN          |  ASID   |   -    |
//!
//! EntryLo  | 31 ............. 12 | 11 | 10 | 9 | 8 | 7 .. 0 |
//!          |        PFN          | N  | D  | V | G |   -    |
//! ```
//!
//! `V` (valid) is always set, `D` (dirty) means writable. ASIDs are not used,
//! so [activating](AddressSpace::activate) an address space invalidates the
//! whole TLB.
//!
//! ## Usage
//!
//! ```rust
//! use kernel_alloc::{BootMemory, Kseg0PhysMapper, PhysFrameAllocator};
//! use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
//! use kernel_sync::SoftInterrupts;
//! use kernel_vmem::{RegionPermissions, Segment, SoftTlb, Vm};
//!
//! let ram = BootMemory::new(PhysicalAddress::new(0x2_0000), 0x40_0000);
//! let vm = Vm::new(
//!     PhysFrameAllocator::new(Kseg0PhysMapper, ram),
//!     SoftTlb::default(),
//!     SoftInterrupts::new(),
//! );
//! vm.bootstrap().unwrap();
//!
//! let mut space = vm.create_address_space();
//! space
//!     .define_region(VirtualAddress::new(0x40_0000), 0x1800, RegionPermissions::READ | RegionPermissions::EXECUTE)
//!     .unwrap();
//!
//! let hit = space.resolve(VirtualAddress::new(0x40_1234)).unwrap();
//! assert_eq!(hit.segment, Segment::Text);
//! assert_eq!(hit.index, 1);
//! assert!(space.resolve(VirtualAddress::new(0x40_2000)).is_none());
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

pub mod address_space;
pub mod errno;
pub mod fault;
pub mod tlb;
mod vm;

pub use crate::address_space::{AddressSpace, RegionPermissions, Resolved, Segment, VmError};
pub use crate::errno::Errno;
pub use crate::fault::{FaultError, FaultKind, handle_fault};
pub use crate::tlb::{EntryHi, EntryLo, SoftTlb, Tlb, TlbEntry};
pub use crate::vm::{TlbShootdown, UserSpace, Vm};

/// Re-export constants as info module.
pub use kernel_info::memory as info;
