//! # Kernel Machine Configuration
//!
//! Compile-time description of the machine the virtual-memory subsystem runs
//! on: a 32-bit MIPS-style processor with a software-managed TLB and no
//! hardware page-table walker.
//!
//! Everything in here is a constant. Subsystems that need to agree on the
//! shape of memory (the frame allocator, the address spaces, the fault
//! handler) take their numbers from [`memory`] instead of hard-coding them.
//!
//! ## Address Space Layout
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │  kuseg: user space (TLB mapped) │
//!             │   code region, data region      │
//!             │               ...               │
//! USERSTACK - ├─────────────────────────────────┤
//! STACK_PAGES │  user stack (12 pages, 48 KiB)  │
//! USERSTACK   ├─────────────────────────────────┤ 0x8000_0000
//!             │  kseg0: kernel, direct-mapped   │
//!             │   (virtual = physical + KSEG0)  │
//! 0xA000_0000 ├─────────────────────────────────┤
//!             │  kseg1 / kseg2 (unused here)    │
//! 0xFFFF_FFFF └─────────────────────────────────┘
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod memory;
