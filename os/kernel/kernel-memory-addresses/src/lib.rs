//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for raw 32-bit memory addresses and page bases used
//! by the frame allocator, the address spaces and the TLB fault handler.
//!
//! ## Overview
//!
//! The machine has 32-bit addresses and a single 4 KiB page size, so every
//! type here is a zero-cost wrapper around a `u32`. The types exist to keep
//! virtual and physical addresses from being mixed up at compile time.
//!
//! | Concept | Description |
//! |----------|-------------|
//! | [`MemoryAddress`] | A raw address, either physical or virtual. |
//! | [`MemoryPage`] | A page-aligned base address. |
//! | [`PageOffset`] | An offset within a page (`0..PAGE_SIZE`). |
//!
//! These are then wrapped to distinguish between virtual and physical spaces:
//!
//! | Wrapper | Meaning |
//! |----------|----------|
//! | [`VirtualAddress`] / [`VirtualPage`] | User or kernel virtual memory (TLB mapped or kseg0). |
//! | [`PhysicalAddress`] / [`PhysicalPage`] | Physical RAM; a [`PhysicalPage`] is a frame. |
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0x0040_1234);
//!
//! // Split it into a page base and an in-page offset
//! let (page, off) = va.split();
//! assert_eq!(page.base().as_u32(), 0x0040_1000);
//! assert_eq!(off.as_u32(), 0x234);
//!
//! // Join them back to the same address
//! assert_eq!(page.join(off), va);
//!
//! // Frames are numbered by their physical page
//! let frame = PhysicalAddress::new(0x0003_5000).page();
//! assert_eq!(frame.number(), 0x35);
//! ```
//!
//! ## Design Notes
//!
//! - The types are `#[repr(transparent)]` and implement `Copy`, `Eq`, `Ord` and
//!   `Hash`.
//! - All alignment and offset calculations are `const fn`.
//! - Page arithmetic that could leave the 32-bit space is checked and returns
//!   `Option`.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod memory_address;
mod memory_page;
mod page_offset;
mod physical_address;
mod physical_page;
mod virtual_address;
mod virtual_page;

pub use kernel_info::memory::{PAGE_FRAME, PAGE_SHIFT, PAGE_SIZE};
pub use memory_address::MemoryAddress;
pub use memory_page::MemoryPage;
pub use page_offset::PageOffset;
pub use physical_address::PhysicalAddress;
pub use physical_page::PhysicalPage;
pub use virtual_address::VirtualAddress;
pub use virtual_page::VirtualPage;

/// Number of whole pages needed to hold `bytes` bytes.
///
/// ```rust
/// # use kernel_memory_addresses::pages_for;
/// assert_eq!(pages_for(0), 0);
/// assert_eq!(pages_for(1), 1);
/// assert_eq!(pages_for(4096), 1);
/// assert_eq!(pages_for(4097), 2);
/// ```
#[inline]
#[must_use]
pub const fn pages_for(bytes: u32) -> u32 {
    bytes.div_ceil(PAGE_SIZE)
}
