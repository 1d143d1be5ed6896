//! # Kernel synchronization primitives
//!
//! - [`SpinLock`]: a non-reentrant test-and-test-and-set lock with an RAII guard.
//! - [`SyncOnceCell`]: a write-once cell, used for flags that flip exactly once
//!   and are read without a lock afterwards.
//! - [`IrqGuard`]: raises the interrupt priority level for its lifetime and
//!   restores the previous level on drop, over any [`InterruptMask`].

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
mod spin_lock;
mod sync_once_cell;

pub use irq::{InterruptMask, IrqGuard, SoftInterrupts};
pub use spin_lock::{SpinLock, SpinLockGuard};
pub use sync_once_cell::SyncOnceCell;
