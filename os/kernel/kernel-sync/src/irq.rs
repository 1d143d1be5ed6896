//! Interrupt priority masking.
//!
//! The machine exposes two operations: raise the priority level to "high"
//! (all interrupts off) and restore a previously saved level. [`InterruptMask`]
//! abstracts those so TLB code can be exercised off-target; [`IrqGuard`] pairs
//! them so the restore cannot be forgotten.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Raise/restore access to the processor's interrupt priority level.
pub trait InterruptMask {
    /// Opaque saved level returned by [`raise`](Self::raise).
    type Level: Copy;

    /// Disable all interrupts and return the level that was in effect.
    fn raise(&self) -> Self::Level;

    /// Restore a level previously returned by [`raise`](Self::raise).
    fn restore(&self, prev: Self::Level);
}

impl<M: InterruptMask + ?Sized> InterruptMask for &M {
    type Level = M::Level;

    #[inline]
    fn raise(&self) -> Self::Level {
        (**self).raise()
    }

    #[inline]
    fn restore(&self, prev: Self::Level) {
        (**self).restore(prev);
    }
}

/// RAII guard that masks interrupts on creation and restores them on drop.
///
/// Guards nest: an inner guard saves "already masked" and its drop leaves
/// interrupts masked until the outer guard goes away.
///
/// # Examples
///
/// ```
/// use kernel_sync::{IrqGuard, SoftInterrupts};
///
/// let irq = SoftInterrupts::new();
/// {
///     let _g = IrqGuard::new(&irq);
///     assert!(!irq.are_enabled());
/// }
/// assert!(irq.are_enabled());
/// ```
#[must_use = "interrupts are restored as soon as the guard is dropped"]
pub struct IrqGuard<'a, M: InterruptMask + ?Sized> {
    mask: &'a M,
    prev: M::Level,
}

impl<'a, M: InterruptMask + ?Sized> IrqGuard<'a, M> {
    /// Raises the priority level and remembers the previous one.
    #[inline]
    pub fn new(mask: &'a M) -> Self {
        let prev = mask.raise();
        Self { mask, prev }
    }
}

impl<M: InterruptMask + ?Sized> Drop for IrqGuard<'_, M> {
    fn drop(&mut self) {
        self.mask.restore(self.prev);
    }
}

/// Software interrupt state for hosted builds and tests.
///
/// Tracks whether interrupts are enabled and how many times they were masked.
#[derive(Debug)]
pub struct SoftInterrupts {
    enabled: AtomicBool,
    raises: AtomicUsize,
}

impl Default for SoftInterrupts {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftInterrupts {
    /// Starts with interrupts enabled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            raises: AtomicUsize::new(0),
        }
    }

    #[inline]
    #[must_use]
    pub fn are_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Number of [`raise`](InterruptMask::raise) calls so far.
    #[inline]
    #[must_use]
    pub fn raise_count(&self) -> usize {
        self.raises.load(Ordering::Relaxed)
    }
}

impl InterruptMask for SoftInterrupts {
    /// `true` if interrupts were enabled before the call.
    type Level = bool;

    fn raise(&self) -> bool {
        self.raises.fetch_add(1, Ordering::Relaxed);
        self.enabled.swap(false, Ordering::AcqRel)
    }

    fn restore(&self, prev: bool) {
        if prev {
            self.enabled.store(true, Ordering::Release);
        }
    }
}
