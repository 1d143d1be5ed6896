use super::{Tlb, TlbEntry};
use alloc::vec::Vec;
use kernel_info::memory::NUM_TLB;
use kernel_sync::SpinLock;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// An in-memory TLB.
///
/// Starts with every slot holding its canonical invalid entry. Random
/// replacement draws from a seeded [`SmallRng`], so a given seed always picks
/// the same victims.
pub struct SoftTlb {
    inner: SpinLock<Inner>,
}

struct Inner {
    entries: Vec<TlbEntry>,
    rng: SmallRng,
    writes: usize,
}

impl SoftTlb {
    /// Seed used by [`Default`].
    pub const DEFAULT_SEED: u64 = 0x5EED_F00D;

    /// A TLB of `slots` entries whose random register is seeded with `seed`.
    #[must_use]
    pub fn new(slots: usize, seed: u64) -> Self {
        Self {
            inner: SpinLock::new(Inner {
                entries: (0..slots).map(TlbEntry::invalid).collect(),
                rng: SmallRng::seed_from_u64(seed),
                writes: 0,
            }),
        }
    }

    /// Copy of every slot, in slot order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TlbEntry> {
        self.inner.with_lock(|t| t.entries.clone())
    }

    /// Number of valid slots.
    #[must_use]
    pub fn valid_entries(&self) -> usize {
        self.inner
            .with_lock(|t| t.entries.iter().filter(|e| e.is_valid()).count())
    }

    /// Writes performed so far, random or not.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.inner.with_lock(|t| t.writes)
    }
}

impl Default for SoftTlb {
    fn default() -> Self {
        Self::new(NUM_TLB, Self::DEFAULT_SEED)
    }
}

impl Tlb for SoftTlb {
    fn slots(&self) -> usize {
        self.inner.with_lock(|t| t.entries.len())
    }

    fn read(&self, slot: usize) -> TlbEntry {
        self.inner.with_lock(|t| t.entries[slot])
    }

    fn write(&self, slot: usize, entry: TlbEntry) {
        self.inner.with_lock(|t| {
            t.entries[slot] = entry;
            t.writes += 1;
        });
    }

    fn write_random(&self, entry: TlbEntry) {
        self.inner.with_lock(|t| {
            let slot = t.rng.gen_range(0..t.entries.len());
            t.entries[slot] = entry;
            t.writes += 1;
        });
    }
}

impl core::fmt::Debug for SoftTlb {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SoftTlb")
            .field("slots", &self.slots())
            .field("valid", &self.valid_entries())
            .finish_non_exhaustive()
    }
}
