//! A loadable region: a page-aligned virtual range and the frames behind it.

use super::VmError;
use alloc::vec::Vec;
use kernel_memory_addresses::{PhysicalPage, VirtualAddress, VirtualPage};

bitflags::bitflags! {
    /// Access a program header asks for.
    ///
    /// Recorded for the loader's benefit; translations are not restricted per
    /// page by these flags.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct RegionPermissions: u32 {
        /// Executable (ELF `PF_X`).
        const EXECUTE = 1 << 0;
        /// Writable (ELF `PF_W`).
        const WRITE   = 1 << 1;
        /// Readable (ELF `PF_R`).
        const READ    = 1 << 2;
    }
}

/// One defined region of an address space.
#[derive(Debug)]
pub struct Region {
    base: VirtualPage,
    pages: u32,
    permissions: RegionPermissions,
    /// One frame per page once prepared; empty before.
    pub(super) frames: Vec<PhysicalPage>,
}

impl Region {
    /// An unpopulated region with room for one frame per page.
    pub(super) fn new(
        base: VirtualPage,
        pages: u32,
        permissions: RegionPermissions,
    ) -> Result<Self, VmError> {
        let mut frames = Vec::new();
        frames
            .try_reserve_exact(pages as usize)
            .map_err(|_| VmError::OutOfMemory)?;
        Ok(Self {
            base,
            pages,
            permissions,
            frames,
        })
    }

    /// Same base, size and permissions; no frames.
    pub(super) fn empty_like(&self) -> Result<Self, VmError> {
        Self::new(self.base, self.pages, self.permissions)
    }

    /// First page of the region.
    #[inline]
    #[must_use]
    pub const fn base(&self) -> VirtualPage {
        self.base
    }

    #[inline]
    #[must_use]
    pub const fn pages(&self) -> u32 {
        self.pages
    }

    #[inline]
    #[must_use]
    pub const fn permissions(&self) -> RegionPermissions {
        self.permissions
    }

    /// First address past the region.
    #[must_use]
    pub fn end(&self) -> VirtualAddress {
        // define_region rejected anything that would not fit.
        self.base
            .checked_add_pages(self.pages)
            .map_or(VirtualAddress::new(u32::MAX), VirtualPage::base)
    }

    /// Frames backing the region, in page order.
    #[inline]
    #[must_use]
    pub fn frames(&self) -> &[PhysicalPage] {
        &self.frames
    }

    #[inline]
    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.frames.len() == self.pages as usize
    }

    /// Page index of `page` within the region.
    #[must_use]
    pub fn index_of(&self, page: VirtualPage) -> Option<u32> {
        page.pages_since(self.base).filter(|&i| i < self.pages)
    }
}
