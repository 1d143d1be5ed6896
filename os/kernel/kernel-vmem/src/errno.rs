//! POSIX error numbers returned to the trap and syscall layers.

/// Error numbers surfaced by the VM (Linux/POSIX values).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, thiserror::Error)]
#[repr(i32)]
pub enum Errno {
    #[error("out of memory")]
    ENOMEM = 12,
    #[error("bad address")]
    EFAULT = 14,
    #[error("invalid argument")]
    EINVAL = 22,
    #[error("read-only file system")]
    EROFS = 30,
    #[error("function not implemented")]
    ENOSYS = 38,
}

impl Errno {
    /// "Unimplemented": what an address space answers to a third region.
    pub const EUNIMP: Self = Self::ENOSYS;

    /// The raw error number.
    #[inline]
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl From<Errno> for i32 {
    fn from(e: Errno) -> Self {
        e.code()
    }
}
