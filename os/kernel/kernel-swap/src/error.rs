//! Error taxonomy of the paging subsystem.
//!
//! | Class | Type | Handling |
//! |-------|------|----------|
//! | Resource exhaustion / capacity | [`SwapError`] | Returned to the caller; a fault that hits one terminates the faulting process. |
//! | Kernel-fatal inconsistency | [`Fatal`] | Never recovered; the dispatcher halts. |
//!
//! [`PagingError`] carries either so internal helpers can use `?`.

use core::fmt;
use kernel_memory_addresses::{VirtualAddress, VirtualPage};
use kernel_vmem::SwapOffset;
use log::error;

/// Recoverable (or at least non-corrupting) paging failures.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SwapError {
    #[error("eviction queue full ({capacity} pages already evicted)")]
    CapacityExceeded { capacity: usize },
    #[error("eviction queue is empty")]
    QueueEmpty,
    #[error("backing store is full")]
    BackingStoreFull,
    #[error("no resident page left to evict")]
    NoVictim,
    #[error("out of physical frames")]
    OutOfMemory,
    #[error("page {0} is already mapped")]
    AlreadyMapped(VirtualPage),
    #[error("page {0} is not mapped")]
    NotMapped(VirtualPage),
}

/// What went wrong in a kernel-fatal condition.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FatalKind {
    #[error("page fault at {0} hit a resident entry")]
    ResidentPageFaulted(VirtualAddress),
    #[error("eviction victim {0} is not resident")]
    VictimNotResident(VirtualPage),
    #[error("resident page {0} is missing from the resident ring")]
    ResidentUntracked(VirtualPage),
    #[error("evicted page {page} is missing from the eviction queue (head: {head:?})")]
    QueueMismatch {
        page: VirtualPage,
        head: Option<VirtualPage>,
    },
    #[error("evicted page {page} is queued at offset {queued} but its entry names offset {entry}")]
    OffsetMismatch {
        page: VirtualPage,
        queued: SwapOffset,
        entry: SwapOffset,
    },
    #[error("backing store slot {0} is invalid")]
    BackingStoreCorrupt(SwapOffset),
}

/// An unrecoverable system error.
///
/// A `Fatal` must be consumed with [`halt`](Self::halt) (or, in diagnostic
/// code, [`into_kind`](Self::into_kind)). Dropping it any other way halts as
/// well, so a kernel-fatal condition can never silently disappear into a
/// discarded `Result`.
#[must_use = "kernel-fatal conditions must be handled with `halt()`"]
pub struct Fatal {
    kind: FatalKind,
}

impl Fatal {
    pub(crate) const fn new(kind: FatalKind) -> Self {
        Self { kind }
    }

    #[must_use]
    pub const fn kind(&self) -> FatalKind {
        self.kind
    }

    /// Halt the system.
    pub fn halt(self) -> ! {
        let kind = self.into_kind();
        error!("kernel-fatal: {kind}");
        panic!("kernel-fatal: {kind}");
    }

    /// Defuse the value and return its kind without halting.
    #[must_use]
    pub fn into_kind(self) -> FatalKind {
        let kind = self.kind;
        core::mem::forget(self);
        kind
    }
}

impl Drop for Fatal {
    fn drop(&mut self) {
        error!("kernel-fatal condition dropped unhandled: {}", self.kind);
        panic!("unhandled kernel-fatal condition: {}", self.kind);
    }
}

impl fmt::Debug for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Fatal").field(&self.kind).finish()
    }
}

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kernel-fatal: {}", self.kind)
    }
}

impl core::error::Error for Fatal {}

/// Either class of failure.
#[derive(Debug, thiserror::Error)]
pub enum PagingError {
    #[error(transparent)]
    Swap(#[from] SwapError),
    #[error(transparent)]
    Fatal(#[from] Fatal),
}

impl PagingError {
    pub(crate) const fn fatal(kind: FatalKind) -> Self {
        Self::Fatal(Fatal::new(kind))
    }

    /// The recoverable error, if this is one.
    #[must_use]
    pub fn as_swap(&self) -> Option<SwapError> {
        match self {
            Self::Swap(e) => Some(*e),
            Self::Fatal(_) => None,
        }
    }
}
