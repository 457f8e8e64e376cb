//! Backing store for evicted page contents.
//!
//! The paging code only ever sees the [`BackingStore`] trait: hand it a page,
//! get an opaque [`SwapOffset`] back, and later read the same bytes out of
//! that offset. [`MemoryBackingStore`] is a slot-table implementation that
//! keeps evicted pages in kernel heap memory.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use kernel_info::memory::DEFAULT_SWAP_SLOTS;
use kernel_sync::SpinLock;
use kernel_vmem::{PageBuf, SwapOffset};
use log::trace;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackingStoreError {
    /// No free slot left.
    #[error("backing store full")]
    Full,
    /// The offset does not name a live slot.
    #[error("offset {0} does not name a stored page")]
    Corrupt(SwapOffset),
}

/// Page-granular storage for evicted pages.
///
/// Safe to use from any core; implementations serialize internally.
pub trait BackingStore {
    /// Store a copy of `page` and return where it went.
    ///
    /// # Errors
    /// [`BackingStoreError::Full`] if no slot is free.
    fn write_page(&self, page: &PageBuf) -> Result<SwapOffset, BackingStoreError>;

    /// Copy the page stored at `offset` into `out`.
    ///
    /// # Errors
    /// [`BackingStoreError::Corrupt`] if `offset` is not a live slot.
    fn read_page(&self, offset: SwapOffset, out: &mut PageBuf) -> Result<(), BackingStoreError>;

    /// Free the slot at `offset`. Releasing an already free slot is a no-op.
    fn release(&self, offset: SwapOffset);
}

struct SlotTable {
    slots: Vec<Option<Box<PageBuf>>>,
    in_use: usize,
}

impl SlotTable {
    fn index(offset: SwapOffset) -> Option<usize> {
        usize::try_from(offset.as_u64()).ok()
    }
}

/// Backing store that keeps pages on the heap, one boxed page per slot.
///
/// Offsets are slot indices. Free slots are reused lowest-first.
pub struct MemoryBackingStore {
    table: SpinLock<SlotTable>,
}

impl MemoryBackingStore {
    /// Create a store with room for `slots` pages.
    #[must_use]
    pub fn with_capacity(slots: usize) -> Self {
        let mut v = Vec::with_capacity(slots);
        v.resize_with(slots, || None);
        Self {
            table: SpinLock::new(
                "swap-slots",
                SlotTable {
                    slots: v,
                    in_use: 0,
                },
            ),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.table.with_lock(|t| t.slots.len())
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.table.with_lock(|t| t.in_use)
    }

    #[must_use]
    pub fn is_live(&self, offset: SwapOffset) -> bool {
        self.table.with_lock(|t| {
            SlotTable::index(offset)
                .and_then(|i| t.slots.get(i))
                .is_some_and(Option::is_some)
        })
    }
}

impl Default for MemoryBackingStore {
    /// A store sized to hold a full eviction queue.
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SWAP_SLOTS)
    }
}

impl BackingStore for MemoryBackingStore {
    fn write_page(&self, page: &PageBuf) -> Result<SwapOffset, BackingStoreError> {
        let mut t = self.table.lock();
        let idx = t
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(BackingStoreError::Full)?;
        t.slots[idx] = Some(Box::new(*page));
        t.in_use += 1;
        let offset = SwapOffset::new(idx as u64);
        trace!("swap slot {offset} written ({} in use)", t.in_use);
        Ok(offset)
    }

    fn read_page(&self, offset: SwapOffset, out: &mut PageBuf) -> Result<(), BackingStoreError> {
        let t = self.table.lock();
        let stored = SlotTable::index(offset)
            .and_then(|i| t.slots.get(i))
            .and_then(Option::as_ref)
            .ok_or(BackingStoreError::Corrupt(offset))?;
        out.copy_from_slice(&stored[..]);
        Ok(())
    }

    fn release(&self, offset: SwapOffset) {
        let mut t = self.table.lock();
        let Some(idx) = SlotTable::index(offset) else {
            return;
        };
        if t.slots.get_mut(idx).and_then(Option::take).is_some() {
            t.in_use -= 1;
            trace!("swap slot {offset} released ({} in use)", t.in_use);
        }
    }
}

impl fmt::Debug for MemoryBackingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (cap, used) = self.table.with_lock(|t| (t.slots.len(), t.in_use));
        f.debug_struct("MemoryBackingStore")
            .field("capacity", &cap)
            .field("in_use", &used)
            .finish()
    }
}
