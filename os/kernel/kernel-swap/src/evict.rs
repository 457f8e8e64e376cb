//! FIFO eviction: move a process's oldest resident page to its backing store.

use crate::Pager;
use crate::backing_store::{BackingStore, BackingStoreError};
use crate::error::{FatalKind, PagingError, SwapError};
use crate::pager::debug_check;
use crate::process::Process;
use kernel_memory_addresses::{PhysicalPage, VirtualPage};
use kernel_vmem::{FrameAlloc, PhysMapper, PtEntry, PtEntryKind, SwapOffset};
use log::debug;

/// What one eviction did.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Eviction {
    /// The page that left memory.
    pub page: VirtualPage,
    /// Where its contents went.
    pub offset: SwapOffset,
    /// The frame it occupied.
    pub frame: PhysicalPage,
}

impl<M: PhysMapper, A: FrameAlloc> Pager<'_, M, A> {
    /// Evict the longest-resident page of `process` and return its frame to
    /// the pool.
    ///
    /// # Errors
    /// - [`SwapError::NoVictim`] if the process has no resident page.
    /// - [`SwapError::CapacityExceeded`] if its eviction queue is full.
    /// - [`SwapError::BackingStoreFull`] if the store has no free slot.
    ///
    /// All of these leave the process unchanged. A victim whose entry is not
    /// resident is fatal.
    pub fn evict_one<S: BackingStore>(
        &self,
        process: &mut Process<S>,
    ) -> Result<Eviction, PagingError> {
        let eviction = self.evict_victim(process)?;
        self.frames.free_4k(eviction.frame);
        debug_check(process);
        Ok(eviction)
    }

    /// Evict like [`evict_one`](Self::evict_one) but hand the frame to the
    /// caller instead of the pool.
    ///
    /// May run in the middle of a restoration, while the faulting page's
    /// queue entry is out; callers check consistency once they are done.
    pub(crate) fn evict_victim<S: BackingStore>(
        &self,
        process: &mut Process<S>,
    ) -> Result<Eviction, PagingError> {
        let page = process.paging.peek_victim().ok_or(SwapError::NoVictim)?;
        let PtEntryKind::Resident { frame, flags } = process.space.entry(page).decode() else {
            return Err(PagingError::fatal(FatalKind::VictimNotResident(page)));
        };
        if process.paging.queue_is_full() {
            return Err(SwapError::CapacityExceeded {
                capacity: process.paging.queue_capacity(),
            }
            .into());
        }

        let swap = &process.swap;
        let offset = self
            .mapper
            .with_frame(frame, |bytes| swap.write_page(bytes))
            .map_err(|e| match e {
                BackingStoreError::Full => PagingError::from(SwapError::BackingStoreFull),
                BackingStoreError::Corrupt(o) => {
                    PagingError::fatal(FatalKind::BackingStoreCorrupt(o))
                }
            })?;

        process.space.set(page, PtEntry::make_evicted(flags, offset));
        process.paging.pop_victim();
        process.paging.enqueue_evicted(page, offset)?;
        process.paging.count_eviction();

        debug!(
            "pid {}: evicted {page} from {frame} to slot {offset}",
            process.pid()
        );
        Ok(Eviction {
            page,
            offset,
            frame,
        })
    }
}
