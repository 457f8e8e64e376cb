use crate::backing_store::BackingStore;
use crate::error::{FatalKind, PagingError, SwapError};
use crate::paging_state::PagingStats;
use crate::process::{Pid, Process};
use crate::PagingConfig;
use kernel_memory_addresses::{PhysicalPage, VirtualAddress, VirtualPage};
use kernel_vmem::{FrameAlloc, PageEntryBits, PhysMapper, PtEntry, PtEntryKind, SwapOffset};
use log::{debug, info, warn};

/// Demand-paging engine shared by all processes.
///
/// Holds the machine-wide collaborators (frame pool and physical memory
/// access); everything per-process is passed in as a [`Process`].
///
/// ### Example
/// ```rust
/// use kernel_alloc::Ram;
/// use kernel_memory_addresses::{PhysicalPage, VirtualAddress};
/// use kernel_swap::{MemoryBackingStore, Pager, PagingConfig};
/// use kernel_vmem::PageEntryBits;
///
/// let ram = Ram::new(PhysicalPage::from_number(0x80_000), 2);
/// let cfg = PagingConfig::DEFAULT.with_max_total_pages(4);
/// let pager = Pager::new(&ram, &ram, cfg);
/// let mut p = pager.spawn(1, MemoryBackingStore::with_capacity(4));
///
/// pager.map_user_page(&mut p, VirtualAddress::new(0x1000), PageEntryBits::user_rw()).unwrap();
/// let ev = pager.evict_one(&mut p).unwrap();
/// assert_eq!(ev.page.base(), VirtualAddress::new(0x1000));
/// assert_eq!(p.paging().queue_size(), 1);
/// pager.teardown(&mut p);
/// ```
#[derive(Debug)]
pub struct Pager<'k, M, A> {
    pub(crate) mapper: &'k M,
    pub(crate) frames: &'k A,
    pub(crate) config: PagingConfig,
}

impl<'k, M: PhysMapper, A: FrameAlloc> Pager<'k, M, A> {
    #[must_use]
    pub fn new(mapper: &'k M, frames: &'k A, config: PagingConfig) -> Self {
        debug_assert!(config.validate().is_ok(), "invalid {config:?}");
        Self {
            mapper,
            frames,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &PagingConfig {
        &self.config
    }

    /// Create a process whose paging state is sized from this pager's config.
    #[must_use]
    pub fn spawn<S: BackingStore>(&self, pid: Pid, swap: S) -> Process<S> {
        Process::new(pid, swap, self.config)
    }

    /// Back `va`'s page with a fresh zeroed frame.
    ///
    /// When the process is at its resident limit, or the frame pool is
    /// empty, the process's oldest resident page is evicted first and its
    /// frame reused.
    ///
    /// # Errors
    /// - [`SwapError::AlreadyMapped`] if the page is resident or evicted.
    /// - [`SwapError::OutOfMemory`] if no frame can be found even by evicting.
    /// - Any eviction error.
    pub fn map_user_page<S: BackingStore>(
        &self,
        process: &mut Process<S>,
        va: VirtualAddress,
        flags: PageEntryBits,
    ) -> Result<PhysicalPage, PagingError> {
        let page = va.page();
        if !process.space.entry(page).is_unmapped() {
            return Err(SwapError::AlreadyMapped(page).into());
        }

        let frame = self.acquire_frame(process)?;
        self.mapper.zero_frame(frame);
        if let Err(e) = process.paging.record_resident(page) {
            self.frames.free_4k(frame);
            return Err(e.into());
        }
        process
            .space
            .set(page, PtEntry::make_resident(flags.with_user(true), frame));

        debug!("pid {}: mapped {page} -> {frame}", process.pid());
        debug_check(process);
        Ok(frame)
    }

    /// Remove `va`'s page, freeing its frame or its backing-store slot.
    ///
    /// # Errors
    /// [`SwapError::NotMapped`] if there is nothing to remove; fatal if the
    /// page's bookkeeping disagrees with its entry.
    pub fn unmap_user_page<S: BackingStore>(
        &self,
        process: &mut Process<S>,
        va: VirtualAddress,
    ) -> Result<(), PagingError> {
        let page = va.page();
        match process.space.entry(page).decode() {
            PtEntryKind::Resident { frame, .. } => {
                if !process.paging.forget_resident(page) {
                    return Err(PagingError::fatal(FatalKind::ResidentUntracked(page)));
                }
                process.space.set(page, PtEntry::zero());
                self.frames.free_4k(frame);
            }
            PtEntryKind::Evicted { offset, .. } => {
                let index = locate_queued(process, page, offset)?;
                process.paging.take_evicted(index);
                process.space.set(page, PtEntry::zero());
                process.swap.release(offset);
            }
            PtEntryKind::Unmapped => return Err(SwapError::NotMapped(page).into()),
        }
        debug!("pid {}: unmapped {page}", process.pid());
        debug_check(process);
        Ok(())
    }

    /// Release every frame and backing-store slot of an exiting process.
    pub fn teardown<S: BackingStore>(&self, process: &mut Process<S>) -> PagingStats {
        let (mut frames, mut slots) = (0_usize, 0_usize);
        for (_, entry) in process.space.drain() {
            match entry.decode() {
                PtEntryKind::Resident { frame, .. } => {
                    self.frames.free_4k(frame);
                    frames += 1;
                }
                PtEntryKind::Evicted { offset, .. } => {
                    process.swap.release(offset);
                    slots += 1;
                }
                PtEntryKind::Unmapped => {}
            }
        }
        process.paging.clear();

        let stats = process.paging.stats();
        info!(
            "pid {}: released {frames} frames, {slots} swap slots; {} evictions, {} restorations, peak queue depth {}",
            process.pid(),
            stats.evictions,
            stats.restorations,
            stats.peak_evicted
        );
        stats
    }

    /// A frame for a page about to become resident in `process`.
    ///
    /// Either fails without touching any state, or succeeds having evicted
    /// at most one page.
    pub(crate) fn acquire_frame<S: BackingStore>(
        &self,
        process: &mut Process<S>,
    ) -> Result<PhysicalPage, PagingError> {
        if process.paging.resident_count() < self.config.max_resident_pages {
            if let Some(frame) = self.frames.alloc_4k() {
                return Ok(frame);
            }
            debug!("pid {}: frame pool exhausted", process.pid());
        }

        match self.evict_victim(process) {
            Ok(eviction) => Ok(eviction.frame),
            Err(PagingError::Swap(SwapError::NoVictim)) => {
                warn!("pid {}: out of frames and nothing to evict", process.pid());
                Err(SwapError::OutOfMemory.into())
            }
            Err(e) => Err(e),
        }
    }
}

/// Position of `page` in the eviction queue, checked against the offset its
/// page-table entry names.
pub(crate) fn locate_queued<S>(
    process: &Process<S>,
    page: VirtualPage,
    offset: SwapOffset,
) -> Result<usize, PagingError> {
    let Some((index, queued)) = process.paging.locate_evicted(page) else {
        return Err(PagingError::fatal(FatalKind::QueueMismatch {
            page,
            head: process.paging.oldest_evicted().map(|e| e.page),
        }));
    };
    if queued.offset != offset {
        return Err(PagingError::fatal(FatalKind::OffsetMismatch {
            page,
            queued: queued.offset,
            entry: offset,
        }));
    }
    Ok(index)
}

#[inline]
pub(crate) fn debug_check<S>(process: &Process<S>) {
    debug_assert_eq!(
        process.paging.check_consistency(&process.space),
        Ok(()),
        "pid {}",
        process.pid()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBackingStore;
    use kernel_alloc::Ram;

    #[test]
    fn unmapping_an_untracked_resident_page_is_fatal() {
        let ram = Ram::new(PhysicalPage::from_number(0x80_000), 2);
        let pager = Pager::new(&ram, &ram, PagingConfig::DEFAULT);
        let mut p = pager.spawn(1, MemoryBackingStore::with_capacity(2));
        let va = VirtualAddress::new(0x4000);
        pager.map_user_page(&mut p, va, PageEntryBits::user_rw()).unwrap();
        assert_eq!(p.paging.pop_victim(), Some(va.page()));
        let free = ram.free_frames();

        let err = pager.unmap_user_page(&mut p, va).unwrap_err();
        let PagingError::Fatal(fatal) = err else {
            panic!("expected fatal, got {err:?}");
        };
        assert_eq!(fatal.into_kind(), FatalKind::ResidentUntracked(va.page()));
        assert!(p.space.entry(va.page()).is_resident());
        assert_eq!(ram.free_frames(), free);
    }

    #[test]
    fn unmapping_a_resident_page_returns_its_frame() {
        let ram = Ram::new(PhysicalPage::from_number(0x80_000), 2);
        let pager = Pager::new(&ram, &ram, PagingConfig::DEFAULT);
        let mut p = pager.spawn(1, MemoryBackingStore::with_capacity(2));
        let va = VirtualAddress::new(0x4000);
        pager.map_user_page(&mut p, va, PageEntryBits::user_rw()).unwrap();

        pager.unmap_user_page(&mut p, va).unwrap();
        assert_eq!(ram.free_frames(), 2);
        assert_eq!(p.paging.peek_victim(), None);
    }
}
