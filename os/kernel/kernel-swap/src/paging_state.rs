//! Per-process paging bookkeeping.
//!
//! Two bounded FIFOs per process:
//!
//! - the **resident ring** lists the process's resident user pages in the
//!   order they became resident; its head is the next eviction victim.
//! - the **eviction queue** lists evicted pages in eviction order, each
//!   together with the backing-store offset its contents were written to.
//!
//! ### Invariants (at every operation boundary)
//! - The eviction queue holds exactly the pages whose entries are evicted,
//!   with matching offsets, each once.
//! - The resident ring holds exactly the resident user pages, each once.

use crate::PagingConfig;
use crate::error::SwapError;
use crate::fifo::FifoRing;
use kernel_memory_addresses::VirtualPage;
use kernel_vmem::{AddressSpace, PtEntryKind, SwapOffset};
use log::trace;

/// An entry of the eviction queue.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EvictedPage {
    pub page: VirtualPage,
    pub offset: SwapOffset,
}

/// Counters kept per process.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct PagingStats {
    pub evictions: u64,
    pub restorations: u64,
    /// Largest eviction queue depth observed.
    pub peak_evicted: usize,
}

/// Ways the bookkeeping can disagree with the page table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Inconsistency {
    #[error("{queued} pages queued but {entries} entries are evicted")]
    EvictedCount { queued: usize, entries: usize },
    #[error("queued page {0} is not evicted in the page table")]
    QueuedNotEvicted(VirtualPage),
    #[error("queued page {page} has offset {queued}, entry has {entry}")]
    Offset {
        page: VirtualPage,
        queued: SwapOffset,
        entry: SwapOffset,
    },
    #[error("page {0} is queued twice")]
    Duplicate(VirtualPage),
    #[error("{tracked} pages tracked resident but {entries} entries are resident")]
    ResidentCount { tracked: usize, entries: usize },
    #[error("tracked page {0} is not resident in the page table")]
    TrackedNotResident(VirtualPage),
}

#[derive(Debug, Clone)]
pub struct PagingState {
    queue: FifoRing<EvictedPage>,
    resident: FifoRing<VirtualPage>,
    stats: PagingStats,
}

impl PagingState {
    /// Empty state sized from `config`.
    #[must_use]
    pub fn new(config: PagingConfig) -> Self {
        Self {
            queue: FifoRing::with_capacity(config.max_total_pages),
            resident: FifoRing::with_capacity(config.max_resident_pages),
            stats: PagingStats::default(),
        }
    }

    /// Append a just-evicted page at the tail of the eviction queue.
    ///
    /// # Errors
    /// [`SwapError::CapacityExceeded`] if the queue is full; nothing changes.
    pub fn enqueue_evicted(
        &mut self,
        page: VirtualPage,
        offset: SwapOffset,
    ) -> Result<(), SwapError> {
        self.queue
            .push_back(EvictedPage { page, offset })
            .map_err(|_| SwapError::CapacityExceeded {
                capacity: self.queue.capacity(),
            })?;
        self.stats.peak_evicted = self.stats.peak_evicted.max(self.queue.len());
        trace!("queued {page} @ {offset} (depth {})", self.queue.len());
        Ok(())
    }

    /// Remove the head of the eviction queue.
    ///
    /// # Errors
    /// [`SwapError::QueueEmpty`] if nothing is queued.
    pub fn dequeue_restored(&mut self) -> Result<EvictedPage, SwapError> {
        let head = self.queue.pop_front().ok_or(SwapError::QueueEmpty)?;
        trace!("dequeued {} (depth {})", head.page, self.queue.len());
        Ok(head)
    }

    /// Next eviction victim: the longest-resident page.
    #[must_use]
    pub fn peek_victim(&self) -> Option<VirtualPage> {
        self.resident.front()
    }

    /// Head of the eviction queue.
    #[must_use]
    pub fn oldest_evicted(&self) -> Option<EvictedPage> {
        self.queue.front()
    }

    /// Number of evicted pages.
    #[must_use]
    pub const fn queue_size(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity()
    }

    #[must_use]
    pub fn queue_is_full(&self) -> bool {
        self.queue.is_full()
    }

    #[must_use]
    pub const fn resident_count(&self) -> usize {
        self.resident.len()
    }

    /// Evicted pages, oldest first.
    pub fn evicted(&self) -> impl Iterator<Item = EvictedPage> + '_ {
        self.queue.iter()
    }

    /// Resident pages, next victim first.
    pub fn resident(&self) -> impl Iterator<Item = VirtualPage> + '_ {
        self.resident.iter()
    }

    #[must_use]
    pub const fn stats(&self) -> PagingStats {
        self.stats
    }

    /// Find `page` in the eviction queue.
    pub(crate) fn locate_evicted(&self, page: VirtualPage) -> Option<(usize, EvictedPage)> {
        let i = self.queue.position(|e| e.page == page)?;
        self.queue.get(i).map(|e| (i, e))
    }

    /// Take the queued entry at `index`; the head goes through
    /// [`dequeue_restored`](Self::dequeue_restored).
    pub(crate) fn take_evicted(&mut self, index: usize) -> Option<EvictedPage> {
        if index == 0 {
            return self.dequeue_restored().ok();
        }
        let e = self.queue.remove(index)?;
        trace!("dequeued {} out of order (depth {})", e.page, self.queue.len());
        Some(e)
    }

    /// Put back an entry taken with [`take_evicted`](Self::take_evicted).
    ///
    /// # Errors
    /// [`SwapError::CapacityExceeded`] if the queue gained an entry in between
    /// and is now full; the entry is not queued.
    pub(crate) fn requeue_evicted(
        &mut self,
        index: usize,
        entry: EvictedPage,
    ) -> Result<(), SwapError> {
        self.queue
            .insert(index, entry)
            .map_err(|_| SwapError::CapacityExceeded {
                capacity: self.queue.capacity(),
            })?;
        trace!("requeued {} at {index}", entry.page);
        Ok(())
    }

    /// Append a newly resident page to the resident ring.
    ///
    /// # Errors
    /// [`SwapError::CapacityExceeded`] if the process is at its resident limit.
    pub(crate) fn record_resident(&mut self, page: VirtualPage) -> Result<(), SwapError> {
        self.resident
            .push_back(page)
            .map_err(|_| SwapError::CapacityExceeded {
                capacity: self.resident.capacity(),
            })
    }

    pub(crate) fn pop_victim(&mut self) -> Option<VirtualPage> {
        self.resident.pop_front()
    }

    /// Drop `page` from the resident ring.
    pub(crate) fn forget_resident(&mut self, page: VirtualPage) -> bool {
        self.resident
            .position(|&p| p == page)
            .and_then(|i| self.resident.remove(i))
            .is_some()
    }

    pub(crate) const fn count_eviction(&mut self) {
        self.stats.evictions += 1;
    }

    pub(crate) const fn count_restoration(&mut self) {
        self.stats.restorations += 1;
    }

    /// Empty both rings, keeping the statistics.
    pub(crate) fn clear(&mut self) {
        self.queue.clear();
        self.resident.clear();
    }

    /// Cross-check the bookkeeping against the page table.
    ///
    /// # Errors
    /// The first [`Inconsistency`] found.
    pub fn check_consistency(&self, space: &AddressSpace) -> Result<(), Inconsistency> {
        let entries = space.evicted_pages().count();
        if entries != self.queue.len() {
            return Err(Inconsistency::EvictedCount {
                queued: self.queue.len(),
                entries,
            });
        }
        for (i, e) in self.queue.iter().enumerate() {
            if self.queue.iter().skip(i + 1).any(|o| o.page == e.page) {
                return Err(Inconsistency::Duplicate(e.page));
            }
            match space.entry(e.page).decode() {
                PtEntryKind::Evicted { offset, .. } if offset == e.offset => {}
                PtEntryKind::Evicted { offset, .. } => {
                    return Err(Inconsistency::Offset {
                        page: e.page,
                        queued: e.offset,
                        entry: offset,
                    });
                }
                _ => return Err(Inconsistency::QueuedNotEvicted(e.page)),
            }
        }

        let entries = space.resident_pages().count();
        if entries != self.resident.len() {
            return Err(Inconsistency::ResidentCount {
                tracked: self.resident.len(),
                entries,
            });
        }
        if let Some(page) = self.resident.iter().find(|&p| !space.entry(p).is_resident()) {
            return Err(Inconsistency::TrackedNotResident(page));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_memory_addresses::PhysicalPage;
    use kernel_vmem::{PageEntryBits, PtEntry};

    fn state(total: usize, resident: usize) -> PagingState {
        PagingState::new(
            PagingConfig::DEFAULT
                .with_max_total_pages(total)
                .with_max_resident_pages(resident),
        )
    }

    fn vp(n: u64) -> VirtualPage {
        VirtualPage::from_number(n)
    }

    #[test]
    fn queue_is_fifo() {
        let mut s = state(4, 4);
        s.enqueue_evicted(vp(1), SwapOffset::new(0)).unwrap();
        s.enqueue_evicted(vp(2), SwapOffset::new(1)).unwrap();
        s.enqueue_evicted(vp(3), SwapOffset::new(2)).unwrap();
        assert_eq!(s.queue_size(), 3);

        assert_eq!(s.dequeue_restored().unwrap().page, vp(1));
        assert_eq!(s.dequeue_restored().unwrap().page, vp(2));
        assert_eq!(s.dequeue_restored().unwrap().page, vp(3));
        assert_eq!(s.dequeue_restored(), Err(SwapError::QueueEmpty));
    }

    #[test]
    fn full_queue_is_left_untouched() {
        let mut s = state(2, 2);
        s.enqueue_evicted(vp(1), SwapOffset::new(0)).unwrap();
        s.enqueue_evicted(vp(2), SwapOffset::new(1)).unwrap();
        assert_eq!(
            s.enqueue_evicted(vp(3), SwapOffset::new(2)),
            Err(SwapError::CapacityExceeded { capacity: 2 })
        );
        assert_eq!(
            s.evicted().map(|e| e.page).collect::<Vec<_>>(),
            vec![vp(1), vp(2)]
        );
    }

    #[test]
    fn out_of_order_take_and_requeue() {
        let mut s = state(4, 4);
        for n in 1..=3 {
            s.enqueue_evicted(vp(n), SwapOffset::new(n)).unwrap();
        }
        let (i, e) = s.locate_evicted(vp(2)).unwrap();
        assert_eq!((i, e.offset), (1, SwapOffset::new(2)));

        let taken = s.take_evicted(i).unwrap();
        assert_eq!(s.queue_size(), 2);
        s.requeue_evicted(i, taken).unwrap();
        assert_eq!(
            s.evicted().map(|e| e.page).collect::<Vec<_>>(),
            vec![vp(1), vp(2), vp(3)]
        );
        assert!(s.locate_evicted(vp(9)).is_none());
    }

    #[test]
    fn requeue_into_a_refilled_queue_fails() {
        let mut s = state(2, 2);
        s.enqueue_evicted(vp(1), SwapOffset::new(0)).unwrap();
        s.enqueue_evicted(vp(2), SwapOffset::new(1)).unwrap();
        let taken = s.take_evicted(0).unwrap();
        s.enqueue_evicted(vp(3), SwapOffset::new(2)).unwrap();

        assert_eq!(
            s.requeue_evicted(0, taken),
            Err(SwapError::CapacityExceeded { capacity: 2 })
        );
        assert_eq!(
            s.evicted().map(|e| e.page).collect::<Vec<_>>(),
            vec![vp(2), vp(3)]
        );
    }

    #[test]
    fn victims_come_out_in_residency_order() {
        let mut s = state(4, 2);
        s.record_resident(vp(5)).unwrap();
        s.record_resident(vp(6)).unwrap();
        assert!(s.record_resident(vp(7)).is_err());
        assert_eq!(s.peek_victim(), Some(vp(5)));
        assert!(s.forget_resident(vp(5)));
        assert!(!s.forget_resident(vp(5)));
        assert_eq!(s.pop_victim(), Some(vp(6)));
        assert_eq!(s.peek_victim(), None);
    }

    #[test]
    fn peak_depth_is_tracked() {
        let mut s = state(4, 4);
        s.enqueue_evicted(vp(1), SwapOffset::new(0)).unwrap();
        s.enqueue_evicted(vp(2), SwapOffset::new(1)).unwrap();
        s.dequeue_restored().unwrap();
        s.enqueue_evicted(vp(3), SwapOffset::new(2)).unwrap();
        assert_eq!(s.stats().peak_evicted, 2);
    }

    #[test]
    fn consistency_check_spots_mismatches() {
        let flags = PageEntryBits::user_rw();
        let mut space = AddressSpace::new();
        let mut s = state(4, 4);

        space.set(vp(1), PtEntry::make_resident(flags, PhysicalPage::from_number(9)));
        s.record_resident(vp(1)).unwrap();
        space.set(vp(2), PtEntry::make_evicted(flags, SwapOffset::new(3)));
        s.enqueue_evicted(vp(2), SwapOffset::new(3)).unwrap();
        assert_eq!(s.check_consistency(&space), Ok(()));

        space.set(vp(2), PtEntry::make_evicted(flags, SwapOffset::new(4)));
        assert!(matches!(
            s.check_consistency(&space),
            Err(Inconsistency::Offset { .. })
        ));

        space.set(vp(3), PtEntry::make_evicted(flags, SwapOffset::new(5)));
        assert!(matches!(
            s.check_consistency(&space),
            Err(Inconsistency::EvictedCount {
                queued: 1,
                entries: 2
            })
        ));
    }
}
