//! # Per-Process Address Space
//!
//! A software page table for one process: a sparse map from 4 KiB virtual
//! pages to leaf [`PtEntry`] values. Absent pages read back as
//! [`PtEntry::zero`] (unmapped), so storing a zero entry removes the page.
//!
//! ## Safety / TLB
//!
//! Changing an entry of the active address space on real hardware must be
//! followed by a TLB flush of that page (`sfence.vma`). The pager performs
//! every change through [`AddressSpace::set`], which is the single place
//! where such maintenance hooks in.

use crate::page_table::{PtEntry, PtEntryKind};
use alloc::collections::BTreeMap;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress, VirtualPage};

/// Leaf entries of one process, keyed by virtual page.
#[derive(Debug, Default)]
pub struct AddressSpace {
    entries: BTreeMap<VirtualPage, PtEntry>,
}

impl AddressSpace {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Look up the leaf entry covering `va`.
    #[must_use]
    pub fn walk(&self, va: VirtualAddress) -> PtEntry {
        self.entry(va.page())
    }

    /// Leaf entry of `page`, zero if never mapped.
    #[must_use]
    pub fn entry(&self, page: VirtualPage) -> PtEntry {
        self.entries.get(&page).copied().unwrap_or_default()
    }

    /// Replace the leaf entry of `page`; returns the previous entry.
    pub fn set(&mut self, page: VirtualPage, entry: PtEntry) -> PtEntry {
        let previous = if entry.is_unmapped() {
            self.entries.remove(&page)
        } else {
            self.entries.insert(page, entry)
        };
        previous.unwrap_or_default()
    }

    /// Translate `va` to a physical address if its page is resident.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        match self.walk(va).decode() {
            PtEntryKind::Resident { frame, .. } => {
                Some(PhysicalAddress::new(frame.base().as_u64() + va.page_offset()))
            }
            PtEntryKind::Evicted { .. } | PtEntryKind::Unmapped => None,
        }
    }

    /// All mapped (resident or evicted) pages in address order.
    pub fn iter(&self) -> impl Iterator<Item = (VirtualPage, PtEntry)> + '_ {
        self.entries.iter().map(|(p, e)| (*p, *e))
    }

    /// Pages whose entry is tagged evicted.
    pub fn evicted_pages(&self) -> impl Iterator<Item = VirtualPage> + '_ {
        self.iter().filter(|(_, e)| e.is_evicted()).map(|(p, _)| p)
    }

    /// Pages whose entry is tagged resident.
    pub fn resident_pages(&self) -> impl Iterator<Item = VirtualPage> + '_ {
        self.iter().filter(|(_, e)| e.is_resident()).map(|(p, _)| p)
    }

    /// Number of mapped pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry, returning them.
    pub fn drain(&mut self) -> impl Iterator<Item = (VirtualPage, PtEntry)> {
        core::mem::take(&mut self.entries).into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PageEntryBits, SwapOffset};
    use kernel_memory_addresses::PhysicalPage;

    #[test]
    fn unmapped_by_default() {
        let aspace = AddressSpace::new();
        assert!(aspace.walk(VirtualAddress::new(0x2000)).is_unmapped());
        assert!(aspace.translate(VirtualAddress::new(0x2000)).is_none());
    }

    #[test]
    fn translate_resident_adds_offset() {
        let mut aspace = AddressSpace::new();
        let page = VirtualAddress::new(0x3000).page();
        let frame = PhysicalPage::from_number(0x80_000);
        aspace.set(page, PtEntry::make_resident(PageEntryBits::user_rw(), frame));
        assert_eq!(
            aspace.translate(VirtualAddress::new(0x3abc)),
            Some(PhysicalAddress::new(0x8000_0abc))
        );
    }

    #[test]
    fn zero_entry_removes_page() {
        let mut aspace = AddressSpace::new();
        let page = VirtualAddress::new(0x4000).page();
        aspace.set(
            page,
            PtEntry::make_evicted(PageEntryBits::user_rw(), SwapOffset::new(2)),
        );
        assert_eq!(aspace.evicted_pages().collect::<Vec<_>>(), vec![page]);
        let prev = aspace.set(page, PtEntry::zero());
        assert!(prev.is_evicted());
        assert!(aspace.is_empty());
    }
}
