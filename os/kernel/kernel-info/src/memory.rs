//! # Memory and Paging Limits

/// Size of a page and of a physical frame, in bytes.
pub const PAGE_SIZE: usize = 4096;

/// `log2(PAGE_SIZE)`.
pub const PAGE_SHIFT: u32 = 12;

/// Maximum number of pages a single process may have evicted at once.
///
/// This is the capacity of the per-process eviction queue.
pub const MAX_TOTAL_PAGES: usize = 32;

/// Maximum number of resident pages per process.
///
/// Mapping a page beyond this limit first evicts the process's oldest
/// resident page.
pub const MAX_RESIDENT_PAGES: usize = 16;

/// Default number of page-sized slots in a process's backing store.
pub const DEFAULT_SWAP_SLOTS: usize = MAX_TOTAL_PAGES;

/// Width in bits of the frame/offset field of a page-table entry.
pub const PTE_FIELD_BITS: u32 = 56;

const _: () = {
    assert!(PAGE_SIZE == 1 << PAGE_SHIFT);
    assert!(MAX_RESIDENT_PAGES > 0);
    assert!(MAX_TOTAL_PAGES >= MAX_RESIDENT_PAGES);
    assert!(DEFAULT_SWAP_SLOTS >= MAX_TOTAL_PAGES);
    assert!(PTE_FIELD_BITS < 64);
};
