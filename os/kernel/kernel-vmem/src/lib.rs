//! # Virtual Memory Support
//!
//! Page-table building blocks for the demand-paging subsystem.
//!
//! ## What you get
//! - [`PageEntryBits`]: the raw 64-bit leaf entry as a bitfield.
//! - [`PtEntry`] / [`PtEntryKind`]: the codec that packs and unpacks the
//!   dual meaning of an entry (resident frame vs. evicted backing offset).
//! - [`AddressSpace`]: a per-process software page table.
//! - [`FrameAlloc`] / [`PhysMapper`]: the seams through which paging code
//!   obtains physical frames and touches their bytes.
//!
//! ## Residency state machine
//!
//! ```text
//!              map                    evict
//!  Unmapped ─────────► Resident ─────────────► Evicted
//!      ▲                  ▲                       │
//!      │     unmap        └────── restore ────────┘
//!      └──────────────────────────────────────────┘
//! ```
//!
//! Protection bits are carried across every arrow unchanged; only the
//! residency bits and the frame/offset field are rewritten.

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

pub mod address_space;
mod page_entry_bits;
pub mod page_table;

pub use crate::address_space::AddressSpace;
pub use crate::page_entry_bits::PageEntryBits;
pub use crate::page_table::{PtEntry, PtEntryKind, SwapOffset};
pub use kernel_memory_addresses as addresses;

/// Re-export constants as info module.
pub use kernel_info::memory as info;

use kernel_memory_addresses::PhysicalPage;

/// Contents of one page or frame.
pub type PageBuf = [u8; info::PAGE_SIZE];

/// Source of physical 4 KiB frames.
///
/// Shared by all cores; implementations serialize their own bookkeeping, so
/// every method takes `&self`.
pub trait FrameAlloc {
    /// Allocate one frame, or `None` when the pool is exhausted.
    fn alloc_4k(&self) -> Option<PhysicalPage>;

    /// Return a frame to the pool.
    fn free_4k(&self, page: PhysicalPage);

    /// Number of frames currently available.
    fn free_frames(&self) -> usize;
}

/// Gives the kernel access to the bytes of a physical frame.
///
/// On hardware this goes through the kernel's direct map; in tests it indexes
/// a vector of frames.
pub trait PhysMapper {
    /// Run `f` with exclusive access to the bytes of `page`.
    ///
    /// # Panics
    /// Implementations panic if `page` is outside the memory they manage.
    fn with_frame<R>(&self, page: PhysicalPage, f: impl FnOnce(&mut PageBuf) -> R) -> R;

    /// Copy a frame out.
    fn read_frame(&self, page: PhysicalPage, out: &mut PageBuf) {
        self.with_frame(page, |frame| out.copy_from_slice(frame));
    }

    /// Overwrite a frame.
    fn write_frame(&self, page: PhysicalPage, data: &PageBuf) {
        self.with_frame(page, |frame| frame.copy_from_slice(data));
    }

    /// Zero-fill a frame.
    fn zero_frame(&self, page: PhysicalPage) {
        self.with_frame(page, |frame| frame.fill(0));
    }
}
