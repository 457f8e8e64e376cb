//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for raw memory addresses and 4 KiB page bases used
//! by the paging code.
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`VirtualAddress`] | Any byte address in a process's virtual address space. |
//! | [`VirtualPage`] | The page-aligned base of a virtual page. |
//! | [`PhysicalAddress`] | A byte address in physical memory. |
//! | [`PhysicalPage`] | The page-aligned base of a physical frame. |
//!
//! The wrappers are `#[repr(transparent)]` over `u64` and exist only so that
//! virtual and physical values, or page bases and arbitrary addresses, cannot
//! be mixed up at a call site.
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0x3123);
//! let page = va.page();
//! assert_eq!(page.base().as_u64(), 0x3000);
//! assert_eq!(va.page_offset(), 0x123);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod physical_address;
mod physical_page;
mod virtual_address;
mod virtual_page;

pub use physical_address::PhysicalAddress;
pub use physical_page::PhysicalPage;
pub use virtual_address::VirtualAddress;
pub use virtual_page::VirtualPage;

/// Page size as `u64`, for address arithmetic.
pub const PAGE_SIZE: u64 = kernel_info::memory::PAGE_SIZE as u64;

/// Mask selecting the in-page offset bits.
pub const PAGE_MASK: u64 = PAGE_SIZE - 1;

#[inline]
#[must_use]
pub(crate) const fn align_down(x: u64) -> u64 {
    x & !PAGE_MASK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_and_join_round_trip() {
        let va = VirtualAddress::new(0x0000_0040_0000_1abc);
        let page = va.page();
        assert_eq!(page.base().as_u64(), 0x0000_0040_0000_1000);
        assert_eq!(page.join(va.page_offset()), va);
    }

    #[test]
    fn physical_page_number_round_trip() {
        let pp = PhysicalPage::containing(PhysicalAddress::new(0x8020_0fff));
        assert_eq!(pp.base().as_u64(), 0x8020_0000);
        assert_eq!(PhysicalPage::from_number(pp.number()), pp);
    }

    #[test]
    fn page_arithmetic() {
        let p = VirtualPage::containing(VirtualAddress::new(0x2000));
        assert_eq!(p.next().base().as_u64(), 0x3000);
        assert_eq!(p.number(), 2);
    }
}
