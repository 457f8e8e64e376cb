use bitfield_struct::bitfield;
use kernel_info::memory::PTE_FIELD_BITS;

/// Raw bitfield view of a 64-bit page-table entry.
///
/// The entry has two meanings depending on which residency bit is set:
///
/// - `valid` set: the page is **resident**; the upper field holds the
///   physical page number of its frame.
/// - `paged_out` set: the page is **evicted**; the upper field holds the
///   backing-store offset of its contents.
/// - neither set: the page is **unmapped**.
///
/// The two residency bits are never set together. Everything in between
/// (`readable` .. `dirty`) is protection/status state that survives every
/// residency transition unchanged.
///
/// ### Bit layout
///
/// | Bits   | Name          | Meaning |
/// |--------|---------------|---------|
/// | 0      | `V`           | Resident; hardware walks this entry |
/// | 1      | `R`           | Readable |
/// | 2      | `W`           | Writable |
/// | 3      | `X`           | Executable |
/// | 4      | `U`           | User-mode accessible |
/// | 5      | `A`           | Accessed |
/// | 6      | `D`           | Dirty |
/// | 7      | `PG`          | Paged out to the backing store |
/// | 8–63   | `PPN`/offset  | 56-bit frame number or backing offset |
///
/// ### Example
/// ```rust
/// # use kernel_vmem::PageEntryBits;
/// let e = PageEntryBits::user_rw().with_valid(true);
/// assert!(e.valid());
/// assert!(e.writable());
/// assert!(!e.paged_out());
/// ```
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct PageEntryBits {
    /// Valid (V, bit 0).
    ///
    /// Set only while the page is backed by a physical frame. A hardware walk
    /// that finds this clear raises a page fault.
    pub valid: bool,

    /// Readable (R, bit 1).
    pub readable: bool,

    /// Writable (W, bit 2).
    pub writable: bool,

    /// Executable (X, bit 3).
    pub executable: bool,

    /// User (U, bit 4).
    ///
    /// Set to allow user-mode access.
    pub user: bool,

    /// Accessed (A, bit 5).
    pub accessed: bool,

    /// Dirty (D, bit 6).
    pub dirty: bool,

    /// Paged out (PG, bit 7), software-defined.
    ///
    /// Set only while the page's contents live in the backing store.
    pub paged_out: bool,

    /// Physical page number or backing-store offset (bits 8..=63).
    #[bits(56)]
    frame_or_offset: u64,
}

impl PageEntryBits {
    /// Bits 1..=6: everything that is neither a residency bit nor the field.
    pub const PROTECTION_MASK: u64 = 0b0111_1110;

    /// Largest value the frame/offset field can hold.
    pub const FIELD_MAX: u64 = (1 << PTE_FIELD_BITS) - 1;

    /// The protection/status bits only; residency bits and field cleared.
    #[inline]
    #[must_use]
    pub const fn protection(self) -> Self {
        Self::from_bits(self.into_bits() & Self::PROTECTION_MASK)
    }

    #[inline]
    #[must_use]
    pub const fn field(self) -> u64 {
        self.frame_or_offset()
    }

    #[inline]
    #[must_use]
    pub const fn with_field(self, value: u64) -> Self {
        self.with_frame_or_offset(value)
    }

    /// Readable + writable user data page.
    #[inline]
    #[must_use]
    pub const fn user_rw() -> Self {
        Self::new()
            .with_readable(true)
            .with_writable(true)
            .with_user(true)
    }

    /// Read-only user data page.
    #[inline]
    #[must_use]
    pub const fn user_ro() -> Self {
        Self::new().with_readable(true).with_user(true)
    }

    /// Read + execute user text page.
    #[inline]
    #[must_use]
    pub const fn user_rx() -> Self {
        Self::new()
            .with_readable(true)
            .with_executable(true)
            .with_user(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_is_56_bits_wide() {
        let e = PageEntryBits::new().with_field(PageEntryBits::FIELD_MAX);
        assert_eq!(e.field(), PageEntryBits::FIELD_MAX);
        assert_eq!(e.into_bits() & 0xff, 0, "field must not bleed into flags");
    }

    #[test]
    fn protection_drops_residency_and_field() {
        let e = PageEntryBits::user_rx()
            .with_valid(true)
            .with_dirty(true)
            .with_field(0x1234);
        let p = e.protection();
        assert!(!p.valid());
        assert!(!p.paged_out());
        assert_eq!(p.field(), 0);
        assert!(p.readable() && p.executable() && p.user() && p.dirty());
    }
}
