//! # Page-Table Entry Codec
//!
//! A leaf entry is a tagged union packed into one machine word:
//!
//! ```text
//!   Resident { frame, flags }   V=1 PG=0  field = physical page number
//!   Evicted  { offset, flags }  V=0 PG=1  field = backing-store offset
//!   Unmapped                    V=0 PG=0
//! ```
//!
//! All bit manipulation lives here. Callers build entries with
//! [`PtEntry::make_resident`] / [`PtEntry::make_evicted`] and inspect them with
//! [`PtEntry::decode`], so the "exactly one tag" invariant can only be broken
//! by constructing an entry from raw bits.

use crate::PageEntryBits;
use core::fmt;
use kernel_memory_addresses::PhysicalPage;

/// Opaque backing-store offset identifying one evicted page's slot.
///
/// Only meaningful to the backing store that issued it, and only for the
/// lifetime of the owning process.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SwapOffset(u64);

impl SwapOffset {
    /// Largest offset that can be encoded in an entry.
    pub const MAX: u64 = PageEntryBits::FIELD_MAX;

    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Whether this offset fits the entry's 56-bit field.
    #[inline]
    #[must_use]
    pub const fn fits_in_entry(self) -> bool {
        self.0 <= Self::MAX
    }
}

impl fmt::Debug for SwapOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SwapOffset({})", self.0)
    }
}

impl fmt::Display for SwapOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decoded view of a [`PtEntry`].
///
/// `flags` only ever contains protection/status bits (see
/// [`PageEntryBits::protection`]).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PtEntryKind {
    Resident {
        frame: PhysicalPage,
        flags: PageEntryBits,
    },
    Evicted {
        offset: SwapOffset,
        flags: PageEntryBits,
    },
    Unmapped,
}

/// A single leaf page-table entry.
#[doc(alias = "PTE")]
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct PtEntry(PageEntryBits);

impl PtEntry {
    /// Create a zero (unmapped) entry.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(PageEntryBits::new())
    }

    /// Encode a resident entry.
    ///
    /// Takes the protection bits of `flags`, sets `V`, clears `PG`, and stores
    /// the frame number.
    #[inline]
    #[must_use]
    pub fn make_resident(flags: PageEntryBits, frame: PhysicalPage) -> Self {
        debug_assert!(frame.number() <= PageEntryBits::FIELD_MAX);
        Self(
            flags
                .protection()
                .with_valid(true)
                .with_paged_out(false)
                .with_field(frame.number()),
        )
    }

    /// Encode an evicted entry.
    ///
    /// Takes the protection bits of `flags`, clears `V`, sets `PG`, and stores
    /// the backing-store offset.
    ///
    /// # Panics
    /// If `offset` does not fit the 56-bit field. Backing stores never hand out
    /// such offsets; this is a programming error.
    #[inline]
    #[must_use]
    pub fn make_evicted(flags: PageEntryBits, offset: SwapOffset) -> Self {
        assert!(
            offset.fits_in_entry(),
            "swap offset {offset} does not fit a page-table entry"
        );
        Self(
            flags
                .protection()
                .with_valid(false)
                .with_paged_out(true)
                .with_field(offset.as_u64()),
        )
    }

    /// Decode the entry into its tagged form.
    #[inline]
    #[must_use]
    pub fn decode(self) -> PtEntryKind {
        let bits = self.0;
        debug_assert!(self.is_well_formed(), "V and PG both set: {bits:?}");
        if bits.valid() {
            PtEntryKind::Resident {
                frame: PhysicalPage::from_number(bits.field()),
                flags: bits.protection(),
            }
        } else if bits.paged_out() {
            PtEntryKind::Evicted {
                offset: SwapOffset::new(bits.field()),
                flags: bits.protection(),
            }
        } else {
            PtEntryKind::Unmapped
        }
    }

    /// `V` and `PG` are never both set.
    #[inline]
    #[must_use]
    pub const fn is_well_formed(self) -> bool {
        !(self.0.valid() && self.0.paged_out())
    }

    #[inline]
    #[must_use]
    pub const fn is_resident(self) -> bool {
        self.0.valid()
    }

    #[inline]
    #[must_use]
    pub const fn is_evicted(self) -> bool {
        !self.0.valid() && self.0.paged_out()
    }

    #[inline]
    #[must_use]
    pub const fn is_unmapped(self) -> bool {
        !self.0.valid() && !self.0.paged_out()
    }

    /// Protection/status bits of this entry.
    #[inline]
    #[must_use]
    pub const fn flags(self) -> PageEntryBits {
        self.0.protection()
    }

    /// Expose the underlying bitfield.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> PageEntryBits {
        self.0
    }

    /// Return the raw 64-bit value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0.into_bits()
    }

    /// Construct from a raw 64-bit value.
    ///
    /// No validation is performed.
    #[inline]
    #[must_use]
    pub const fn from_raw(v: u64) -> Self {
        Self(PageEntryBits::from_bits(v))
    }
}

impl Default for PtEntry {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Debug for PtEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_well_formed() {
            fmt::Debug::fmt(&self.decode(), f)
        } else {
            write!(f, "PtEntry(malformed {:#018x})", self.raw())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_memory_addresses::PhysicalAddress;

    fn frame() -> PhysicalPage {
        PhysicalPage::containing(PhysicalAddress::new(0x8123_4000))
    }

    #[test]
    fn zero_is_unmapped() {
        assert_eq!(PtEntry::zero().decode(), PtEntryKind::Unmapped);
        assert!(PtEntry::zero().is_unmapped());
    }

    #[test]
    fn resident_encoding() {
        let e = PtEntry::make_resident(PageEntryBits::user_rw(), frame());
        assert!(e.bits().valid());
        assert!(!e.bits().paged_out());
        match e.decode() {
            PtEntryKind::Resident { frame: f, flags } => {
                assert_eq!(f, frame());
                assert_eq!(flags, PageEntryBits::user_rw());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn evicted_encoding() {
        let e = PtEntry::make_evicted(PageEntryBits::user_ro(), SwapOffset::new(17));
        assert!(!e.bits().valid());
        assert!(e.bits().paged_out());
        assert_eq!(
            e.decode(),
            PtEntryKind::Evicted {
                offset: SwapOffset::new(17),
                flags: PageEntryBits::user_ro(),
            }
        );
    }

    #[test]
    fn transitions_preserve_protection() {
        let flags = PageEntryBits::user_rx().with_accessed(true).with_dirty(true);
        let resident = PtEntry::make_resident(flags, frame());
        let evicted = PtEntry::make_evicted(resident.flags(), SwapOffset::new(3));
        let back = PtEntry::make_resident(evicted.flags(), frame());
        assert_eq!(evicted.flags(), flags);
        assert_eq!(back, resident);
    }

    #[test]
    fn residency_bits_in_flags_are_ignored() {
        let noisy = PageEntryBits::user_rw().with_valid(true).with_paged_out(true);
        let e = PtEntry::make_evicted(noisy, SwapOffset::new(1));
        assert!(e.is_well_formed());
        assert!(e.is_evicted());
    }

    #[test]
    fn largest_offset_round_trips() {
        let max = SwapOffset::new(SwapOffset::MAX);
        let e = PtEntry::make_evicted(PageEntryBits::user_rw(), max);
        assert!(matches!(e.decode(), PtEntryKind::Evicted { offset, .. } if offset == max));
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn oversized_offset_is_rejected() {
        let _ = PtEntry::make_evicted(PageEntryBits::user_rw(), SwapOffset::new(1 << 56));
    }

    #[test]
    fn malformed_entry_is_detected() {
        let e = PtEntry::from_raw(0b1000_0001);
        assert!(!e.is_well_formed());
    }
}
