//! # Page Table (leaf level)
//!
//! - [`PtEntry`]: a table entry (PTE). Every present entry maps exactly one
//!   4 KiB physical page.
//! - [`PageTable`]: a 4 KiB-aligned array of 1024 PTEs.
//!
//! ## Invariants & Notes
//!
//! - Freshly created tables are filled with [`PtEntry::absent_user`] so
//!   that a fault on a sibling page is still detected as missing.
//! - [`PtEntry::cleared_present`] drops only the present bit; the stale
//!   frame number remains in the slot, which keeps the entry inert but
//!   preserves forensic data after a page is freed.

use crate::PageEntryBits;
use crate::page_table::{ENTRY_COUNT, TableIndex};
use kernel_memory_addresses::PhysicalFrame;

/// A single page-table entry (PTE).
#[doc(alias = "PTE")]
#[repr(transparent)]
#[derive(Copy, Clone)]
pub struct PtEntry(PageEntryBits);

/// A page table: 1024 entries, 4 KiB-aligned — exactly one frame.
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PtEntry; ENTRY_COUNT],
}

impl PtEntry {
    /// Create a zero (non-present, no flags) entry.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(PageEntryBits::new())
    }

    /// The user-readable-but-not-present pattern for entries of a freshly
    /// created table.
    #[inline]
    #[must_use]
    pub const fn absent_user() -> Self {
        Self(PageEntryBits::new_absent_user())
    }

    /// Create a present leaf entry mapping `page`, forcing `present=1` and
    /// keeping bit 7 (PAT) clear.
    #[inline]
    #[must_use]
    pub const fn make_page(page: PhysicalFrame, flags: PageEntryBits) -> Self {
        Self(
            flags
                .with_large_page(false)
                .with_present(true)
                .with_frame(page),
        )
    }

    /// Return `true` if the entry is marked present.
    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.0.present()
    }

    /// If present, return the mapped physical page and the entry flags.
    #[inline]
    #[must_use]
    pub fn page(self) -> Option<(PhysicalFrame, PageEntryBits)> {
        if !self.is_present() {
            return None;
        }
        Some((self.0.frame(), self.0))
    }

    /// This entry with only the present bit cleared. Frame number and the
    /// remaining flags stay in place.
    #[inline]
    #[must_use]
    pub const fn cleared_present(self) -> Self {
        Self(self.0.with_present(false))
    }

    /// Expose the underlying bitfield for inspection.
    #[inline]
    #[must_use]
    pub const fn flags(self) -> PageEntryBits {
        self.0
    }

    /// Return the raw 32-bit value (flags + frame).
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0.into_bits()
    }

    /// Construct from a raw 32-bit value. No validation is performed.
    #[inline]
    #[must_use]
    pub const fn from_raw(v: u32) -> Self {
        Self(PageEntryBits::from_bits(v))
    }
}

impl PageTable {
    /// Create a fully zeroed table (all entries non-present).
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PtEntry::zero(); ENTRY_COUNT],
        }
    }

    /// Read the entry at `i`. Plain load; no TLB implications.
    #[inline]
    #[must_use]
    pub const fn get(&self, i: TableIndex) -> PtEntry {
        self.entries[i.as_usize()]
    }

    /// Write the entry at `i`.
    ///
    /// Changing a live mapping requires TLB maintenance afterwards; the
    /// caller decides when.
    #[inline]
    pub const fn set(&mut self, i: TableIndex, e: PtEntry) {
        self.entries[i.as_usize()] = e;
    }

    /// Fill every entry with the fresh-table pattern.
    pub fn reset_to_absent(&mut self) {
        self.entries = [PtEntry::absent_user(); ENTRY_COUNT];
    }
}
