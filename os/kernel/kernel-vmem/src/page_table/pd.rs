//! # Page Directory (root level)
//!
//! - [`PdEntry`]: a directory entry (PDE). A present entry points at one
//!   page table; `PS` stays 0 because this core maps 4 KiB pages only.
//! - [`PageDirectory`]: a 4 KiB-aligned array of 1024 PDEs.
//!
//! ## Invariants & Notes
//!
//! - Entries beyond the identity-mapped shared region start out
//!   writable-but-not-present so a later fault on them reads as "missing
//!   table", not as a protection violation.
//! - One slot is reserved for the self-referential mapping; see
//!   [`recursive`](crate::recursive).

use crate::PageEntryBits;
use crate::page_table::{DirectoryIndex, ENTRY_COUNT};
use kernel_memory_addresses::PhysicalFrame;

/// A single page-directory entry (PDE).
#[doc(alias = "PDE")]
#[repr(transparent)]
#[derive(Copy, Clone)]
pub struct PdEntry(PageEntryBits);

/// The page directory: 1024 entries, 4 KiB-aligned — exactly one frame.
#[repr(C, align(4096))]
pub struct PageDirectory {
    entries: [PdEntry; ENTRY_COUNT],
}

impl PdEntry {
    /// Create a zero (non-present, no flags) entry.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(PageEntryBits::new())
    }

    /// The writable-but-not-present placeholder installed in every slot
    /// beyond the shared region at construction time.
    #[inline]
    #[must_use]
    pub const fn absent_rw() -> Self {
        Self(PageEntryBits::new_absent_rw())
    }

    /// Create a present entry pointing at `table`, forcing `present=1` and
    /// `PS=0`.
    #[inline]
    #[must_use]
    pub const fn make_table(table: PhysicalFrame, flags: PageEntryBits) -> Self {
        Self(
            flags
                .with_large_page(false)
                .with_present(true)
                .with_frame(table),
        )
    }

    /// Return `true` if the entry is marked present.
    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.0.present()
    }

    /// If present, return the referenced table frame and the entry flags.
    #[inline]
    #[must_use]
    pub fn table(self) -> Option<(PhysicalFrame, PageEntryBits)> {
        if !self.is_present() {
            return None;
        }
        Some((self.0.frame(), self.0))
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

impl PageDirectory {
    /// Create a fully zeroed directory (all entries non-present).
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PdEntry::zero(); ENTRY_COUNT],
        }
    }

    /// Read the entry at `i`. Plain load; no TLB implications.
    #[inline]
    #[must_use]
    pub const fn get(&self, i: DirectoryIndex) -> PdEntry {
        self.entries[i.as_usize()]
    }

    /// Write the entry at `i`.
    ///
    /// Changing a live directory requires TLB maintenance afterwards; the
    /// caller decides when.
    #[inline]
    pub const fn set(&mut self, i: DirectoryIndex, e: PdEntry) {
        self.entries[i.as_usize()] = e;
    }
}
