//! # Self-Referential Directory Slot
//!
//! Once paging is enabled, the directory and its tables live in physical
//! frames that are generally *not* identity-mapped — the structure is only
//! addressable through the very mapping it defines. Instead of maintaining
//! a separate linear-to-physical lookup, one directory slot
//! ([`RECURSIVE_SLOT`]) maps the **directory frame itself** as if it were a
//! page table.
//!
//! The walk then folds back onto the structure:
//!
//! ```text
//! VA = | 1023 | 1023 | offset |   directory[1023] → directory (as "table")
//!                                 table[1023]     → directory (as "page")
//!                                 ⇒ the window reads the directory frame
//!
//! VA = | 1023 |  d   | offset |   directory[1023] → directory (as "table")
//!                                 table[d] = directory[d] → table frame
//!                                 ⇒ the window reads the table serving slot d
//! ```
//!
//! So "the linear address of the table serving directory slot `d`" is a
//! pure function of `d`, and the fault handler edits paging structures
//! exclusively through these windows.
//!
//! The slot costs 4 MiB of linear address space (`0xFFC0_0000..`), which is
//! why the shared region must stop short of it.

use crate::page_table::DirectoryIndex;
use kernel_memory_addresses::VirtualAddress;

/// The directory slot reserved for the self-referential mapping.
pub const RECURSIVE_SLOT: DirectoryIndex = DirectoryIndex::new(kernel_info::memory::RECURSIVE_SLOT);

/// Linear address at which the page directory itself is visible.
///
/// ```rust
/// # use kernel_vmem::recursive::directory_window;
/// assert_eq!(directory_window().as_u32(), 0xFFFF_F000);
/// ```
#[inline]
#[must_use]
pub const fn directory_window() -> VirtualAddress {
    VirtualAddress::new((RECURSIVE_SLOT.as_u32() << 22) | (RECURSIVE_SLOT.as_u32() << 12))
}

/// Linear address at which the page table serving directory slot `slot` is
/// visible.
///
/// The table need not exist: the address only resolves once the directory
/// entry for `slot` is present, which is exactly the order the fault
/// handler creates things in.
///
/// ```rust
/// # use kernel_vmem::page_table::DirectoryIndex;
/// # use kernel_vmem::recursive::table_window;
/// assert_eq!(table_window(DirectoryIndex::new(0)).as_u32(), 0xFFC0_0000);
/// assert_eq!(table_window(DirectoryIndex::new(5)).as_u32(), 0xFFC0_5000);
/// ```
#[inline]
#[must_use]
pub const fn table_window(slot: DirectoryIndex) -> VirtualAddress {
    VirtualAddress::new((RECURSIVE_SLOT.as_u32() << 22) | (slot.as_u32() << 12))
}
