//! # Virtual Memory Support
//!
//! Two-level x86 (IA-32) paging for a teaching kernel: a typed page
//! directory / page table layer, demand paging driven by the page-fault
//! handler, and per-window virtual-memory pools.
//!
//! ## x86 Virtual Address → Physical Address Walk
//!
//! Each 32-bit virtual address is divided into three fields:
//!
//! ```text
//! | 31‒22     | 21‒12 | 11‒0   |
//! | Directory | Table | Offset |
//! ```
//!
//! The CPU uses these fields as **indices** into two levels of page tables,
//! each level containing 1024 (2¹⁰) entries of 4 bytes (32 bits) each.
//!
//! ```text
//!  Directory  →  Table  →  Physical Page
//!   │             │
//!   │             └───► PTE (Page Table Entry) → maps one 4 KiB page
//!   └─────────────────► PDE (Page Directory Entry) → points at one table
//! ```
//!
//! One directory per address space, referenced by Control Register 3
//! ([CR3](https://wiki.osdev.org/CPU_Registers_x86#CR3)). The final
//! **Offset** field selects the byte inside the 4 KiB page, giving each
//! directory a reach of 1024 × 1024 × 4096 = 4 GiB.
//!
//! ## The self-referential directory slot
//!
//! Once paging is on, directory and table frames drawn from non-identity-
//! mapped memory can only be reached through the very translation they
//! define. Slot [`RECURSIVE_SLOT`](recursive::RECURSIVE_SLOT) of every
//! directory maps the directory frame back into the address space, which
//! turns "the table serving directory slot *d*" into a pure function of *d*
//! — see the [`recursive`] module for the arithmetic.
//!
//! ## Demand paging
//!
//! [`Vmm::handle_fault`] is the entry point the trap dispatcher routes page
//! faults into. Addresses are validated against the registered
//! [`VmPool`](vm_pool::VmPool) windows, then whatever part of the
//! directory/table chain is missing is allocated from the process frame
//! pool and the access retried. Every internal error is fatal: a kernel
//! cannot unwind a half-built mapping.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod address_space;
pub mod mmu;
pub mod page_entry_bits;
pub mod page_fault;
pub mod page_table;
pub mod recursive;
pub mod vm_pool;
pub mod vmm;

pub use address_space::AddressSpace;
pub use mmu::Mmu;
pub use page_entry_bits::PageEntryBits;
pub use page_fault::PageFaultCode;
pub use page_table::{DirectoryIndex, PageDirectory, PageTable, PdEntry, PtEntry, TableIndex};
pub use vm_pool::{VmPool, VmRegion, VmWindow};
pub use vmm::{FaultDisposition, Vmm};

use kernel_memory_addresses::VirtualAddress;
use thiserror::Error;

/// Violations of the virtual-memory contract. Like the frame-pool errors,
/// these exist for their diagnostic text; every detection site halts.
#[derive(Debug, Error)]
pub enum VmemError {
    #[error("access to unallocated virtual address {0}")]
    IllegitimateAddress(VirtualAddress),
    #[error("page-table window at {0} is unreachable")]
    WindowUnmapped(VirtualAddress),
    #[error("refault at {0} after servicing")]
    Refault(VirtualAddress),
    #[error("no address space has been loaded")]
    NoAddressSpace,
    #[error("shared region size {0:#x} is not table-granular or collides with the recursive slot")]
    BadSharedRegion(u32),
    #[error("virtual memory pool registry is full")]
    TooManyPools,
    #[error("pool window at {0} is not page-aligned")]
    MisalignedWindow(VirtualAddress),
    #[error("pool window of {0} bytes cannot hold its own region directory")]
    WindowTooSmall(u32),
    #[error("region directory is full")]
    DirectoryFull,
    #[error("zero-length region request")]
    ZeroRegion,
    #[error("pool exhausted: requested {requested} bytes, {available} available")]
    PoolExhausted { requested: u32, available: u32 },
    #[error("no contiguous window space for {0} bytes")]
    WindowFragmented(u32),
    #[error("no region starts at {0}")]
    NoSuchRegion(VirtualAddress),
    #[error("page at {0} is not mapped")]
    PageNotMapped(VirtualAddress),
}

/// Log the violation, then halt. No caller gets to observe the error value.
#[cold]
pub(crate) fn fatal(err: VmemError) -> ! {
    log::error!("vmem: {err}");
    panic!("vmem: {err}");
}
