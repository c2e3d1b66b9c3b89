//! # Address Space (directory-rooted)
//!
//! One [`AddressSpace`] per process context. Construction builds the parts
//! every space shares:
//!
//! - an **identity mapping** for the shared low region (kernel plus all
//!   process images present at boot), so that code, stacks, and frame-pool
//!   bookkeeping keep working the instant paging switches on;
//! - the **self-referential slot** (see [`recursive`](crate::recursive));
//! - writable-but-not-present placeholders in every other directory slot,
//!   so later faults on them are recognised as "missing table".
//!
//! Everything else materialises on demand through
//! [`Vmm::handle_fault`](crate::Vmm::handle_fault).
//!
//! Construction happens through a [`PhysMapper`]: the directory frame comes
//! from the kernel pool (inside the identity region), and the shared table
//! frames are written before the space can possibly be active, so physical
//! addressing is sound here. All *post*-activation edits go through the
//! recursive windows instead.

use crate::page_table::{
    DirectoryIndex, ENTRY_COUNT, PageDirectory, PageTable, PdEntry, PtEntry, TableIndex,
};
use crate::recursive::RECURSIVE_SLOT;
use crate::vmm::Vmm;
use crate::page_entry_bits::PageEntryBits;
use kernel_alloc::{FramePoolRegistry, PhysMapper};
use kernel_info::memory::BYTES_PER_TABLE;
use kernel_memory_addresses::PhysicalFrame;
use log::debug;

/// Handle to a single, concrete address space, rooted at one directory
/// frame.
pub struct AddressSpace {
    directory: PhysicalFrame,
}

impl AddressSpace {
    /// Construct a fresh address space.
    ///
    /// Allocates the directory from the kernel pool and one table per
    /// 4 MiB of shared region from the process pool, then identity-maps the
    /// shared region (linear address == physical address, supervisor,
    /// writable).
    ///
    /// # Panics
    /// Fatal when the pools cannot supply the required frames.
    pub fn new<P: PhysMapper>(vmm: &Vmm, frames: &mut FramePoolRegistry, phys: &P) -> Self {
        let directory_frame = frames.allocate(vmm.kernel_pool(), phys, 1);
        // SAFETY: the frame was allocated for this directory and is reached
        // through its physical address only until the space goes live.
        let directory: &mut PageDirectory = unsafe { phys.phys_to_mut(directory_frame.base()) };

        for slot in 0..ENTRY_COUNT {
            directory.set(DirectoryIndex::new(slot as u16), PdEntry::absent_rw());
        }

        let shared_tables = vmm.shared_size() / BYTES_PER_TABLE;
        for table_slot in 0..shared_tables {
            let table_frame = frames.allocate(vmm.process_pool(), phys, 1);
            // SAFETY: as above; the table frame is fresh and exclusively ours.
            let table: &mut PageTable = unsafe { phys.phys_to_mut(table_frame.base()) };
            for entry in 0..ENTRY_COUNT as u32 {
                let page = PhysicalFrame::from_number(table_slot * ENTRY_COUNT as u32 + entry);
                table.set(
                    TableIndex::new(entry as u16),
                    PtEntry::make_page(page, PageEntryBits::new_present_rw()),
                );
            }
            directory.set(
                DirectoryIndex::new(table_slot as u16),
                PdEntry::make_table(table_frame, PageEntryBits::new_present_rw()),
            );
        }

        directory.set(
            RECURSIVE_SLOT,
            PdEntry::make_table(directory_frame, PageEntryBits::new_present_rw()),
        );

        debug!(
            "address space constructed: directory frame {directory_frame}, {shared_tables} shared table(s)"
        );
        Self {
            directory: directory_frame,
        }
    }

    /// The frame holding this space's page directory.
    #[must_use]
    pub const fn directory(&self) -> PhysicalFrame {
        self.directory
    }
}
