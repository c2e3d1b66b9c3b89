//! # Kernel Virtual-Memory Context
//!
//! [`Vmm`] is the single top-level object holding the process-wide paging
//! state: which pools feed the translation structure, the shared-region
//! size, the currently loaded address space, the paging-enabled flag, and
//! the registered [`VmWindow`]s the fault handler validates against. A
//! kernel without ownership rules would keep all of this in globals; here
//! it travels as one explicit context.
//!
//! The fault handler and the page-free path edit paging structures
//! exclusively through the recursive windows, so they require a loaded,
//! constructed address space and enabled paging.

use crate::page_table::{PageDirectory, PageTable, PdEntry, PtEntry, split_indices};
use crate::page_entry_bits::PageEntryBits;
use crate::page_fault::PageFaultCode;
use crate::vm_pool::VmWindow;
use crate::{AddressSpace, Mmu, VmemError, fatal, recursive};
use kernel_alloc::{FramePoolRegistry, PhysMapper, PoolHandle};
use kernel_info::memory::{BYTES_PER_TABLE, RECURSIVE_SLOT};
use kernel_memory_addresses::{VirtualAddress, VirtualPage};
use log::{debug, info, warn};

/// Maximum number of virtual-memory pool windows that can be registered.
pub const MAX_VM_POOLS: usize = 16;

/// What [`Vmm::handle_fault`] did with a fault.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[must_use]
pub enum FaultDisposition {
    /// The missing mapping was created; the faulting access can restart.
    Serviced,
    /// The page was present — a protection violation. This core does not
    /// service those; the trap dispatcher decides what happens next.
    ProtectionViolation,
}

/// Process-wide virtual-memory state. Created exactly once, before any
/// [`AddressSpace`] is constructed.
pub struct Vmm {
    kernel_pool: PoolHandle,
    process_pool: PoolHandle,
    shared_size: u32,
    current: Option<AddressSpaceRoot>,
    paging_enabled: bool,
    windows: [Option<VmWindow>; MAX_VM_POOLS],
    window_count: usize,
}

/// Directory frame of the loaded space, kept as plain data so the context
/// does not borrow the [`AddressSpace`] object itself.
type AddressSpaceRoot = kernel_memory_addresses::PhysicalFrame;

impl Vmm {
    /// One-time paging configuration: which pool supplies frames for
    /// paging-structure metadata (`kernel_pool`), which one backs
    /// demand-paged data (`process_pool`), and how large the
    /// identity-mapped shared region is.
    ///
    /// # Panics
    /// Fatal when `shared_size` is zero, not table-granular, or so large it
    /// would collide with the recursive slot.
    pub fn new(kernel_pool: PoolHandle, process_pool: PoolHandle, shared_size: u32) -> Self {
        if shared_size == 0
            || shared_size % BYTES_PER_TABLE != 0
            || shared_size / BYTES_PER_TABLE > u32::from(RECURSIVE_SLOT)
        {
            fatal(VmemError::BadSharedRegion(shared_size));
        }
        info!(
            "paging configured: {} MiB shared region",
            shared_size / (1024 * 1024)
        );
        Self {
            kernel_pool,
            process_pool,
            shared_size,
            current: None,
            paging_enabled: false,
            windows: [None; MAX_VM_POOLS],
            window_count: 0,
        }
    }

    /// Pool supplying paging-structure metadata frames.
    #[must_use]
    pub const fn kernel_pool(&self) -> PoolHandle {
        self.kernel_pool
    }

    /// Pool backing demand-paged data (and the shared tables).
    #[must_use]
    pub const fn process_pool(&self) -> PoolHandle {
        self.process_pool
    }

    /// Size of the identity-mapped shared region in bytes.
    #[must_use]
    pub const fn shared_size(&self) -> u32 {
        self.shared_size
    }

    /// Directory frame of the currently loaded space, if any.
    #[must_use]
    pub const fn current(&self) -> Option<AddressSpaceRoot> {
        self.current
    }

    #[must_use]
    pub const fn is_paging_enabled(&self) -> bool {
        self.paging_enabled
    }

    /// Install `space` as the hardware-active translation: write its
    /// directory base into CR3 and record it as current.
    pub fn load<M: Mmu>(&mut self, mmu: &mut M, space: &AddressSpace) {
        let root = space.directory();
        mmu.write_cr3(kernel_registers::Cr3::from_directory(root, false, false));
        self.current = Some(root);
        debug!("loaded address space with directory frame {root}");
    }

    /// Set the global paging-enable bit. Irreversible: this core offers no
    /// way back to untranslated addressing.
    ///
    /// # Panics
    /// Fatal when no address space has been loaded — enabling translation
    /// with a stale CR3 would be instant memory corruption.
    pub fn enable_paging<M: Mmu>(&mut self, mmu: &mut M) {
        if self.current.is_none() {
            fatal(VmemError::NoAddressSpace);
        }
        let cr0 = mmu.read_cr0().with_pg_paging(true);
        mmu.write_cr0(cr0);
        self.paging_enabled = true;
        info!("paging enabled");
    }

    /// Append a pool window to the registry the fault handler consults.
    /// Insertion order is preserved.
    ///
    /// # Panics
    /// Fatal when the registry is full.
    pub fn register_pool(&mut self, window: VmWindow) {
        if self.window_count == MAX_VM_POOLS {
            fatal(VmemError::TooManyPools);
        }
        self.windows[self.window_count] = Some(window);
        self.window_count += 1;
        debug!("registered VM pool window {window:?}");
    }

    /// Entry point for page faults routed in by the trap dispatcher.
    ///
    /// Protection violations (present bit set in `code`) are not serviced
    /// here and are reported back. For a missing mapping the handler:
    ///
    /// 1. validates the faulting address against the registered pool
    ///    windows (pools registered but none claiming the address is
    ///    fatal);
    /// 2. creates the page table for the address's directory slot if it is
    ///    missing, initialising every entry to the not-present pattern so
    ///    sibling faults stay detectable;
    /// 3. installs a fresh data frame, present and writable.
    ///
    /// Afterwards the same address cannot fault again — the property the
    /// whole demand-paging scheme rests on.
    ///
    /// # Panics
    /// Fatal when the address belongs to no registered window, or when the
    /// process pool cannot supply frames.
    pub fn handle_fault<M: Mmu + PhysMapper>(
        &mut self,
        frames: &mut FramePoolRegistry,
        mmu: &mut M,
        code: PageFaultCode,
    ) -> FaultDisposition {
        let va = mmu.read_cr2().fault_address();
        if code.present() {
            warn!("page fault at {va} not serviced: {}", code.explain());
            return FaultDisposition::ProtectionViolation;
        }

        if self.window_count > 0 && !self.windows().any(|w| w.contains(va)) {
            fatal(VmemError::IllegitimateAddress(va));
        }

        let (dir_slot, table_slot) = split_indices(va);
        let directory = Self::window_mut::<PageDirectory, M>(mmu, recursive::directory_window());
        if !directory.get(dir_slot).is_present() {
            let table_frame = frames.allocate(self.process_pool, mmu, 1);
            directory.set(
                dir_slot,
                PdEntry::make_table(table_frame, PageEntryBits::new_present_rw()),
            );
            // The table is reachable through its window now that the
            // directory entry is present; scrub whatever the frame held.
            let table = Self::window_mut::<PageTable, M>(mmu, recursive::table_window(dir_slot));
            table.reset_to_absent();
            debug!("installed page table (frame {table_frame}) for directory slot {dir_slot:?}");
        }

        let page_frame = frames.allocate(self.process_pool, mmu, 1);
        let table = Self::window_mut::<PageTable, M>(mmu, recursive::table_window(dir_slot));
        table.set(
            table_slot,
            PtEntry::make_page(page_frame, PageEntryBits::new_present_rw()),
        );
        debug!("demand-paged {va}: frame {page_frame}");
        FaultDisposition::Serviced
    }

    /// Tear down the mapping of one page: release the backing frame to its
    /// pool, clear the present bit (the stale frame number stays in the
    /// slot), and reload CR3 to flush cached translations.
    ///
    /// # Panics
    /// Fatal when the page is not mapped — freeing it twice would corrupt
    /// the frame pool.
    pub fn free_page<M: Mmu + PhysMapper>(
        &mut self,
        frames: &mut FramePoolRegistry,
        mmu: &mut M,
        page: VirtualPage,
    ) {
        let va = page.base();
        let (dir_slot, table_slot) = split_indices(va);
        let directory = Self::window_mut::<PageDirectory, M>(mmu, recursive::directory_window());
        if !directory.get(dir_slot).is_present() {
            fatal(VmemError::PageNotMapped(va));
        }
        let table = Self::window_mut::<PageTable, M>(mmu, recursive::table_window(dir_slot));
        let entry = table.get(table_slot);
        let Some((frame, _)) = entry.page() else {
            fatal(VmemError::PageNotMapped(va));
        };
        frames.release(mmu, frame);
        table.set(table_slot, entry.cleared_present());
        // Coarse invalidation: a CR3 reload flushes the whole TLB.
        mmu.write_cr3(mmu.read_cr3());
        debug!("freed page {va} (frame {frame})");
    }

    /// Whether `page` currently has a present mapping, judged through the
    /// recursive windows of the loaded space.
    pub fn is_mapped<M: Mmu>(&self, mmu: &mut M, page: VirtualPage) -> bool {
        let (dir_slot, table_slot) = split_indices(page.base());
        let directory = Self::window_mut::<PageDirectory, M>(mmu, recursive::directory_window());
        if !directory.get(dir_slot).is_present() {
            return false;
        }
        let table = Self::window_mut::<PageTable, M>(mmu, recursive::table_window(dir_slot));
        table.get(table_slot).is_present()
    }

    /// Resolve `va` for an internal access, demand-paging it on a miss the
    /// way the hardware's trap-and-restart would.
    ///
    /// Used by the pools for their self-hosted region directories; the
    /// recursive windows themselves never take this path, which is what
    /// keeps fault handling free of fault recursion.
    pub(crate) fn demand_mut<'a, T, M: Mmu + PhysMapper>(
        &mut self,
        frames: &mut FramePoolRegistry,
        mmu: &mut M,
        va: VirtualAddress,
    ) -> &'a mut T {
        // SAFETY: callers hand in page-aligned addresses inside windows
        // they own, with `T` no larger than one page.
        match unsafe { mmu.virt_to_mut::<T>(va) } {
            Ok(slot) => return slot,
            Err(code) => {
                let _ = self.handle_fault(frames, mmu, code);
            }
        }
        // The instruction restart: a second miss means the handler failed
        // its no-refault guarantee.
        // SAFETY: as above.
        match unsafe { mmu.virt_to_mut::<T>(va) } {
            Ok(slot) => slot,
            Err(_) => fatal(VmemError::Refault(va)),
        }
    }

    fn windows(&self) -> impl Iterator<Item = &VmWindow> {
        self.windows[..self.window_count].iter().flatten()
    }

    /// Access a paging-structure window. The recursive slot is installed at
    /// construction, so a miss here is a kernel bug, not a demand-paging
    /// event.
    fn window_mut<'a, T, M: Mmu>(mmu: &mut M, va: VirtualAddress) -> &'a mut T {
        // SAFETY: `va` is one of the synthetic window addresses; the frame
        // behind it holds a paging structure of type `T`.
        match unsafe { mmu.virt_to_mut::<T>(va) } {
            Ok(slot) => slot,
            Err(_) => fatal(VmemError::WindowUnmapped(va)),
        }
    }
}
