//! # Virtual-Memory Pools
//!
//! A [`VmPool`] tracks sub-allocations inside one reserved window of a
//! process's linear address space and cooperates with the fault handler to
//! implement demand paging: allocating a region maps nothing — the pages
//! materialise on first touch.
//!
//! The pool bootstraps its own bookkeeping: the **region directory** (an
//! array of base/length pairs) lives inside the pool's first page, and
//! region 0 is that directory page itself. Writing the directory therefore
//! goes through the demand-paged access path like any other pool memory.

use crate::vmm::Vmm;
use crate::{Mmu, VmemError, fatal};
use kernel_alloc::{FramePoolRegistry, PhysMapper, PoolHandle};
use kernel_memory_addresses::{PAGE_SIZE, VirtualAddress, VirtualPage};
use log::{debug, info};

/// Number of region slots in a pool's directory page.
pub const REGION_CAPACITY: usize = (PAGE_SIZE as usize) / size_of::<VmRegion>();

/// One allocated region: base address and page-rounded length.
#[repr(C)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VmRegion {
    pub base: VirtualAddress,
    pub length: u32,
}

impl VmRegion {
    /// One-past-the-end of the region, in 64-bit space so a region touching
    /// the top of the address space does not wrap.
    const fn end(self) -> u64 {
        self.base.as_u32() as u64 + self.length as u64
    }
}

/// The directory page: a full page of region slots.
#[repr(C)]
pub(crate) struct RegionDirectory {
    regions: [VmRegion; REGION_CAPACITY],
}

const _: () = {
    assert!(size_of::<VmRegion>() == 8);
    assert!(size_of::<RegionDirectory>() == PAGE_SIZE as usize);
};

/// The `[base, base + size)` window a pool claims, as registered with the
/// [`Vmm`] for fault validation.
///
/// The upper bound is **exclusive**: the first byte past the window is not
/// legitimate.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VmWindow {
    base: VirtualAddress,
    size: u32,
}

impl VmWindow {
    #[must_use]
    pub const fn new(base: VirtualAddress, size: u32) -> Self {
        Self { base, size }
    }

    #[must_use]
    pub const fn base(self) -> VirtualAddress {
        self.base
    }

    #[must_use]
    pub const fn size(self) -> u32 {
        self.size
    }

    /// Window membership: `base <= addr < base + size`.
    #[must_use]
    pub const fn contains(self, addr: VirtualAddress) -> bool {
        addr.as_u32() >= self.base.as_u32()
            && (addr.as_u32() as u64) < self.base.as_u32() as u64 + self.size as u64
    }
}

/// Tracker for one reserved virtual-address window.
///
/// All mutating operations need the [`Vmm`], the frame registry, and the
/// [`Mmu`]: the region directory is demand-paged pool memory, and releases
/// feed frames back through the registry.
pub struct VmPool {
    window: VmWindow,
    frame_pool: PoolHandle,
    region_count: usize,
    available: u32,
}

impl VmPool {
    /// Reserve the window `[base, base + size)`, register it for fault
    /// validation, and set up the region directory in the window's first
    /// page (region 0, one page, never released).
    ///
    /// # Panics
    /// Fatal when `base` is not page-aligned, `size` cannot hold the
    /// directory page, or the window registry is full.
    pub fn new<M: Mmu + PhysMapper>(
        vmm: &mut Vmm,
        frames: &mut FramePoolRegistry,
        mmu: &mut M,
        base: VirtualAddress,
        size: u32,
        frame_pool: PoolHandle,
    ) -> Self {
        if !base.is_page_aligned() {
            fatal(VmemError::MisalignedWindow(base));
        }
        if size < PAGE_SIZE {
            fatal(VmemError::WindowTooSmall(size));
        }

        let window = VmWindow::new(base, size);
        // Register first: the very next line faults on the directory page,
        // and the handler must already recognise the address as ours.
        vmm.register_pool(window);

        let directory = vmm.demand_mut::<RegionDirectory, M>(frames, mmu, base);
        directory.regions[0] = VmRegion {
            base,
            length: PAGE_SIZE,
        };

        info!("VM pool ready: window {base}+{size:#x}, backed by {frame_pool:?}");
        Self {
            window,
            frame_pool,
            region_count: 1,
            available: size - PAGE_SIZE,
        }
    }

    /// Base address of the pool window.
    #[must_use]
    pub const fn base(&self) -> VirtualAddress {
        self.window.base()
    }

    /// Declared size of the pool window in bytes.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.window.size()
    }

    /// Bytes still available for allocation.
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.available
    }

    /// Number of regions currently in the directory, region 0 included.
    #[must_use]
    pub const fn region_count(&self) -> usize {
        self.region_count
    }

    /// The frame pool backing this window's pages.
    #[must_use]
    pub const fn frame_pool(&self) -> PoolHandle {
        self.frame_pool
    }

    /// Whether the fault handler should treat `addr` as legitimately
    /// allocated memory of this pool. Exclusive upper bound.
    #[must_use]
    pub const fn is_legitimate(&self, addr: VirtualAddress) -> bool {
        self.window.contains(addr)
    }

    /// Allocate `size` bytes of linear address space, rounded up to whole
    /// pages. Nothing is mapped yet; pages fault in on first touch.
    ///
    /// The region is placed in the first address gap of the directory that
    /// fits it (reusing released space), or after the highest-addressed
    /// region otherwise; the directory stays address-ordered and gap-free.
    /// Returns the region's base address.
    ///
    /// # Panics
    /// Fatal when `size` is zero, exceeds the remaining space, or no
    /// contiguous stretch of the window can hold it.
    pub fn allocate<M: Mmu + PhysMapper>(
        &mut self,
        vmm: &mut Vmm,
        frames: &mut FramePoolRegistry,
        mmu: &mut M,
        size: u32,
    ) -> VirtualAddress {
        if size == 0 {
            fatal(VmemError::ZeroRegion);
        }
        let length = match size.div_ceil(PAGE_SIZE).checked_mul(PAGE_SIZE) {
            Some(length) if length <= self.available => length,
            _ => fatal(VmemError::PoolExhausted {
                requested: size,
                available: self.available,
            }),
        };
        if self.region_count == REGION_CAPACITY {
            fatal(VmemError::DirectoryFull);
        }

        let directory = vmm.demand_mut::<RegionDirectory, M>(frames, mmu, self.window.base());
        let window_end = self.window.base().as_u32() as u64 + u64::from(self.window.size());

        // First gap that fits, scanning the address-ordered directory; the
        // stretch after the last region counts as the final gap.
        let mut placement = None;
        for slot in 1..=self.region_count {
            let gap_start = directory.regions[slot - 1].end();
            let gap_end = if slot < self.region_count {
                u64::from(directory.regions[slot].base.as_u32())
            } else {
                window_end
            };
            if gap_end - gap_start >= u64::from(length) {
                placement = Some((slot, gap_start));
                break;
            }
        }
        let Some((slot, gap_start)) = placement else {
            fatal(VmemError::WindowFragmented(length));
        };

        // Shift later slots up to keep the directory ordered and gap-free.
        for moving in (slot..self.region_count).rev() {
            directory.regions[moving + 1] = directory.regions[moving];
        }
        let base = VirtualAddress::new(gap_start as u32);
        directory.regions[slot] = VmRegion { base, length };
        self.region_count += 1;
        self.available -= length;

        debug!("allocated region {base}+{length:#x}");
        base
    }

    /// Release the region whose base is exactly `start`: free every one of
    /// its pages that was actually touched, close the directory gap by
    /// shifting later slots down, and return the length to the available
    /// space.
    ///
    /// Only the bookkeeping compacts — released linear addresses stay where
    /// they were, which is the nature of demand-paged (sparse) address
    /// space.
    ///
    /// # Panics
    /// Fatal when no region starts at `start`.
    pub fn release<M: Mmu + PhysMapper>(
        &mut self,
        vmm: &mut Vmm,
        frames: &mut FramePoolRegistry,
        mmu: &mut M,
        start: VirtualAddress,
    ) {
        let directory = vmm.demand_mut::<RegionDirectory, M>(frames, mmu, self.window.base());

        let Some(slot) = (1..self.region_count).find(|&i| directory.regions[i].base == start)
        else {
            fatal(VmemError::NoSuchRegion(start));
        };
        let region = directory.regions[slot];

        // Untouched pages were never mapped; only the faulted-in ones hold
        // frames to give back.
        let pages = region.length / PAGE_SIZE;
        let first_page = VirtualPage::from_base(region.base);
        for index in 0..pages {
            let page = first_page + index;
            if vmm.is_mapped(mmu, page) {
                vmm.free_page(frames, mmu, page);
            }
        }

        for moving in slot..self.region_count - 1 {
            directory.regions[moving] = directory.regions[moving + 1];
        }
        self.region_count -= 1;
        self.available += region.length;

        debug!("released region {start}+{:#x}", region.length);
    }

    /// Copy of the directory entry at `slot` (0 is the directory page).
    /// Intended for inspection and tests.
    ///
    /// # Panics
    /// Panics when `slot` is out of range.
    pub fn region<M: Mmu + PhysMapper>(
        &self,
        vmm: &mut Vmm,
        frames: &mut FramePoolRegistry,
        mmu: &mut M,
        slot: usize,
    ) -> VmRegion {
        assert!(slot < self.region_count, "region slot out of range");
        let directory = vmm.demand_mut::<RegionDirectory, M>(frames, mmu, self.window.base());
        directory.regions[slot]
    }
}
