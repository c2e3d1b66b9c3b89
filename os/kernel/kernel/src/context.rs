//! Process-lifetime virtual-memory state and its entry points.
//!
//! Boot calls [`init_paging`] exactly once; thereafter the trap dispatcher
//! feeds page faults into [`handle_page_fault`]. Both serialise through the
//! same interrupt-masking spin lock, honouring the core's assumption that
//! it is never re-entered concurrently with itself.

use kernel_alloc::{FramePool, FramePoolRegistry, PhysMapper, PoolHandle};
use kernel_info::memory::{
    FIRST_VM_POOL_BASE, FIRST_VM_POOL_SIZE, KERNEL_POOL_FIRST_FRAME, KERNEL_POOL_FRAMES,
    PROCESS_POOL_FIRST_FRAME, PROCESS_POOL_FRAMES, SHARED_REGION_SIZE,
};
use kernel_memory_addresses::{PhysicalFrame, VirtualAddress};
use kernel_sync::SpinLock;
use kernel_vmem::vmm::FaultDisposition;
use kernel_vmem::{AddressSpace, Mmu, PageFaultCode, VmPool, Vmm};
use log::info;

/// Everything the virtual-memory core owns for the lifetime of the kernel.
pub struct KernelVm {
    pub frames: FramePoolRegistry,
    pub vmm: Vmm,
    pub space: AddressSpace,
    pub kernel_pool: PoolHandle,
    pub process_pool: PoolHandle,
}

/// The singleton. `None` until [`init_paging`] has run.
static KERNEL_VM: SpinLock<Option<KernelVm>> = SpinLock::new(None);

impl KernelVm {
    /// The full bring-up sequence: create the kernel and process frame
    /// pools from the layout in [`kernel_info::memory`], configure paging,
    /// construct one address space, load it, and switch translation on.
    pub fn bootstrap<M: Mmu + PhysMapper>(machine: &mut M) -> Self {
        let mut frames = FramePoolRegistry::new();

        let kernel_pool = FramePool::create(
            &mut frames,
            machine,
            PhysicalFrame::from_number(KERNEL_POOL_FIRST_FRAME),
            KERNEL_POOL_FRAMES,
            None,
        );
        // The process pool's bitmap lives in kernel-pool frames; the pool
        // itself stays fully available for demand paging.
        let process_info = frames.allocate(
            kernel_pool,
            machine,
            FramePool::needed_info_frames(PROCESS_POOL_FRAMES),
        );
        let process_pool = FramePool::create(
            &mut frames,
            machine,
            PhysicalFrame::from_number(PROCESS_POOL_FIRST_FRAME),
            PROCESS_POOL_FRAMES,
            Some(process_info),
        );

        let mut vmm = Vmm::new(kernel_pool, process_pool, SHARED_REGION_SIZE);
        let space = AddressSpace::new(&vmm, &mut frames, machine);
        vmm.load(machine, &space);
        vmm.enable_paging(machine);

        info!("virtual memory online");
        Self {
            frames,
            vmm,
            space,
            kernel_pool,
            process_pool,
        }
    }

    /// Route one page fault into the core.
    pub fn page_fault<M: Mmu + PhysMapper>(
        &mut self,
        machine: &mut M,
        code: PageFaultCode,
    ) -> FaultDisposition {
        self.vmm.handle_fault(&mut self.frames, machine, code)
    }

    /// Reserve a demand-paged window backed by the process pool.
    pub fn create_vm_pool<M: Mmu + PhysMapper>(
        &mut self,
        machine: &mut M,
        base: VirtualAddress,
        size: u32,
    ) -> VmPool {
        VmPool::new(
            &mut self.vmm,
            &mut self.frames,
            machine,
            base,
            size,
            self.process_pool,
        )
    }

    /// The default first pool, at the window named in
    /// [`kernel_info::memory`].
    pub fn create_first_vm_pool<M: Mmu + PhysMapper>(&mut self, machine: &mut M) -> VmPool {
        self.create_vm_pool(
            machine,
            VirtualAddress::new(FIRST_VM_POOL_BASE),
            FIRST_VM_POOL_SIZE,
        )
    }
}

/// One-time boot entry: bring the virtual-memory core up and install it as
/// the process singleton.
///
/// # Panics
/// Panics when called twice.
pub fn init_paging<M: Mmu + PhysMapper>(machine: &mut M) {
    let mut slot = KERNEL_VM.lock_irq();
    assert!(slot.is_none(), "init_paging called twice");
    *slot = Some(KernelVm::bootstrap(machine));
}

/// Trap-dispatch entry: service one page fault under the singleton lock.
///
/// # Panics
/// Panics when paging was never initialised — a fault before
/// [`init_paging`] means translation is on without the core's consent.
pub fn handle_page_fault<M: Mmu + PhysMapper>(
    machine: &mut M,
    code: PageFaultCode,
) -> FaultDisposition {
    let mut slot = KERNEL_VM.lock_irq();
    let vm = slot.as_mut().expect("page fault before init_paging");
    vm.page_fault(machine, code)
}

/// Run `f` against the initialised singleton, interrupts masked.
///
/// # Panics
/// Panics when paging was never initialised.
pub fn with_kernel_vm<R>(f: impl FnOnce(&mut KernelVm) -> R) -> R {
    let mut slot = KERNEL_VM.lock_irq();
    let vm = slot.as_mut().expect("virtual memory not initialised");
    f(vm)
}
