use crate::PageFaultCode;
use kernel_memory_addresses::VirtualAddress;
use kernel_registers::{Cr0, Cr2, Cr3};

/// The hardware boundary of the paging core: translated memory access plus
/// the three control registers it touches.
///
/// On a real machine, [`virt_to_mut`](Mmu::virt_to_mut) is a plain pointer
/// cast — a bad access traps, the dispatcher calls back into
/// [`Vmm::handle_fault`](crate::Vmm::handle_fault), and the instruction
/// restarts. A test implementation performs a software page walk over
/// simulated RAM instead and models the trap by recording CR2 and returning
/// the error code; callers that expect demand paging retry after routing
/// the code through the fault handler, mirroring the hardware's instruction
/// restart.
pub trait Mmu {
    /// Resolve a linear address to a usable mutable reference, as the CPU
    /// would: identity while paging is off, walked through the directory
    /// referenced by CR3 once it is on.
    ///
    /// # Errors
    /// The page-fault error code when translation misses. Implementations
    /// must set CR2 to `va` before returning it.
    ///
    /// # Safety
    /// - `va` must be mapped writable (or about to be demand-paged) and
    ///   aligned for `T`, and `T` must match the bytes behind it.
    /// - Lifetime `'a` is purely borrow-checked; the mapping must remain
    ///   valid for `'a`.
    unsafe fn virt_to_mut<'a, T>(&mut self, va: VirtualAddress) -> Result<&'a mut T, PageFaultCode>;

    fn read_cr0(&self) -> Cr0;

    fn write_cr0(&mut self, cr0: Cr0);

    /// The faulting linear address recorded by the most recent page fault.
    fn read_cr2(&self) -> Cr2;

    fn read_cr3(&self) -> Cr3;

    /// Point translation at a new directory. Reloading CR3 also flushes all
    /// non-global TLB entries, which this core uses as its (coarse)
    /// invalidation primitive.
    fn write_cr3(&mut self, cr3: Cr3);
}
