use kernel_memory_addresses::PhysicalAddress;

/// Converts physical addresses to usable pointers in the current virtual
/// address space.
///
/// Rust code can only dereference virtual addresses. While paging is off,
/// and for the identity-mapped shared region afterwards, physical and
/// linear addresses coincide and the kernel implementation is a plain cast.
/// Tests substitute an implementation backed by simulated RAM.
///
/// # Safety
/// - The caller must ensure `pa` is mapped (identity or otherwise) and
///   writable in the current translation for `&mut T` access.
/// - Lifetime `'a` is purely borrow-checked; the mapping must remain valid
///   for `'a`.
/// - Type `T` must match the bytes at `pa` (no aliasing UB).
pub trait PhysMapper {
    /// Convert a *physical* address to a usable mutable pointer in the
    /// current address space.
    ///
    /// # Safety
    /// See the trait-level contract.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;
}
