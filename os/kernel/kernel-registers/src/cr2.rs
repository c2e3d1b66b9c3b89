use kernel_memory_addresses::VirtualAddress;

#[cfg(all(feature = "asm", target_arch = "x86"))]
use crate::LoadRegisterUnsafe;

/// CR2 — Page-Fault Linear Address.
///
/// After a page fault the processor stores the faulting linear address here.
/// The register has no flag bits; it is a plain 32-bit linear address and is
/// read-only as far as this core is concerned.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Cr2(VirtualAddress);

impl Cr2 {
    #[must_use]
    pub const fn new(addr: VirtualAddress) -> Self {
        Self(addr)
    }

    /// The faulting linear address.
    #[must_use]
    pub const fn fault_address(self) -> VirtualAddress {
        self.0
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl LoadRegisterUnsafe for Cr2 {
    unsafe fn load_unsafe() -> Self {
        let mut cr2: u32;
        unsafe {
            core::arch::asm!("mov {}, cr2", out(reg) cr2, options(nomem, nostack, preserves_flags));
        }
        Self::new(VirtualAddress::new(cr2))
    }
}
