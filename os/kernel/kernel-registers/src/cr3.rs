use bitfield_struct::bitfield;
use kernel_memory_addresses::{PhysicalAddress, PhysicalFrame};

#[cfg(all(feature = "asm", target_arch = "x86"))]
use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};

/// CR3 — Page-Directory Base Register.
///
/// Holds the physical base address of the page directory and cache-control
/// flags for directory walks. Reloading CR3 flushes all non-global TLB
/// entries, which is how this core invalidates stale translations.
#[bitfield(u32)]
pub struct Cr3 {
    /// Bits 0–2 — Reserved (must be 0).
    #[bits(3, default = 0)]
    _reserved0: u8,

    /// Bit 3 — PWT: Page-level Write-Through for the directory.
    ///
    /// Controls write-through vs write-back caching when the processor
    /// accesses the page directory through CR3.
    pub pwt: bool,

    /// Bit 4 — PCD: Page-level Cache Disable for the directory.
    ///
    /// When set, disables caching for directory accesses.
    pub pcd: bool,

    /// Bits 5–11 — Reserved (must be 0 when written).
    #[bits(7, default = 0)]
    _reserved1: u8,

    /// Bits 12–31 — Physical base of the page directory >> 12.
    ///
    /// The directory is 4 KiB-aligned, so only the frame number is stored.
    #[bits(20)]
    directory_base_4k: u32,
}

impl Cr3 {
    /// Create a `Cr3` value from the directory frame and flags.
    #[must_use]
    pub fn from_directory(directory: PhysicalFrame, pwt: bool, pcd: bool) -> Self {
        let mut cr3 = Self::new();
        cr3.set_pwt(pwt);
        cr3.set_pcd(pcd);
        cr3.set_directory_base_4k(directory.number());
        cr3
    }

    /// The frame holding the active page directory.
    #[must_use]
    pub const fn directory(self) -> PhysicalFrame {
        PhysicalFrame::from_number(self.directory_base_4k())
    }

    /// Full physical address of the directory base.
    #[must_use]
    pub const fn directory_base(self) -> PhysicalAddress {
        self.directory().base()
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl LoadRegisterUnsafe for Cr3 {
    unsafe fn load_unsafe() -> Self {
        let mut cr3: u32;
        unsafe {
            core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr3)
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl StoreRegisterUnsafe for Cr3 {
    unsafe fn store_unsafe(self) {
        let cr3 = self.into_bits();
        unsafe {
            core::arch::asm!("mov cr3, {}", in(reg) cr3, options(nostack, preserves_flags));
        }
    }
}
