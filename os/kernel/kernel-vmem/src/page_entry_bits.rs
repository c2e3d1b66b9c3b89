use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalFrame;

/// A single 32-bit page-table entry in its raw bitfield form.
///
/// This structure models the common superset of fields found in both paging
/// levels (PDE and PTE). Each bit corresponds to a hardware-defined flag or
/// address field of the IA-32 two-level paging convention; the layout must
/// be bit-exact because the processor walks these words directly.
///
/// ### Bit layout
///
/// | Bits  | Name / Mnemonic | Meaning |
/// |-------|-----------------|---------|
/// | 0     | `P` (present)   | Valid entry if set |
/// | 1     | `RW`            | Writable if set |
/// | 2     | `US`            | User-mode accessible if set |
/// | 3     | `PWT`           | Write-through caching |
/// | 4     | `PCD`           | Disable caching |
/// | 5     | `A`             | Accessed |
/// | 6     | `D`             | Dirty (leaf only) |
/// | 7     | `PS`/`PAT`      | Page size (PDE) / attribute (PTE); kept 0 |
/// | 8     | `G`             | Global (leaf only) |
/// | 9–11  | OS avail        | Reserved for OS use |
/// | 12–31 | frame           | Physical frame number |
///
/// ### Notes
/// - This core maps 4 KiB pages only, so `PS` stays clear in every PDE.
/// - A non-present entry is still a full 32-bit word; the remaining bits are
///   preserved, which the demand-pager relies on (a freed page keeps its
///   stale frame number with only `P` cleared).
///
/// ### Example
/// ```rust
/// # use kernel_vmem::PageEntryBits;
/// # use kernel_memory_addresses::PhysicalFrame;
/// let e = PageEntryBits::new_present_rw().with_frame(PhysicalFrame::from_number(0x345));
/// assert!(e.present());
/// assert!(e.writable());
/// assert_eq!(e.into_bits(), (0x345 << 12) | 0b11);
/// ```
#[bitfield(u32)]
pub struct PageEntryBits {
    /// Present (P, bit 0).
    ///
    /// Set if the entry references a valid table or page. Clear means an
    /// access through this entry raises a page fault.
    pub present: bool,

    /// Writable (RW, bit 1).
    ///
    /// Set to allow writes; clear for read-only.
    pub writable: bool,

    /// User/Supervisor (US, bit 2).
    ///
    /// Set to allow user-mode access; clear restricts to supervisor only.
    pub user_access: bool,

    /// Page Write-Through (PWT, bit 3).
    pub write_through: bool,

    /// Page Cache Disable (PCD, bit 4).
    pub cache_disabled: bool,

    /// Accessed (A, bit 5). Set by the CPU on first access through this
    /// entry; software may clear it to track usage.
    pub accessed: bool,

    /// Dirty (D, bit 6) — leaf only. Set by the CPU on first write.
    pub dirty: bool,

    /// Page Size (PS, bit 7) in a PDE; PAT in a PTE. This core uses 4 KiB
    /// pages exclusively, so the bit stays clear at both levels.
    pub large_page: bool,

    /// Global (G, bit 8) — leaf only. Exempts the TLB entry from CR3
    /// reloads when CR4.PGE is enabled. Unused here: the coarse CR3-reload
    /// flush relies on nothing being global.
    pub global_translation: bool,

    /// Bits 9–11 — available to the OS; unused.
    #[bits(3)]
    __: u8,

    /// Bits 12–31 — physical frame number of the referenced table or page.
    #[bits(20)]
    frame_number: u32,
}

impl PageEntryBits {
    /// Present + writable + supervisor: the pattern for live directory
    /// entries, identity mappings, and demand-paged data pages.
    #[must_use]
    pub const fn new_present_rw() -> Self {
        Self::new().with_present(true).with_writable(true)
    }

    /// Writable + supervisor, **not** present: the initial pattern for
    /// directory entries beyond the shared region, recognisable later as
    /// "missing table" rather than a protection violation.
    #[must_use]
    pub const fn new_absent_rw() -> Self {
        Self::new().with_writable(true)
    }

    /// User-readable, **not** present: the pattern freshly created tables
    /// are filled with, so a sibling-page fault stays detectable instead of
    /// silently reading garbage.
    #[must_use]
    pub const fn new_absent_user() -> Self {
        Self::new().with_user_access(true)
    }

    /// The referenced physical frame.
    #[must_use]
    pub const fn frame(self) -> PhysicalFrame {
        PhysicalFrame::from_number(self.frame_number())
    }

    /// Replace the referenced physical frame.
    #[must_use]
    pub const fn with_frame(self, frame: PhysicalFrame) -> Self {
        self.with_frame_number(frame.number())
    }

    /// Set the referenced physical frame in place.
    pub fn set_frame(&mut self, frame: PhysicalFrame) {
        *self = self.with_frame(frame);
    }
}
