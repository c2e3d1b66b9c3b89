use bitfield_struct::bitfield;

/// Page-fault error code layout (IA-32).
///
/// The processor pushes this word when raising a page fault; the trap
/// dispatcher hands it to [`Vmm::handle_fault`](crate::Vmm::handle_fault)
/// unmodified. The faulting linear address itself arrives through CR2.
///
/// Reference: Intel SDM Vol. 3A, §6.15 "Page-Fault Exception (#PF)".
#[bitfield(u32)]
pub struct PageFaultCode {
    /// 0 = non-present page.
    /// 1 = protection violation (page present but access disallowed).
    pub present: bool, // bit 0

    /// 0 = read access.
    /// 1 = write access.
    pub write: bool, // bit 1

    /// 0 = supervisor (CPL 0–2).
    /// 1 = user mode (CPL 3).
    pub user: bool, // bit 2

    /// 1 = caused by a reserved bit set in a paging structure.
    pub reserved_bit: bool, // bit 3

    /// 1 = instruction fetch (relevant only with PAE/NX, kept for layout).
    pub instruction_fetch: bool, // bit 4

    #[bits(27)]
    __: u32, // reserved / ignored bits
}

impl PageFaultCode {
    /// Error code of a plain missing-page write, the common demand-paging
    /// case (and the shape simulated traps produce).
    #[must_use]
    pub const fn missing_write() -> Self {
        Self::new().with_write(true)
    }

    #[must_use]
    pub fn explain(&self) -> &'static str {
        if !self.present() {
            "non-present page (demand-paging candidate)"
        } else if self.write() {
            "write access to protected page"
        } else {
            "read access to protected page"
        }
    }
}
