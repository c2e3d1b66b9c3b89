//! The real 32-bit x86 machine: raw-pointer memory access, control
//! registers through privileged `mov`s, and a serial-port logger.
//!
//! Only the `page_fault_entry` glue belongs to this core's contract; wiring
//! the IDT vector to it is the trap dispatcher's business.

use crate::context;
use core::hint::spin_loop;
use kernel_alloc::PhysMapper;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_registers::{Cr0, Cr2, Cr3, LoadRegisterUnsafe, StoreRegisterUnsafe};
use kernel_vmem::vmm::FaultDisposition;
use kernel_vmem::{Mmu, PageFaultCode};
use log::{LevelFilter, Log, Metadata, Record, error};

/// The hardware "implementation" of the machine traits. Zero-sized: state
/// lives in the CPU.
pub struct X86Machine;

impl PhysMapper for X86Machine {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        // Frame-pool bookkeeping and boot-time paging structures live in
        // the identity-mapped shared region, so the physical address *is*
        // the linear address.
        // SAFETY: caller guarantees the range is identity-mapped writable.
        unsafe { &mut *(pa.as_u32() as usize as *mut T) }
    }
}

impl Mmu for X86Machine {
    unsafe fn virt_to_mut<'a, T>(&mut self, va: VirtualAddress) -> Result<&'a mut T, PageFaultCode> {
        // A bad linear address does not fail here: it traps, the dispatcher
        // calls `page_fault_entry`, and the access restarts. By the
        // no-refault guarantee the retry succeeds or the kernel has halted.
        // SAFETY: caller guarantees alignment and type; presence is the
        // fault handler's business.
        Ok(unsafe { &mut *(va.as_u32() as usize as *mut T) })
    }

    fn read_cr0(&self) -> Cr0 {
        // SAFETY: ring 0.
        unsafe { Cr0::load_unsafe() }
    }

    fn write_cr0(&mut self, cr0: Cr0) {
        // SAFETY: ring 0; the caller transitions paging state deliberately.
        unsafe { cr0.store_unsafe() }
    }

    fn read_cr2(&self) -> Cr2 {
        // SAFETY: ring 0.
        unsafe { Cr2::load_unsafe() }
    }

    fn read_cr3(&self) -> Cr3 {
        // SAFETY: ring 0.
        unsafe { Cr3::load_unsafe() }
    }

    fn write_cr3(&mut self, cr3: Cr3) {
        // SAFETY: ring 0; reloading CR3 flushes the TLB as intended.
        unsafe { cr3.store_unsafe() }
    }
}

/// The handler the trap dispatcher jumps to with the pushed error code.
///
/// Protection violations are not serviced by the paging core; nothing
/// useful can continue after one in this kernel, so halt loudly.
pub extern "C" fn page_fault_entry(error_code: u32) {
    let mut machine = X86Machine;
    let code = PageFaultCode::from_bits(error_code);
    match context::handle_page_fault(&mut machine, code) {
        FaultDisposition::Serviced => (),
        FaultDisposition::ProtectionViolation => {
            error!(
                "unrecoverable page fault at {}: {}",
                machine.read_cr2().fault_address(),
                code.explain()
            );
            loop {
                spin_loop();
            }
        }
    }
}

/// COM1 logger. Polling, write-only; enough for boot diagnostics.
pub struct SerialLogger {
    max_level: LevelFilter,
}

const COM1: u16 = 0x3F8;

impl SerialLogger {
    #[must_use]
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    fn write_byte(byte: u8) {
        // SAFETY: COM1 data port; transmit-ready polling is skipped, which
        // at worst drops characters under heavy logging.
        unsafe {
            core::arch::asm!("out dx, al", in("dx") COM1, in("al") byte, options(nomem, nostack, preserves_flags));
        }
    }
}

impl Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        use core::fmt::Write;
        struct Port;
        impl Write for Port {
            fn write_str(&mut self, s: &str) -> core::fmt::Result {
                for byte in s.bytes() {
                    if byte == b'\n' {
                        SerialLogger::write_byte(b'\r');
                    }
                    SerialLogger::write_byte(byte);
                }
                Ok(())
            }
        }
        let _ = writeln!(Port, "[{}] {}: {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {
        // no-op for a polling serial port
    }
}

/// Call once during early init, before `init_paging` starts logging.
///
/// # Errors
/// Propagates `log::set_logger`'s already-initialised error.
pub fn init_logger(max_level: LevelFilter) -> Result<(), log::SetLoggerError> {
    static LOGGER: SerialLogger = SerialLogger::new(LevelFilter::Trace);
    log::set_logger(&LOGGER)?;
    log::set_max_level(max_level);
    Ok(())
}
