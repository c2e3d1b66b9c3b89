//! Simulated machine for the paging tests.
//!
//! Physical memory is a vector of 4 KiB-aligned frames; physical addresses
//! are plain byte offsets from zero, so frame `n` of the machine is element
//! `n` of the vector. The [`Mmu`] implementation performs the same two-level
//! walk the hardware would: identity while CR0.PG is clear, through the
//! directory referenced by CR3 afterwards. A translation miss records CR2
//! and returns the error code — the simulated trap — and the access helpers
//! model the instruction restart by routing the code through the fault
//! handler and retrying.

#![allow(dead_code)]

use kernel_alloc::{FramePool, FramePoolRegistry, PhysMapper, PoolHandle};
use kernel_info::memory::SHARED_REGION_SIZE;
use kernel_memory_addresses::{PhysicalAddress, PhysicalFrame, VirtualAddress};
use kernel_registers::{Cr0, Cr2, Cr3};
use kernel_vmem::vmm::FaultDisposition;
use kernel_vmem::{AddressSpace, Mmu, PageFaultCode, Vmm};

#[repr(align(4096))]
pub struct RawFrame(pub [u8; 4096]);

pub struct SimMachine {
    frames: Vec<RawFrame>,
    cr0: Cr0,
    cr2: Cr2,
    cr3: Cr3,
    /// Translation misses observed (simulated traps).
    pub faults: usize,
    /// CR3 writes after the initial load (coarse TLB flushes).
    pub cr3_reloads: usize,
}

impl SimMachine {
    pub fn with_frames(n: usize) -> Self {
        let mut frames = Vec::with_capacity(n);
        for _ in 0..n {
            frames.push(RawFrame([0u8; 4096]));
        }
        Self {
            frames,
            cr0: Cr0::new().with_pe_protection_enable(true),
            cr2: Cr2::new(VirtualAddress::zero()),
            cr3: Cr3::new(),
            faults: 0,
            cr3_reloads: 0,
        }
    }

    fn frame_ptr(&self, index: usize) -> *mut u8 {
        std::ptr::from_ref(&self.frames[index]).cast_mut().cast::<u8>()
    }

    fn read_word_phys(&self, pa: u32) -> u32 {
        let index = (pa >> 12) as usize;
        let offset = (pa & 0xFFF) as usize;
        // SAFETY: harness-owned RAM, word-aligned offsets only.
        unsafe { *self.frame_ptr(index).add(offset).cast::<u32>() }
    }

    /// The software page walk. Mirrors the hardware: only the present bits
    /// gate translation; permission bits are not modeled.
    fn translate(&self, va: VirtualAddress) -> Result<PhysicalAddress, PageFaultCode> {
        if !self.cr0.pg_paging() {
            return Ok(PhysicalAddress::new(va.as_u32()));
        }
        let directory_base = self.cr3.directory_base().as_u32();
        let pde = self.read_word_phys(directory_base + (va.as_u32() >> 22) * 4);
        if pde & 1 == 0 {
            return Err(PageFaultCode::missing_write());
        }
        let table_base = pde & 0xFFFF_F000;
        let pte = self.read_word_phys(table_base + ((va.as_u32() >> 12) & 0x3FF) * 4);
        if pte & 1 == 0 {
            return Err(PageFaultCode::missing_write());
        }
        Ok(PhysicalAddress::new(
            (pte & 0xFFFF_F000) | (va.as_u32() & 0xFFF),
        ))
    }

    /// Write through a linear address the way a program would: fault,
    /// service, restart.
    pub fn poke(
        &mut self,
        vmm: &mut Vmm,
        frames: &mut FramePoolRegistry,
        va: VirtualAddress,
        value: u32,
    ) {
        for _ in 0..2 {
            // SAFETY: harness addresses are word-aligned sim RAM.
            match unsafe { self.virt_to_mut::<u32>(va) } {
                Ok(slot) => {
                    *slot = value;
                    return;
                }
                Err(code) => {
                    let disposition = vmm.handle_fault(frames, self, code);
                    assert_eq!(disposition, FaultDisposition::Serviced);
                }
            }
        }
        panic!("refault at {va}");
    }

    /// Read through a linear address the way a program would.
    pub fn peek(
        &mut self,
        vmm: &mut Vmm,
        frames: &mut FramePoolRegistry,
        va: VirtualAddress,
    ) -> u32 {
        for _ in 0..2 {
            // SAFETY: harness addresses are word-aligned sim RAM.
            match unsafe { self.virt_to_mut::<u32>(va) } {
                Ok(slot) => return *slot,
                Err(code) => {
                    let disposition = vmm.handle_fault(frames, self, code);
                    assert_eq!(disposition, FaultDisposition::Serviced);
                }
            }
        }
        panic!("refault at {va}");
    }
}

impl PhysMapper for SimMachine {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        let index = (pa.as_u32() >> 12) as usize;
        let offset = (pa.as_u32() & 0xFFF) as usize;
        // SAFETY: the frame is owned by the harness for the whole test.
        unsafe { &mut *self.frame_ptr(index).add(offset).cast::<T>() }
    }
}

impl Mmu for SimMachine {
    unsafe fn virt_to_mut<'a, T>(&mut self, va: VirtualAddress) -> Result<&'a mut T, PageFaultCode> {
        match self.translate(va) {
            Ok(pa) => {
                // SAFETY: translation landed inside harness RAM.
                Ok(unsafe { self.phys_to_mut::<T>(pa) })
            }
            Err(code) => {
                self.cr2 = Cr2::new(va);
                self.faults += 1;
                Err(code)
            }
        }
    }

    fn read_cr0(&self) -> Cr0 {
        self.cr0
    }

    fn write_cr0(&mut self, cr0: Cr0) {
        self.cr0 = cr0;
    }

    fn read_cr2(&self) -> Cr2 {
        self.cr2
    }

    fn read_cr3(&self) -> Cr3 {
        self.cr3
    }

    fn write_cr3(&mut self, cr3: Cr3) {
        if self.cr0.pg_paging() {
            self.cr3_reloads += 1;
        }
        self.cr3 = cr3;
    }
}

/// A booted machine: pools created, paging configured, one address space
/// constructed, loaded, and active.
pub struct Boot {
    pub machine: SimMachine,
    pub frames: FramePoolRegistry,
    pub vmm: Vmm,
    pub space: AddressSpace,
    pub kernel_pool: PoolHandle,
    pub process_pool: PoolHandle,
}

/// Machine layout used throughout the tests: 4.5 MiB of RAM, the kernel
/// pool at 2–4 MiB (bitmap in its own first frame), the process pool in the
/// 128 frames above the 4 MiB shared boundary (bitmap in a kernel-pool
/// frame, the way the boot code wires it on real hardware).
pub const KERNEL_POOL_FIRST: u32 = 512;
pub const KERNEL_POOL_FRAMES: u32 = 512;
pub const PROCESS_POOL_FIRST: u32 = 1024;
pub const PROCESS_POOL_FRAMES: u32 = 128;

pub fn boot() -> Boot {
    let mut machine = SimMachine::with_frames((PROCESS_POOL_FIRST + PROCESS_POOL_FRAMES) as usize);
    let mut frames = FramePoolRegistry::new();

    let kernel_pool = FramePool::create(
        &mut frames,
        &machine,
        PhysicalFrame::from_number(KERNEL_POOL_FIRST),
        KERNEL_POOL_FRAMES,
        None,
    );
    let process_info = frames.allocate(
        kernel_pool,
        &machine,
        FramePool::needed_info_frames(PROCESS_POOL_FRAMES),
    );
    let process_pool = FramePool::create(
        &mut frames,
        &machine,
        PhysicalFrame::from_number(PROCESS_POOL_FIRST),
        PROCESS_POOL_FRAMES,
        Some(process_info),
    );

    let mut vmm = Vmm::new(kernel_pool, process_pool, SHARED_REGION_SIZE);
    let space = AddressSpace::new(&vmm, &mut frames, &machine);
    vmm.load(&mut machine, &space);
    vmm.enable_paging(&mut machine);

    Boot {
        machine,
        frames,
        vmm,
        space,
        kernel_pool,
        process_pool,
    }
}
