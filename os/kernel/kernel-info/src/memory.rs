//! # Memory Layout
//!
//! Physical and linear layout of the teaching machine: 4 KiB frames, a
//! 4 MiB identity-mapped shared region at the bottom of every address space,
//! a kernel frame pool directly below the shared boundary, and a process
//! frame pool covering everything above it.

/// Size of one frame / page in bytes.
pub const FRAME_SIZE: u32 = 4096;

/// Number of entries in a page directory or page table.
pub const ENTRIES_PER_TABLE: u32 = 1024;

/// Bytes of linear address space covered by one fully-populated page table.
pub const BYTES_PER_TABLE: u32 = FRAME_SIZE * ENTRIES_PER_TABLE; // 4 MiB

/// Size of the identity-mapped shared region (kernel image plus all process
/// images present at boot).
pub const SHARED_REGION_SIZE: u32 = 4 * 1024 * 1024;

/// Directory slot reserved for the self-referential mapping.
///
/// The slot maps the directory frame back into the address space so that
/// directory and table contents stay reachable through linear addresses
/// after paging is switched on.
pub const RECURSIVE_SLOT: u16 = 1023;

/// First frame of the kernel pool (2 MiB).
///
/// The kernel pool supplies frames for paging-structure metadata; it lies
/// inside the shared region and is therefore identity-mapped.
pub const KERNEL_POOL_FIRST_FRAME: u32 = 512;

/// Number of frames in the kernel pool (2 MiB worth).
pub const KERNEL_POOL_FRAMES: u32 = 512;

/// First frame of the process pool (4 MiB, right above the shared region).
pub const PROCESS_POOL_FIRST_FRAME: u32 = 1024;

/// Number of frames in the process pool (28 MiB worth on the 32 MiB
/// reference machine).
pub const PROCESS_POOL_FRAMES: u32 = 7 * 1024;

/// Default window for the first demand-paged virtual memory pool.
pub const FIRST_VM_POOL_BASE: u32 = 512 * 1024 * 1024;

/// Size of the first demand-paged virtual memory pool.
pub const FIRST_VM_POOL_SIZE: u32 = 256 * FRAME_SIZE;

const _: () = {
    // Pool bookkeeping must fill whole frames.
    assert!(KERNEL_POOL_FRAMES % 8 == 0);
    assert!(PROCESS_POOL_FRAMES % 8 == 0);
    // The kernel pool must stay inside the identity-mapped shared region.
    assert!((KERNEL_POOL_FIRST_FRAME + KERNEL_POOL_FRAMES) * FRAME_SIZE <= SHARED_REGION_SIZE);
    // The process pool begins exactly at the shared boundary.
    assert!(PROCESS_POOL_FIRST_FRAME * FRAME_SIZE == SHARED_REGION_SIZE);
    // The shared region must be table-granular and leave the recursive slot free.
    assert!(SHARED_REGION_SIZE % BYTES_PER_TABLE == 0);
    assert!(SHARED_REGION_SIZE / BYTES_PER_TABLE <= RECURSIVE_SLOT as u32);
    // VM pool windows live above everything identity-mapped.
    assert!(FIRST_VM_POOL_BASE >= SHARED_REGION_SIZE);
    assert!(FIRST_VM_POOL_BASE % FRAME_SIZE == 0);
};
