//! # Kernel Glue
//!
//! The outward face of the virtual-memory core: the boot sequence that
//! creates the two frame pools and brings paging up, the process-lifetime
//! singleton holding that state, and the entry point the trap dispatcher
//! routes page faults into.
//!
//! The [`context`] module is machine-generic (everything flows through the
//! [`Mmu`](kernel_vmem::Mmu) and [`PhysMapper`](kernel_alloc::PhysMapper)
//! traits); the [`machine`] module supplies the real 32-bit x86
//! implementation — raw-pointer memory access, `mov crN`, and a serial-port
//! logger — and therefore only builds for `target_arch = "x86"`.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod context;

#[cfg(target_arch = "x86")]
pub mod machine;

pub use context::{KernelVm, handle_page_fault, init_paging};
