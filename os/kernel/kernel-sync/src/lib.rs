//! # Kernel synchronization primitives
//!
//! The paging core itself carries no locking discipline: its scan-then-mark
//! and read-then-write sequences are critical sections its *caller* must
//! protect. This crate supplies what that caller needs — a spin lock for
//! the process-lifetime singletons, and an interrupt guard so fault
//! handling cannot be re-entered from an interrupt in the middle of an
//! allocator mutation.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
mod spin_lock;

pub use irq::IrqGuard;
pub use spin_lock::{IrqSpinLock, SpinLock, SpinLockGuard};
