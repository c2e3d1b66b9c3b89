//! # Kernel Configuration
//!
//! This crate centralizes the boot-time layout constants shared by the frame
//! pools, the translation structure, and the boot glue, so the numbers are
//! defined once and cross-checked at compile time.
//!
//! Pool sizing is supplied here as plain integers; the machine-specific boot
//! layer is free to derive them from a firmware memory map instead, as long
//! as the invariants asserted in [`memory`] continue to hold.

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod memory;
