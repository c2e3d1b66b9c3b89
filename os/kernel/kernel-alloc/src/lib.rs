//! # Physical Frame Pools
//!
//! This crate manages physical memory at frame (4 KiB) granularity. It is
//! the bottom layer of the memory system: the translation structure and the
//! demand-paging machinery draw every frame they use from here.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              FramePoolRegistry                      │
//! │    • owns every FramePool, in creation order        │
//! │    • release-by-frame-number across all pools       │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                  FramePool                          │
//! │    • contiguous runs of 4 KiB frames                │
//! │    • 2-bit state per frame, head-of-sequence marks  │
//! │    • bookkeeping lives in management frames         │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                  PhysMapper                         │
//! │    • physical address → usable pointer              │
//! │    • identity map in the kernel, simulated in tests │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! ### Frame Pool ([`FramePool`])
//!
//! A contiguous allocator over a numeric range of physical frames. A plain
//! free/used bitmap cannot express where a multi-frame allocation ends, so
//! each frame carries one of **three** states packed into two bits:
//! [`Free`](FrameState::Free), [`HeadOfSequence`](FrameState::HeadOfSequence)
//! for the first frame of an allocated run, and
//! [`Allocated`](FrameState::Allocated) for the remaining frames of the run.
//! Run length is never stored; a release walks forward from the head until
//! it meets the next `Free` or `HeadOfSequence` frame.
//!
//! ### Registry ([`FramePoolRegistry`])
//!
//! At the time a frame is released, the caller typically knows only the
//! frame number, not which pool produced it. The registry owns all pools in
//! creation order and resolves a release by range lookup, so individual
//! pools are never reached directly by release calls.
//!
//! ## Failure Model
//!
//! Every invariant violation (exhaustion, release of a non-head frame,
//! out-of-range requests) is unrecoverable: it is logged and the kernel
//! halts via panic. There is no error-return channel to ordinary callers —
//! continuing with an inconsistent bitmap would corrupt later operations.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod frame_pool;
mod frame_registry;
mod phys_mapper;

pub use frame_pool::{FramePool, FramePoolError, FrameState};
pub use frame_registry::{FramePoolRegistry, PoolHandle};
pub use phys_mapper::PhysMapper;

/// Log the violation, then halt. No caller gets to observe the error value.
#[cold]
pub(crate) fn fatal(err: frame_pool::FramePoolError) -> ! {
    log::error!("frame pool: {err}");
    panic!("frame pool: {err}");
}
