//! # tessera-memory
//!
//! Region-based memory allocation for hot paths that create many
//! short-lived objects.
//!
//! This crate provides:
//! - [`Arena`](arena::Arena): a bump allocator over a caller-owned buffer
//! - [`ArenaRegion`](arena::ArenaRegion): LIFO checkpoints that bulk-release
//!   everything allocated after them
//! - [`HeapAllocator`](allocator::HeapAllocator): an over-aligning wrapper
//!   around the platform heap, plus a process-wide instance
//! - the [`Allocator`](allocator::Allocator) capability both implement, so
//!   containers can be written once and backed by either
//!
//! ## Quick Start
//!
//! ```rust
//! use tessera_memory::prelude::*;
//!
//! let mut buf = [0u8; 1024];
//! let arena = Arena::new(&mut buf);
//!
//! let numbers = arena.make_slice::<u32>(16)?;
//! let used = arena.used();
//! {
//!     let _region = ArenaRegion::new(&arena);
//!     let _scratch = arena.alloc(256, 16)?;
//! }
//! assert_eq!(arena.used(), used);
//!
//! let heap = heap_allocator();
//! let block = heap.alloc(100, 64)?;
//! assert_eq!(block.as_ptr() as usize % 64, 0);
//! unsafe { heap.free(block, 100, 64) };
//! # let _ = numbers;
//! # Ok::<(), tessera_memory::AllocError>(())
//! ```
//!
//! ## Features
//!
//! - `logging` (default): structured events through `tracing`
//!
//! ## Errors and panics
//!
//! Running out of memory is reported through [`MemoryError`]. Broken
//! contracts (invalid alignment, out-of-order region release, resetting an
//! arena while a region is open) panic.

#![cfg_attr(docsrs, feature(doc_cfg))]
// Raw buffer management is the point of the crate; every block is annotated.
#![allow(unsafe_code)]

pub mod allocator;
pub mod arena;
pub mod error;
pub mod utils;

pub use crate::allocator::{AllocError, AllocResult};
pub use crate::error::{MemoryError, MemoryResult, Result};

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::error::{MemoryError, MemoryResult};

    pub use crate::allocator::{
        AllocError, AllocResult, Allocator, HeapAllocator, MemoryUsage, TypedAllocator,
        heap_allocator,
    };

    pub use crate::arena::{
        Arena, ArenaConfig, ArenaRegion, ArenaState, ArenaStats, with_scratch,
    };
}
