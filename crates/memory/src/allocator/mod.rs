//! Allocator capability and the heap-backed strategy
//!
//! Every strategy in the crate implements [`Allocator`]; consumers are
//! written against that trait (or `&dyn Allocator`) and stay agnostic of
//! whether an [`Arena`](crate::arena::Arena) or the [`HeapAllocator`] backs
//! them.

pub mod heap;
mod traits;

pub use crate::error::{AllocError, AllocResult};
pub use heap::{HeapAllocator, heap_alloc, heap_allocator, heap_free};
pub use traits::{Allocator, MemoryUsage, TypedAllocator};
