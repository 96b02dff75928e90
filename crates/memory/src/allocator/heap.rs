//! Over-aligning heap allocator
//!
//! Wraps the platform heap (`calloc`/`free`) so that allocations can carry
//! alignments stricter than the heap's default. Each block is over-allocated
//! and the true heap address is stashed in a one-pointer header slot placed
//! immediately before the aligned address handed to the caller:
//!
//! ```text
//! raw                        aligned - W   aligned
//!  |<------- padding ------->|<- header ->|<------- size ------->|
//!  [.........................][ raw ptr  ][ user bytes ..........]
//! ```
//!
//! `W` is the pointer width. The header is what lets [`heap_free`] release
//! a block knowing nothing but the pointer.

use core::alloc::Layout;
use core::ffi::c_void;
use core::mem;
use core::ptr::{self, NonNull};
use std::sync::LazyLock;

#[cfg(feature = "logging")]
use tracing::{debug, error};

use super::{AllocError, AllocResult, Allocator, MemoryUsage};
use crate::utils::{align_forward, is_valid_alignment};

/// Width of the header slot that records the true heap address
const HEADER_SIZE: usize = mem::size_of::<*mut c_void>();

/// Bytes requested from the heap for a `size`-byte block aligned to `align`
/// (already clamped to at least the header width).
#[inline]
fn padded_size(size: usize, align: usize) -> AllocResult<usize> {
    (align - 1)
        .checked_add(HEADER_SIZE)
        .and_then(|n| n.checked_add(size))
        .ok_or_else(|| AllocError::size_overflow("heap block header and padding"))
}

/// Allocates `size` zeroed bytes aligned to `align` from the platform heap.
///
/// Alignments below the pointer width are raised to it. A null return from
/// the heap is reported as [`MemoryError::AllocationFailed`](crate::MemoryError).
///
/// # Panics
/// Panics if `align` is not a power of two greater than zero.
pub fn heap_alloc(size: usize, align: usize) -> AllocResult<NonNull<u8>> {
    assert!(is_valid_alignment(align), "invalid alignment: {align}");
    let align = align.max(HEADER_SIZE);
    let space = padded_size(size, align)?;

    // SAFETY: calloc with a non-zero element count and size 1.
    // - space >= HEADER_SIZE > 0, so the request is never zero-sized
    // - The result is checked for null below
    let raw = unsafe { libc::calloc(space, 1) };
    let Some(raw) = NonNull::new(raw.cast::<u8>()) else {
        return Err(AllocError::allocation_failed(size, align));
    };

    let user_start = raw.as_ptr() as usize + HEADER_SIZE;
    let aligned = align_forward(user_start, align);
    let offset = aligned - raw.as_ptr() as usize;

    // SAFETY: Writing the header and deriving the aligned pointer.
    // - offset <= HEADER_SIZE + align - 1, so [offset, offset + size) lies
    //   inside the `space`-byte block
    // - offset >= HEADER_SIZE, so the header slot [offset - W, offset) is
    //   inside the block as well
    // - aligned is a multiple of align >= W, so the header slot is aligned
    //   for a pointer write
    unsafe {
        let user = raw.as_ptr().add(offset);
        user.cast::<*mut c_void>()
            .sub(1)
            .write(raw.as_ptr().cast::<c_void>());
        Ok(NonNull::new_unchecked(user))
    }
}

/// Releases a block returned by [`heap_alloc`].
///
/// # Safety
/// - `ptr` must come from [`heap_alloc`] (directly or via [`HeapAllocator`])
/// - `ptr` must not have been freed already and must not be used afterwards
pub unsafe fn heap_free(ptr: NonNull<u8>) {
    // SAFETY: Reading the header slot written by heap_alloc.
    // - The slot sits directly before ptr and is pointer-aligned
    // - It holds the address calloc returned, which is what free expects
    unsafe {
        let raw = ptr.as_ptr().cast::<*mut c_void>().sub(1).read();
        libc::free(raw);
    }
}

/// Heap-backed strategy with arbitrary alignment support
///
/// Stateless: every block carries its own header, so the allocator itself
/// holds nothing. Exhaustion of the underlying heap is unrecoverable at this
/// layer and aborts through [`std::alloc::handle_alloc_error`]; only size
/// overflow is reported as an error value. Use [`heap_alloc`] directly when
/// a null heap should be surfaced instead.
///
/// # Examples
/// ```rust
/// use tessera_memory::allocator::{Allocator, HeapAllocator};
///
/// let heap = HeapAllocator::new();
/// let ptr = heap.alloc(4096, 64)?;
/// assert_eq!(ptr.as_ptr() as usize % 64, 0);
/// unsafe { heap.free(ptr, 4096, 64) };
/// # Ok::<(), tessera_memory::AllocError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAllocator;

impl HeapAllocator {
    /// Creates a new HeapAllocator
    ///
    /// This is a zero-cost operation as the HeapAllocator contains no state.
    #[inline]
    pub const fn new() -> Self {
        HeapAllocator
    }
}

// SAFETY: HeapAllocator hands out disjoint calloc-backed blocks.
// - Each block is zero-filled by calloc and sized for padding + header + size
// - The returned address is aligned by align_forward
// - free recovers the true block through the header
unsafe impl Allocator for HeapAllocator {
    fn alloc(&self, size: usize, align: usize) -> AllocResult<NonNull<u8>> {
        match heap_alloc(size, align) {
            Err(AllocError::AllocationFailed { size, align }) => {
                #[cfg(feature = "logging")]
                error!(size, align, "heap allocation failed");

                let layout = Layout::from_size_align(size, align)
                    .unwrap_or_else(|_| Layout::new::<*mut c_void>());
                std::alloc::handle_alloc_error(layout)
            }
            other => other,
        }
    }

    // No in-place growth: always a fresh block plus a copy.
    unsafe fn realloc(
        &self,
        old_ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) -> AllocResult<NonNull<u8>> {
        let new_ptr = self.alloc(new_size, align)?;
        let Some(old_ptr) = old_ptr else {
            return Ok(new_ptr);
        };

        // SAFETY: Moving the surviving prefix into the new block.
        // - old_ptr is valid for old_size bytes (caller contract)
        // - new_ptr is valid for new_size bytes (just allocated)
        // - The blocks are distinct heap allocations, so they cannot overlap
        unsafe {
            ptr::copy_nonoverlapping(
                old_ptr.as_ptr(),
                new_ptr.as_ptr(),
                old_size.min(new_size),
            );
            self.free(old_ptr, old_size, align);
        }
        Ok(new_ptr)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, _size: usize, _align: usize) {
        // SAFETY: ptr came from this allocator (caller contract)
        unsafe { heap_free(ptr) };
    }

    /// The heap has no notion of bulk ownership; this is a no-op.
    fn free_all(&self) {}
}

// The heap does not track its blocks
impl MemoryUsage for HeapAllocator {
    fn used_memory(&self) -> usize {
        0
    }

    fn available_memory(&self) -> Option<usize> {
        None
    }
}

static HEAP_ALLOCATOR: LazyLock<HeapAllocator> = LazyLock::new(|| {
    #[cfg(feature = "logging")]
    debug!("initializing process-wide heap allocator");

    HeapAllocator::new()
});

/// Process-wide default heap allocator
///
/// Initialised on first use and valid for the rest of the process.
pub fn heap_allocator() -> &'static HeapAllocator {
    &HEAP_ALLOCATOR
}
