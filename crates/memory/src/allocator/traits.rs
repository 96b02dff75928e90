//! Allocator capability and typed helpers
//!
//! The system is built around a small set of traits:
//! - `Allocator`: the four primitives every strategy implements
//!   (`alloc`, `realloc`, `free`, `free_all`)
//! - `TypedAllocator`: construct/destroy typed values on top of `Allocator`
//! - `MemoryUsage`: capacity reporting for strategies that know their size
//!
//! Consumers (growable arrays, string builders, formatting buffers) hold a
//! `&A` or `&dyn Allocator` and never own the allocator they borrow.
//!
//! # Safety
//!
//! `Allocator` is an unsafe trait: implementors promise that every pointer
//! returned by `alloc`/`realloc` is non-null, aligned to the requested
//! alignment, valid for reads and writes of the requested size, zero-filled,
//! and disjoint from every other live allocation of the same allocator.

use core::mem;
use core::ptr::{self, NonNull};

use crate::error::{AllocError, AllocResult};

/// Uniform allocation contract implemented by every strategy
///
/// # Safety
/// Implementors must uphold the guarantees listed in the module docs. In
/// particular a pointer handed out by `alloc` must stay valid until it is
/// passed to `free`/`realloc`, or until the strategy's bulk release
/// (`free_all`, region release) invalidates it.
pub unsafe trait Allocator {
    /// Allocates `size` zero-initialised bytes aligned to `align`.
    ///
    /// Exhaustion is reported as an error; the allocator's state is left
    /// untouched in that case.
    ///
    /// # Panics
    /// Panics if `align` is not a power of two greater than zero.
    fn alloc(&self, size: usize, align: usize) -> AllocResult<NonNull<u8>>;

    /// Resizes an allocation, preserving its first `min(old_size, new_size)`
    /// bytes. `None` behaves exactly like [`alloc`](Self::alloc).
    ///
    /// On success the returned pointer replaces `old_ptr`, which must no
    /// longer be used unless the two are equal. On failure `old_ptr` is
    /// still valid and unchanged.
    ///
    /// # Safety
    /// - `old_ptr` must come from this allocator and still be live
    /// - `old_size` and `align` must match the original request
    unsafe fn realloc(
        &self,
        old_ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) -> AllocResult<NonNull<u8>>;

    /// Returns a single allocation to the allocator.
    ///
    /// Strategies without individual release (arenas) ignore the call.
    ///
    /// # Safety
    /// - `ptr` must come from this allocator and still be live
    /// - `size` and `align` must match the original request
    /// - `ptr` must not be used afterwards
    unsafe fn free(&self, ptr: NonNull<u8>, size: usize, align: usize);

    /// Releases every allocation at once.
    ///
    /// Strategies without bulk ownership (the heap) ignore the call. After a
    /// bulk release every previously returned pointer is dangling.
    fn free_all(&self);
}

// SAFETY: Forwarding every call to the referenced allocator.
// - No additional state or unsafe operations are introduced
// - The guarantees of `A` carry over unchanged
unsafe impl<A: Allocator + ?Sized> Allocator for &A {
    #[inline]
    fn alloc(&self, size: usize, align: usize) -> AllocResult<NonNull<u8>> {
        (**self).alloc(size, align)
    }

    #[inline]
    unsafe fn realloc(
        &self,
        old_ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) -> AllocResult<NonNull<u8>> {
        // SAFETY: caller contract forwarded verbatim
        unsafe { (**self).realloc(old_ptr, old_size, new_size, align) }
    }

    #[inline]
    unsafe fn free(&self, ptr: NonNull<u8>, size: usize, align: usize) {
        // SAFETY: caller contract forwarded verbatim
        unsafe { (**self).free(ptr, size, align) }
    }

    #[inline]
    fn free_all(&self) {
        (**self).free_all();
    }
}

/// Typed construction and destruction layered over [`Allocator`]
///
/// Blanket-implemented for every allocator, including `dyn Allocator`.
///
/// Constructors never run destructors on failure: if the allocation fails
/// nothing was built. The `drop_*` methods run `Drop` for every live element
/// before handing the memory back through [`Allocator::free`].
///
/// # Examples
/// ```rust
/// use tessera_memory::prelude::*;
///
/// let mut buf = [0u8; 256];
/// let arena = Arena::new(&mut buf);
///
/// let counter = arena.make::<u64>()?;
/// let values = arena.make_slice::<u32>(8)?;
/// unsafe {
///     assert_eq!(*counter.as_ptr(), 0);
///     assert_eq!(values.as_ref().len(), 8);
///     arena.drop_slice(values);
///     arena.drop_value(counter);
/// }
/// # Ok::<(), tessera_memory::AllocError>(())
/// ```
pub trait TypedAllocator: Allocator {
    /// Allocates one `T` and initialises it with `T::default()`
    #[inline]
    fn make<T: Default>(&self) -> AllocResult<NonNull<T>> {
        self.make_with(T::default())
    }

    /// Allocates one `T` and moves `value` into it.
    ///
    /// On failure `value` is dropped normally; no allocation exists.
    #[inline]
    fn make_with<T>(&self, value: T) -> AllocResult<NonNull<T>> {
        let ptr = self
            .alloc(mem::size_of::<T>(), mem::align_of::<T>())?
            .cast::<T>();
        // SAFETY: Initializing freshly allocated memory.
        // - ptr is valid for writes of size_of::<T>() bytes (Allocator contract)
        // - ptr is aligned to align_of::<T>() (Allocator contract)
        unsafe { ptr.as_ptr().write(value) };
        Ok(ptr)
    }

    /// Allocates a contiguous run of `count` values, each `T::default()`.
    ///
    /// The backing bytes are zero-filled by the allocator before the
    /// defaults are written.
    fn make_slice<T: Default>(&self, count: usize) -> AllocResult<NonNull<[T]>> {
        let size = mem::size_of::<T>()
            .checked_mul(count)
            .ok_or_else(|| AllocError::size_overflow("typed slice length"))?;
        let ptr = self.alloc(size, mem::align_of::<T>())?.cast::<T>();

        let mut guard = PartialSlice {
            allocator: self,
            ptr,
            initialised: 0,
            size,
            armed: true,
        };
        while guard.initialised < count {
            let value = T::default();
            // SAFETY: Initializing element `initialised` of the new run.
            // - initialised < count, so the slot stays inside the `size`-byte block
            // - Alignment of every element follows from the base alignment
            unsafe { ptr.as_ptr().add(guard.initialised).write(value) };
            guard.initialised += 1;
        }
        guard.armed = false;

        Ok(NonNull::slice_from_raw_parts(ptr, count))
    }

    /// Drops the value behind `ptr` and frees its memory.
    ///
    /// # Safety
    /// - `ptr` must come from `make`/`make_with` on this allocator
    /// - The value must be initialised and not dropped already
    /// - `ptr` must not be used afterwards
    unsafe fn drop_value<T>(&self, ptr: NonNull<T>) {
        // SAFETY: Destroying a live value (caller contract).
        unsafe {
            ptr::drop_in_place(ptr.as_ptr());
            self.free(ptr.cast(), mem::size_of::<T>(), mem::align_of::<T>());
        }
    }

    /// Drops every element of `slice` and frees the run.
    ///
    /// # Safety
    /// - `slice` must come from `make_slice` on this allocator, with the
    ///   same length
    /// - Every element must be initialised and not dropped already
    /// - `slice` must not be used afterwards
    unsafe fn drop_slice<T>(&self, slice: NonNull<[T]>) {
        let len = slice.len();
        // SAFETY: Destroying every live element (caller contract).
        // - drop_in_place on a slice pointer drops each element in order
        // - size cannot overflow: the same product succeeded in make_slice
        unsafe {
            ptr::drop_in_place(slice.as_ptr());
            self.free(
                slice.cast(),
                mem::size_of::<T>() * len,
                mem::align_of::<T>(),
            );
        }
    }
}

impl<A: Allocator + ?Sized> TypedAllocator for A {}

/// Unwind guard for [`TypedAllocator::make_slice`]: drops the elements built
/// so far and frees the block if `T::default()` panics.
struct PartialSlice<'a, A: Allocator + ?Sized, T> {
    allocator: &'a A,
    ptr: NonNull<T>,
    initialised: usize,
    size: usize,
    armed: bool,
}

impl<A: Allocator + ?Sized, T> Drop for PartialSlice<'_, A, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // SAFETY: Tearing down a partially built run.
        // - The first `initialised` elements were written and not yet dropped
        // - ptr came from `alloc(size, align_of::<T>())` on this allocator
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.ptr.as_ptr(),
                self.initialised,
            ));
            self.allocator
                .free(self.ptr.cast(), self.size, mem::align_of::<T>());
        }
    }
}

/// Memory usage tracking
///
/// Implemented by strategies that can report how much of their capacity is
/// in use.
pub trait MemoryUsage {
    /// Get currently used memory in bytes
    fn used_memory(&self) -> usize;

    /// Get available memory in bytes (if known)
    fn available_memory(&self) -> Option<usize>;

    /// Get total memory capacity in bytes (if known)
    fn total_memory(&self) -> Option<usize> {
        self.available_memory()
            .map(|available| self.used_memory() + available)
    }

    /// Returns memory usage as a percentage (0.0 to 100.0)
    ///
    /// Returns `None` if total memory is unknown.
    fn memory_usage_percent(&self) -> Option<f32> {
        self.total_memory().map(|total| {
            if total == 0 {
                0.0
            } else {
                (self.used_memory() as f32 / total as f32) * 100.0
            }
        })
    }
}
