//! Bump arena over a caller-supplied buffer
//!
//! # Safety
//!
//! The arena hands out raw pointers into a buffer it borrows for `'buf`:
//! - All bookkeeping is kept as byte offsets from the buffer start, so the
//!   cursor can never point outside `[0, capacity]`
//! - Allocated ranges never overlap: each one starts at or after the cursor
//!   and the cursor moves past it before the pointer is returned
//! - Interior mutability goes through `Cell`, which keeps the arena `!Sync`;
//!   one arena serves one thread at a time
//!
//! ## Invariants
//!
//! - `0 <= offset <= capacity`
//! - `last_allocation`, when set, is `<= offset` and names the start of the
//!   most recent allocation made since the last region boundary
//! - `region_count` equals the number of live [`ArenaRegion`]s

use core::cell::Cell;
use core::marker::PhantomData;
use core::ptr::{self, NonNull};

#[cfg(feature = "logging")]
use tracing::trace;

use super::stats::StatCounters;
use super::{ArenaConfig, ArenaRegion, ArenaStats};
use crate::allocator::{AllocResult, Allocator, MemoryUsage};
use crate::error::MemoryError;
use crate::utils::{is_aligned, is_valid_alignment, padding_needed};

/// Fill level of an [`Arena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaState {
    /// Nothing allocated (`offset == 0`)
    Empty,
    /// Partially used (`0 < offset < capacity`)
    Allocating,
    /// No bytes left (`offset == capacity`)
    Full,
}

/// Linear (bump) allocator over a fixed, caller-owned buffer
///
/// Allocation is O(1): align the cursor, check the remaining space, move the
/// cursor. The most recent allocation can grow or shrink in place; anything
/// else is released only in bulk, through [`ArenaRegion`] or
/// [`free_all`](Self::free_all). The arena never grows and never frees the
/// buffer it was given.
///
/// Returned pointers are raw and carry no lifetime. They dangle once the
/// region they were allocated in is released, after
/// [`free_all`](Self::free_all), and once the arena itself is gone; reading
/// through them is `unsafe` and must respect those bounds.
///
/// # Memory Layout
/// ```text
/// [base]--[pad][alloc1]--[pad][alloc2]--[offset]--------[capacity]
///          <------------ used ------------>   <-- available -->
/// ```
///
/// # Examples
/// ```rust
/// use tessera_memory::arena::Arena;
///
/// let mut buf = [0u8; 1024];
/// let arena = Arena::new(&mut buf);
///
/// let first = arena.alloc(100, 8)?;
/// arena.free_all();
/// let again = arena.alloc(100, 8)?;
/// assert_eq!(first, again);
/// # Ok::<(), tessera_memory::AllocError>(())
/// ```
pub struct Arena<'buf> {
    base: NonNull<u8>,
    capacity: usize,
    offset: Cell<usize>,
    last_allocation: Cell<Option<usize>>,
    region_count: Cell<usize>,
    config: ArenaConfig,
    stats: StatCounters,
    _buffer: PhantomData<&'buf mut [u8]>,
}

impl<'buf> Arena<'buf> {
    /// Wraps `buffer` with the default configuration
    pub fn new(buffer: &'buf mut [u8]) -> Self {
        Self::with_config(buffer, ArenaConfig::default())
    }

    /// Wraps `buffer` with an explicit configuration
    pub fn with_config(buffer: &'buf mut [u8], config: ArenaConfig) -> Self {
        let capacity = buffer.len();
        let base = NonNull::from(buffer).cast::<u8>();
        let stats = StatCounters::new(config.track_stats);

        Self {
            base,
            capacity,
            offset: Cell::new(0),
            last_allocation: Cell::new(None),
            region_count: Cell::new(0),
            config,
            stats,
            _buffer: PhantomData,
        }
    }

    /// Total capacity in bytes
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current cursor position, i.e. bytes consumed including padding
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset.get()
    }

    /// Alias for [`offset`](Self::offset)
    #[inline]
    pub fn used(&self) -> usize {
        self.offset.get()
    }

    /// Bytes left before the arena is full
    #[inline]
    pub fn available(&self) -> usize {
        self.capacity - self.offset.get()
    }

    /// Number of regions currently open
    #[inline]
    pub fn region_count(&self) -> usize {
        self.region_count.get()
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn state(&self) -> ArenaState {
        match self.offset.get() {
            0 if self.capacity > 0 => ArenaState::Empty,
            used if used == self.capacity => ArenaState::Full,
            _ => ArenaState::Allocating,
        }
    }

    /// Counter snapshot; all zero unless `track_stats` is enabled
    pub fn statistics(&self) -> ArenaStats {
        self.stats.snapshot()
    }

    /// Whether `ptr` points into (or one past the end of) the buffer
    pub fn owns(&self, ptr: NonNull<u8>) -> bool {
        let addr = ptr.as_ptr() as usize;
        let base = self.base_addr();
        addr >= base && addr - base <= self.capacity
    }

    #[inline]
    fn base_addr(&self) -> usize {
        self.base.as_ptr() as usize
    }

    /// Pointer to `offset` bytes past the buffer start
    ///
    /// # Safety
    /// `offset <= capacity`
    #[inline]
    unsafe fn ptr_at(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset <= self.capacity);
        // SAFETY: offset <= capacity keeps the pointer inside the buffer or
        // one past its end (caller contract)
        unsafe { self.base.add(offset) }
    }

    /// Fills `[start, end)` with `byte`
    fn fill(&self, start: usize, end: usize, byte: u8) {
        debug_assert!(start <= end && end <= self.capacity);
        // SAFETY: Writing inside the borrowed buffer.
        // - [start, end) lies within [0, capacity] (debug-checked above,
        //   guaranteed by every caller through the offset invariant)
        // - The arena has exclusive access to the buffer for 'buf
        unsafe { ptr::write_bytes(self.ptr_at(start).as_ptr(), byte, end - start) };
    }

    /// Allocates `size` zeroed bytes aligned to `align`.
    ///
    /// Fails with [`MemoryError::ArenaExhausted`] when padding plus `size`
    /// does not fit in the remaining space; the arena is left untouched.
    ///
    /// # Panics
    /// Panics if `align` is not a power of two greater than zero.
    pub fn alloc(&self, size: usize, align: usize) -> AllocResult<NonNull<u8>> {
        let offset = self.offset.get();
        let padding = padding_needed(self.base_addr() + offset, align);
        let available = self.capacity - offset;

        let required = match padding.checked_add(size) {
            Some(required) if required <= available => required,
            _ => {
                self.stats.record_failure();
                return Err(MemoryError::arena_exhausted(
                    self.config.name,
                    size,
                    available,
                ));
            }
        };

        let start = offset + padding;
        self.offset.set(offset + required);
        self.last_allocation.set(Some(start));
        self.fill(start, start + size, 0);
        self.stats.record_alloc(offset + required);

        // SAFETY: start + size <= capacity by the check above
        Ok(unsafe { self.ptr_at(start) })
    }

    /// Grows or shrinks the most recent allocation by moving the cursor.
    ///
    /// Returns `false` when `ptr` is not the most recent allocation (the
    /// arena does not know older allocations' sizes) or when growing would
    /// pass the end of the buffer. Bytes exposed by growth are zeroed.
    ///
    /// # Panics
    /// Panics if `ptr` does not point into this arena's buffer.
    pub fn resize_in_place(&self, ptr: NonNull<u8>, new_size: usize) -> bool {
        assert!(self.owns(ptr), "pointer is not owned by arena");

        let start = ptr.as_ptr() as usize - self.base_addr();
        if self.last_allocation.get() != Some(start) {
            return false;
        }

        let end = self.offset.get();
        if new_size > self.capacity - start {
            return false; // no space left
        }

        let new_end = start + new_size;
        if new_end > end {
            self.fill(end, new_end, 0);
        }
        self.offset.set(new_end);
        self.stats.record_resize(new_end);
        true
    }

    /// Resizes an allocation, in place when possible.
    ///
    /// - `None` behaves exactly like [`alloc`](Self::alloc)
    /// - the most recent allocation (if it satisfies `align`) is resized in
    ///   place and `old_ptr` is returned unchanged
    /// - anything else is copied into a fresh block; the old block stays
    ///   behind as dead space until the enclosing region or `free_all`
    ///
    /// # Safety
    /// `old_ptr`, if any, must be a live allocation of this arena that is
    /// valid for `old_size` bytes.
    ///
    /// # Panics
    /// Panics if `old_ptr` does not point into this arena's buffer, or if
    /// `align` is not a power of two greater than zero.
    pub unsafe fn realloc(
        &self,
        old_ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) -> AllocResult<NonNull<u8>> {
        let Some(old_ptr) = old_ptr else {
            return self.alloc(new_size, align);
        };
        assert!(self.owns(old_ptr), "pointer is not owned by arena");
        assert!(
            is_valid_alignment(align),
            "alignment must be a power of 2 greater than 0"
        );

        if is_aligned(old_ptr.as_ptr() as usize, align) && self.resize_in_place(old_ptr, new_size)
        {
            return Ok(old_ptr);
        }

        let new_ptr = self.alloc(new_size, align)?;
        // SAFETY: Copying the surviving prefix into the new block.
        // - old_ptr is valid for old_size bytes (caller contract)
        // - new_ptr was carved from beyond the cursor, past the end of every
        //   live allocation, so the ranges cannot overlap
        unsafe {
            ptr::copy_nonoverlapping(
                old_ptr.as_ptr(),
                new_ptr.as_ptr(),
                old_size.min(new_size),
            );
        }
        self.stats.record_relocation();
        Ok(new_ptr)
    }

    /// Individual frees are not supported by a bump allocator; this does
    /// nothing. Memory comes back through regions or [`free_all`](Self::free_all).
    #[inline]
    pub fn free(&self, _ptr: NonNull<u8>, _size: usize, _align: usize) {}

    /// Rewinds the arena to empty, invalidating every allocation.
    ///
    /// # Panics
    /// Panics if any region is still open; discarding it silently would
    /// leave the region pointing at a cursor that no longer exists.
    pub fn free_all(&self) {
        assert!(
            self.region_count.get() == 0,
            "arena has dangling regions ({} open)",
            self.region_count.get()
        );

        #[cfg(feature = "logging")]
        trace!(arena = self.config.name, used = self.offset.get(), "arena reset");

        if let Some(pattern) = self.config.release_pattern {
            self.fill(0, self.offset.get(), pattern);
        }
        self.offset.set(0);
        self.last_allocation.set(None);
    }

    /// Opens a region at the current cursor
    ///
    /// Shorthand for [`ArenaRegion::new`].
    pub fn create_region(&self) -> ArenaRegion<'_, 'buf> {
        ArenaRegion::new(self)
    }

    /// Runs `f` inside a fresh region and releases the region afterwards,
    /// on every exit path including unwinding.
    ///
    /// # Examples
    /// ```rust
    /// use tessera_memory::arena::Arena;
    ///
    /// let mut buf = [0u8; 256];
    /// let arena = Arena::new(&mut buf);
    /// arena.alloc(16, 1)?;
    ///
    /// let used_inside = arena.scoped(|arena| {
    ///     arena.alloc(100, 1).map(|_| arena.used())
    /// })?;
    /// assert!(used_inside > 16);
    /// assert_eq!(arena.used(), 16);
    /// # Ok::<(), tessera_memory::AllocError>(())
    /// ```
    pub fn scoped<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let region = self.create_region();
        let result = f(self);
        region.release();
        result
    }

    // ------------------------------------------------------------------
    // Region bookkeeping, driven by ArenaRegion
    // ------------------------------------------------------------------

    /// Marks one more region open and returns `(saved_offset, depth)`
    pub(super) fn open_region(&self) -> (usize, usize) {
        let depth = self.region_count.get() + 1;
        self.region_count.set(depth);
        // Allocations from before the region belong to the outer scope.
        self.last_allocation.set(None);
        self.stats.record_region();

        #[cfg(feature = "logging")]
        trace!(arena = self.config.name, offset = self.offset.get(), depth, "region opened");

        (self.offset.get(), depth)
    }

    /// Closes the innermost region, rewinding to `saved`
    pub(super) fn close_region(&self, saved: usize, depth: usize) {
        let count = self.region_count.get();
        assert!(count > 0, "arena has an improper region counter");
        assert!(
            count == depth,
            "arena regions must be released in LIFO order (releasing depth {depth} with {count} open)"
        );
        let current = self.offset.get();
        assert!(
            current >= saved,
            "arena has a lower offset ({current}) than the region ({saved})"
        );

        #[cfg(feature = "logging")]
        trace!(arena = self.config.name, from = current, to = saved, depth, "region released");

        if let Some(pattern) = self.config.release_pattern {
            self.fill(saved, current, pattern);
        }
        self.rewind(saved);
    }

    /// Best-effort close used while unwinding: no assertions
    pub(super) fn abandon_region(&self, saved: usize) {
        if self.offset.get() >= saved {
            self.rewind(saved);
        } else {
            self.region_count.set(self.region_count.get().saturating_sub(1));
        }
    }

    fn rewind(&self, saved: usize) {
        self.offset.set(saved);
        self.last_allocation.set(None);
        self.region_count.set(self.region_count.get() - 1);
    }
}

impl core::fmt::Debug for Arena<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Arena")
            .field("name", &self.config.name)
            .field("capacity", &self.capacity)
            .field("offset", &self.offset.get())
            .field("last_allocation", &self.last_allocation.get())
            .field("region_count", &self.region_count.get())
            .finish()
    }
}

// SAFETY: Arena implements Allocator as a bump allocator.
// - alloc returns aligned, zero-filled, non-overlapping ranges of the buffer
// - realloc either moves the cursor for the newest allocation or copies
//   into a fresh range
// - free is a no-op; free_all and region release are the only ways memory
//   is reused
unsafe impl Allocator for Arena<'_> {
    #[inline]
    fn alloc(&self, size: usize, align: usize) -> AllocResult<NonNull<u8>> {
        Arena::alloc(self, size, align)
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
        unsafe { Arena::realloc(self, old_ptr, old_size, new_size, align) }
    }

    #[inline]
    unsafe fn free(&self, ptr: NonNull<u8>, size: usize, align: usize) {
        Arena::free(self, ptr, size, align);
    }

    #[inline]
    fn free_all(&self) {
        Arena::free_all(self);
    }
}

impl MemoryUsage for Arena<'_> {
    fn used_memory(&self) -> usize {
        self.used()
    }

    fn available_memory(&self) -> Option<usize> {
        Some(self.available())
    }

    fn total_memory(&self) -> Option<usize> {
        Some(self.capacity)
    }
}

// SAFETY: Arena can move between threads.
// - It exclusively borrows its buffer for 'buf (the &mut was consumed)
// - Cell fields are plain data with no thread affinity
// - Open regions borrow the arena, so it cannot move while one exists
// Arena stays !Sync through its Cell fields: no concurrent access.
unsafe impl Send for Arena<'_> {}
