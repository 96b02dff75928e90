//! Consumers written against `dyn Allocator` and the typed helpers

use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr::NonNull;

use pretty_assertions::assert_eq;
use tessera_memory::prelude::*;

/// Minimal growable byte buffer that only knows the allocator capability
struct ByteVec<'a> {
    allocator: &'a dyn Allocator,
    ptr: Option<NonNull<u8>>,
    len: usize,
    cap: usize,
}

impl<'a> ByteVec<'a> {
    fn new(allocator: &'a dyn Allocator) -> Self {
        Self {
            allocator,
            ptr: None,
            len: 0,
            cap: 0,
        }
    }

    fn push(&mut self, byte: u8) -> AllocResult<()> {
        if self.len == self.cap {
            let new_cap = (self.cap * 2).max(4);
            let ptr = unsafe { self.allocator.realloc(self.ptr, self.cap, new_cap, 1) }?;
            self.ptr = Some(ptr);
            self.cap = new_cap;
        }
        if let Some(ptr) = self.ptr {
            unsafe { ptr.as_ptr().add(self.len).write(byte) };
        }
        self.len += 1;
        Ok(())
    }

    fn as_slice(&self) -> &[u8] {
        match self.ptr {
            Some(ptr) => unsafe { std::slice::from_raw_parts(ptr.as_ptr(), self.len) },
            None => &[],
        }
    }
}

impl Drop for ByteVec<'_> {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr {
            unsafe { self.allocator.free(ptr, self.cap, 1) };
        }
    }
}

fn fill(allocator: &dyn Allocator) -> Vec<u8> {
    let mut bytes = ByteVec::new(allocator);
    for b in 0..100u8 {
        bytes.push(b).unwrap();
    }
    bytes.as_slice().to_vec()
}

#[test]
fn test_same_consumer_over_arena_and_heap() {
    let expected: Vec<u8> = (0..100).collect();

    let mut buf = vec![0u8; 1024];
    let arena = Arena::new(&mut buf);
    assert_eq!(fill(&arena), expected);

    assert_eq!(fill(heap_allocator()), expected);
}

#[test]
fn test_growth_on_arena_stays_in_place() {
    let mut buf = vec![0u8; 1024];
    let arena = Arena::new(&mut buf);

    // Only allocation in the arena, so every doubling extends in place and
    // the final footprint equals the final capacity.
    let _ = fill(&arena);
    assert_eq!(arena.used(), 128);
}

#[test]
fn test_consumer_reports_exhaustion() {
    let mut buf = [0u8; 16];
    let arena = Arena::new(&mut buf);
    let mut bytes = ByteVec::new(&arena);
    let err = (0..32u8).try_for_each(|b| bytes.push(b)).unwrap_err();
    assert!(err.is_exhaustion());
    assert_eq!(bytes.as_slice().len(), 16);
}

#[derive(Default)]
struct Counted<'a> {
    drops: Option<&'a Cell<usize>>,
    value: u32,
}

impl Drop for Counted<'_> {
    fn drop(&mut self) {
        if let Some(drops) = self.drops {
            drops.set(drops.get() + 1);
        }
    }
}

#[test]
fn test_drop_slice_runs_every_destructor() {
    let drops = Cell::new(0);
    let heap = HeapAllocator::new();

    let slice = heap.make_slice::<Counted<'_>>(5).unwrap();
    unsafe {
        let items = &mut *slice.as_ptr();
        for (i, item) in items.iter_mut().enumerate() {
            assert_eq!(item.value, 0);
            item.value = i as u32;
            item.drops = Some(&drops);
        }
        heap.drop_slice(slice);
    }
    assert_eq!(drops.get(), 5);
}

#[test]
fn test_make_with_and_drop_value() {
    let drops = Cell::new(0);
    let mut buf = [0u8; 64];
    let arena = Arena::new(&mut buf);

    let ptr = arena
        .make_with(Counted {
            drops: Some(&drops),
            value: 7,
        })
        .unwrap();
    assert_eq!(unsafe { ptr.as_ref() }.value, 7);
    unsafe { arena.drop_value(ptr) };
    assert_eq!(drops.get(), 1);
}

#[test]
fn test_make_defaults() {
    let mut buf = [0u8; 64];
    let arena = Arena::new(&mut buf);
    let value = arena.make::<u64>().unwrap();
    assert_eq!(value.as_ptr() as usize % 8, 0);
    assert_eq!(unsafe { value.read() }, 0);
}

#[test]
fn test_make_slice_length_overflow() {
    let heap = HeapAllocator::new();
    let err = heap.make_slice::<u64>(usize::MAX).unwrap_err();
    assert_eq!(err.code(), "MEM:ALLOC:OVERFLOW");
}

#[test]
fn test_make_with_failure_drops_value() {
    let drops = Cell::new(0);
    let mut buf = [0u8; 2];
    let arena = Arena::new(&mut buf);
    let result = arena.make_with(Counted {
        drops: Some(&drops),
        value: 1,
    });
    assert!(result.is_err());
    assert_eq!(drops.get(), 1);
}

/// Forwards to the heap while counting allocations and frees
#[derive(Default)]
struct CountingHeap {
    allocs: Cell<usize>,
    frees: Cell<usize>,
}

unsafe impl Allocator for CountingHeap {
    fn alloc(&self, size: usize, align: usize) -> AllocResult<NonNull<u8>> {
        self.allocs.set(self.allocs.get() + 1);
        heap_allocator().alloc(size, align)
    }

    unsafe fn realloc(
        &self,
        old_ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) -> AllocResult<NonNull<u8>> {
        unsafe { heap_allocator().realloc(old_ptr, old_size, new_size, align) }
    }

    unsafe fn free(&self, ptr: NonNull<u8>, size: usize, align: usize) {
        self.frees.set(self.frees.get() + 1);
        unsafe { heap_allocator().free(ptr, size, align) };
    }

    fn free_all(&self) {}
}

thread_local! {
    static BUILT: Cell<usize> = const { Cell::new(0) };
    static DROPPED: Cell<usize> = const { Cell::new(0) };
}

/// Its third default construction on a thread panics
struct Fragile;

impl Default for Fragile {
    fn default() -> Self {
        let built = BUILT.with(|b| {
            b.set(b.get() + 1);
            b.get()
        });
        assert!(built != 3, "third element refuses to build");
        Self
    }
}

impl Drop for Fragile {
    fn drop(&mut self) {
        DROPPED.with(|d| d.set(d.get() + 1));
    }
}

#[test]
fn test_make_slice_cleans_up_when_default_panics() {
    let heap = CountingHeap::default();

    let result = catch_unwind(AssertUnwindSafe(|| heap.make_slice::<Fragile>(5)));

    assert!(result.is_err());
    assert_eq!(heap.allocs.get(), 1);
    assert_eq!(heap.frees.get(), 1);
    assert_eq!(DROPPED.with(Cell::get), 2);
}

#[test]
fn test_make_slice_success_frees_only_on_drop() {
    let heap = CountingHeap::default();
    let slice = heap.make_slice::<u32>(4).unwrap();
    assert_eq!(heap.frees.get(), 0);
    unsafe { heap.drop_slice(slice) };
    assert_eq!(heap.frees.get(), 1);
}
