//! Checkpoints over an arena
//!
//! A region records the arena cursor when it opens and restores it when it
//! closes, discarding everything allocated in between. Regions nest and
//! must close in LIFO order.

use super::Arena;

/// RAII checkpoint that rewinds its [`Arena`] on drop
///
/// Dropping the region (or calling [`release`](Self::release)) restores the
/// cursor saved at creation. Release asserts the LIFO discipline: the region
/// must be the innermost one still open and the arena must not have moved
/// behind the saved cursor.
///
/// # Examples
/// ```rust
/// use tessera_memory::arena::{Arena, ArenaRegion};
///
/// let mut buf = [0u8; 256];
/// let arena = Arena::new(&mut buf);
/// arena.alloc(8, 1)?;
///
/// let region = ArenaRegion::new(&arena);
/// arena.alloc(64, 1)?;
/// assert_eq!(arena.used(), 72);
/// region.release();
///
/// assert_eq!(arena.used(), 8);
/// # Ok::<(), tessera_memory::AllocError>(())
/// ```
#[must_use = "a region releases immediately if not bound to a variable"]
pub struct ArenaRegion<'a, 'buf> {
    arena: &'a Arena<'buf>,
    offset: usize,
    depth: usize,
}

impl<'a, 'buf> ArenaRegion<'a, 'buf> {
    /// Opens a region at the arena's current cursor
    pub fn new(arena: &'a Arena<'buf>) -> Self {
        let (offset, depth) = arena.open_region();
        Self {
            arena,
            offset,
            depth,
        }
    }

    /// The arena this region rewinds
    pub fn arena(&self) -> &'a Arena<'buf> {
        self.arena
    }

    /// Cursor saved when the region opened
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Nesting depth, starting at 1 for the outermost region
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Releases the region now
    ///
    /// # Panics
    /// Panics if a region opened after this one is still live, or if the
    /// arena's cursor is below the saved one.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ArenaRegion<'_, '_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.arena.abandon_region(self.offset);
        } else {
            self.arena.close_region(self.offset, self.depth);
        }
    }
}

impl core::fmt::Debug for ArenaRegion<'_, '_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ArenaRegion")
            .field("offset", &self.offset)
            .field("depth", &self.depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaConfig;

    #[test]
    fn test_region_without_allocations_is_identity() {
        let mut buf = [0u8; 64];
        let arena = Arena::new(&mut buf);
        arena.alloc(10, 1).unwrap();

        let region = arena.create_region();
        assert_eq!(arena.region_count(), 1);
        assert_eq!(region.offset(), 10);
        assert_eq!(region.depth(), 1);
        region.release();

        assert_eq!(arena.offset(), 10);
        assert_eq!(arena.region_count(), 0);
    }

    #[test]
    fn test_nested_regions_rewind_in_order() {
        let mut buf = [0u8; 256];
        let arena = Arena::new(&mut buf);

        let outer = ArenaRegion::new(&arena);
        arena.alloc(16, 1).unwrap();
        let inner = ArenaRegion::new(&arena);
        assert_eq!(inner.depth(), 2);
        arena.alloc(32, 1).unwrap();

        inner.release();
        assert_eq!(arena.offset(), 16);
        outer.release();
        assert_eq!(arena.offset(), 0);
    }

    #[test]
    fn test_region_blocks_resize_across_boundary() {
        let mut buf = [0u8; 64];
        let arena = Arena::new(&mut buf);
        let before = arena.alloc(8, 1).unwrap();

        let region = arena.create_region();
        assert!(!arena.resize_in_place(before, 16));
        region.release();
        assert!(!arena.resize_in_place(before, 16));
    }

    #[test]
    #[should_panic(expected = "LIFO")]
    fn test_out_of_order_release_panics() {
        let mut buf = [0u8; 64];
        let arena = Arena::new(&mut buf);
        let outer = arena.create_region();
        let _inner = arena.create_region();
        outer.release();
    }

    #[test]
    fn test_release_poisons_discarded_bytes() {
        let mut buf = [0u8; 64];
        {
            let arena = Arena::with_config(&mut buf, ArenaConfig::debug());
            arena.alloc(4, 1).unwrap();
            arena.scoped(|arena| arena.alloc(4, 1).map(|_| ())).unwrap();
            assert_eq!(arena.statistics().regions_opened, 1);
        }
        assert_eq!(&buf[..4], &[0; 4]);
        assert_eq!(&buf[4..8], &[0xDD; 4]);
    }
}
