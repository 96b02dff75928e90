//! Thread-local scratch arena
//!
//! Each thread lazily gets one [`SCRATCH_ARENA_SIZE`] arena for short-lived
//! temporaries (formatting buffers, intermediate slices). Every
//! [`with_scratch`] call runs inside its own region, so nothing allocated
//! there survives the call.

use std::ptr::NonNull;

#[cfg(feature = "logging")]
use tracing::debug;

use super::{Arena, ArenaConfig};

/// Size of each thread's scratch arena (2 MiB)
pub const SCRATCH_ARENA_SIZE: usize = 2 * 1024 * 1024;

thread_local! {
    static SCRATCH: ScratchArena = ScratchArena::new();
}

/// Owns the scratch buffer and the arena carved over it
struct ScratchArena {
    arena: Arena<'static>,
    buffer: NonNull<[u8]>,
}

impl ScratchArena {
    fn new() -> Self {
        let buffer = NonNull::from(Box::leak(vec![0u8; SCRATCH_ARENA_SIZE].into_boxed_slice()));

        #[cfg(feature = "logging")]
        debug!(size = SCRATCH_ARENA_SIZE, thread = ?std::thread::current().id(), "scratch arena created");

        // SAFETY: The buffer is leaked above and reclaimed only in Drop,
        // after the arena is no longer reachable through the thread-local.
        let bytes = unsafe { &mut *buffer.as_ptr() };
        Self {
            arena: Arena::with_config(bytes, ArenaConfig::named("scratch")),
            buffer,
        }
    }
}

impl Drop for ScratchArena {
    fn drop(&mut self) {
        // SAFETY: buffer came from Box::leak in new() and is freed once.
        // The arena field holds no destructor that touches it.
        drop(unsafe { Box::from_raw(self.buffer.as_ptr()) });
    }
}

/// Runs `f` with this thread's scratch arena, inside a fresh region.
///
/// Everything `f` allocates is discarded when it returns (or unwinds).
/// Calls may nest; inner calls open inner regions.
///
/// # Examples
/// ```rust
/// use tessera_memory::arena::with_scratch;
///
/// let len = with_scratch(|arena| {
///     let buf = arena.alloc(128, 1).expect("scratch has room");
///     unsafe { buf.as_ptr().write_bytes(b'x', 128) };
///     arena.used()
/// });
/// assert!(len >= 128);
/// assert_eq!(with_scratch(|arena| arena.used()), 0);
/// ```
pub fn with_scratch<R>(f: impl FnOnce(&Arena<'static>) -> R) -> R {
    SCRATCH.with(|scratch| scratch.arena.scoped(f))
}
