//! Region-based arena allocation
//!
//! An [`Arena`] bumps a cursor through a caller-owned buffer. Individual
//! frees are no-ops; memory comes back in bulk:
//! - [`ArenaRegion`] checkpoints the cursor and rewinds to it on drop
//! - [`Arena::free_all`] rewinds to the start once no region is open
//!
//! # Examples
//!
//! ```rust
//! use tessera_memory::arena::{Arena, ArenaConfig};
//!
//! let mut buf = vec![0u8; 4096];
//! let arena = Arena::with_config(&mut buf, ArenaConfig::named("parser"));
//!
//! let header = arena.alloc(16, 1)?;
//! arena.scoped(|arena| -> Result<(), tessera_memory::AllocError> {
//!     let _tmp = arena.alloc(1024, 16)?;
//!     Ok(())
//! })?;
//! assert_eq!(arena.used(), 16);
//! # let _ = header;
//! # Ok::<(), tessera_memory::AllocError>(())
//! ```
//!
//! Per-thread temporaries can use [`with_scratch`] instead of owning a
//! buffer.

#[allow(clippy::module_inception)]
mod arena;
mod config;
pub mod local;
mod region;
mod stats;

pub use self::arena::{Arena, ArenaState};
pub use self::config::ArenaConfig;
pub use self::local::{SCRATCH_ARENA_SIZE, with_scratch};
pub use self::region::ArenaRegion;
pub use self::stats::ArenaStats;
