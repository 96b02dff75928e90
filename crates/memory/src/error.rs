//! Standalone error types for tessera-memory
//!
//! Only resource exhaustion is reported through these types. Contract
//! violations (bad alignment, out-of-order region release, resetting an
//! arena with an open region) panic at the call site instead.

use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::warn;

// ============================================================================
// Main Error Types
// ============================================================================

/// Memory management errors
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The underlying heap primitive returned no memory.
    #[error("Memory allocation failed: {size} bytes with {align} byte alignment")]
    AllocationFailed { size: usize, align: usize },

    /// Size arithmetic for a request overflowed `usize`.
    #[error("Size overflow during operation: {operation}")]
    SizeOverflow { operation: String },

    /// An arena cannot fit the request in its remaining capacity.
    #[error("Arena '{arena_id}' exhausted: requested {requested} bytes, available {available}")]
    ArenaExhausted {
        arena_id: String,
        requested: usize,
        available: usize,
    },
}

impl MemoryError {
    /// Whether the error reports running out of memory, as opposed to an
    /// impossible request
    #[must_use]
    pub fn is_exhaustion(&self) -> bool {
        matches!(
            self,
            Self::AllocationFailed { .. } | Self::ArenaExhausted { .. }
        )
    }

    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AllocationFailed { .. } => "MEM:ALLOC:FAILED",
            Self::SizeOverflow { .. } => "MEM:ALLOC:OVERFLOW",
            Self::ArenaExhausted { .. } => "MEM:ARENA:EXHAUSTED",
        }
    }

    // ============================================================================
    // Convenience Constructors
    // ============================================================================

    /// Create allocation failed error
    pub fn allocation_failed(size: usize, align: usize) -> Self {
        Self::AllocationFailed { size, align }
    }

    /// Create size overflow error
    pub fn size_overflow(operation: &str) -> Self {
        Self::SizeOverflow {
            operation: operation.to_string(),
        }
    }

    /// Create arena exhausted error
    pub fn arena_exhausted(arena_id: &str, requested: usize, available: usize) -> Self {
        #[cfg(feature = "logging")]
        warn!(arena = arena_id, requested, available, "arena exhausted");

        Self::ArenaExhausted {
            arena_id: arena_id.to_string(),
            requested,
            available,
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result type for memory operations
pub type MemoryResult<T> = core::result::Result<T, MemoryError>;

/// Generic result type alias
pub type Result<T> = MemoryResult<T>;

/// Allocator-facing aliases
pub type AllocError = MemoryError;
pub type AllocResult<T> = MemoryResult<T>;
