//! Type-safe identifiers for engine-side entities.
//!
//! Newtype wrappers keep engine handles from being confused with plain
//! integers at compile time.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// ConnectionHandle
// ============================================================================

/// Opaque identifier of one connection inside a networking engine.
///
/// Issued by [`Engine::get_connection`](crate::engine::Engine::get_connection)
/// and only meaningful to the engine that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionHandle(u64);

impl ConnectionHandle {
    /// Wraps a raw engine-assigned value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw engine-assigned value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ============================================================================
// HandleAllocator
// ============================================================================

/// Monotonic source of fresh [`ConnectionHandle`]s for engine implementations.
#[derive(Debug)]
pub struct HandleAllocator {
    next: AtomicU64,
}

impl HandleAllocator {
    /// Creates an allocator whose first handle is `conn-1`.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns a handle never returned before by this allocator.
    #[inline]
    pub fn allocate(&self) -> ConnectionHandle {
        ConnectionHandle(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
